use std::io::Read;

use chrono::NaiveDate;
use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Open,
    Deposit,
    Withdraw,
    Transfer,
}

/// One row of a command script. `account` and `to` are aliases chosen by
/// the script author, resolved to real account ids while running.
#[derive(Debug, Deserialize)]
pub struct Command {
    pub op: Operation,
    pub account: String,
    pub to: Option<String>,
    pub amount: Option<Decimal>,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub kind: Option<String>,
}

/// Parses a command script in CSV format, yielding each row with the line
/// it was read from.
pub struct CsvCommandParser<R> {
    iter: DeserializeRecordsIntoIter<R, Command>,
}

impl<R> CsvCommandParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvCommandParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Command, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
