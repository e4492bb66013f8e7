use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One transfer request as it arrives from the driving layer.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransferOrder {
    pub sender: u64,
    pub sender_email: String,
    pub recipient_email: String,
    pub recipient_name: String,
    pub amount: Decimal,
}

/// Reads transfer orders from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<TransferOrder>`,
/// with whitespace trimming and flexible record lengths.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    /// Creates a new `OrderReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes orders, so
    /// large files stream without loading everything into memory.
    pub fn orders(self) -> impl Iterator<Item = Result<TransferOrder>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(TransferError::from))
    }
}
