use crate::domain::transfer::Transfer;
use crate::error::Result;
use std::io::Write;

/// Writes the settlement report as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per transfer, header first.
    pub fn write_transfers(&mut self, transfers: &[Transfer]) -> Result<()> {
        self.writer.write_record([
            "transfer_id",
            "sender_id",
            "recipient_email",
            "amount",
            "traditional_fee",
            "our_fee",
            "savings",
            "status",
        ])?;
        for transfer in transfers {
            self.writer.write_record([
                transfer.id.to_string(),
                transfer.sender_id.to_string(),
                transfer.recipient_email.clone(),
                transfer.amount.to_string(),
                transfer.traditional_fee.to_string(),
                transfer.our_fee.to_string(),
                transfer.savings.to_string(),
                transfer.status.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
