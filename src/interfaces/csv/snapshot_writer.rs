use crate::domain::balance::BalanceSnapshot;
use crate::error::Result;
use std::io::Write;

/// Writes the final per-user balance table as CSV:
/// `user,total,retenido,aplicado,disponible`.
pub struct SnapshotWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_snapshots(&mut self, snapshots: &[BalanceSnapshot]) -> Result<()> {
        for snapshot in snapshots {
            self.writer.serialize(snapshot)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
