use std::io::Write;

use crate::error::ViewerError;
use crate::output::SnapshotRow;

/// Write snapshot rows as a JSON array.
pub fn write_json(rows: &[SnapshotRow], writer: &mut impl Write) -> Result<(), ViewerError> {
    serde_json::to_writer_pretty(&mut *writer, rows)
        .map_err(|e| ViewerError::Serialization(std::io::Error::other(e.to_string())))?;
    writeln!(writer).map_err(ViewerError::Serialization)
}
