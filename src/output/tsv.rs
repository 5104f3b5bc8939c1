use std::io::Write;

use crate::error::ViewerError;
use crate::output::SnapshotRow;

/// Write snapshot rows as TSV.
///
/// Output: header row + data rows in the order given.
pub fn write_tsv(rows: &[SnapshotRow], writer: &mut impl Write) -> Result<(), ViewerError> {
    writeln!(
        writer,
        "user\tuid\tip\tinode\tname\tread_ops\tread_bytes\twrite_ops\twrite_bytes"
    )
    .map_err(ViewerError::Serialization)?;

    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            escape_tsv(&row.user),
            row.uid,
            row.ip,
            row.inode,
            escape_tsv(&row.name),
            row.read_ops,
            row.read_bytes,
            row.write_ops,
            row.write_bytes,
        )
        .map_err(ViewerError::Serialization)?;
    }

    Ok(())
}

/// Escape tabs and newlines in a string for TSV output.
fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}
