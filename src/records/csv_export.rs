use std::path::Path;

use crate::error::{Context, HistoryError, Result};
use crate::fetch::decode::value_to_string;

use super::columns::ColumnLayout;
use super::Record;

/// Project a record onto the layout's columns, in layout order.
pub fn select_row(record: &Record, layout: &ColumnLayout) -> Result<Vec<String>> {
    layout
        .columns
        .iter()
        .map(|column| {
            record
                .get(column.source)
                .map(value_to_string)
                .ok_or_else(|| HistoryError::MissingField(column.source.to_string()))
        })
        .collect()
}

/// Write the renamed header row followed by one line per record.
pub fn write_csv<P: AsRef<Path>>(path: P, records: &[Record], layout: &ColumnLayout) -> Result<()> {
    let path = path.as_ref();
    let rows = records
        .iter()
        .map(|record| select_row(record, layout))
        .collect::<Result<Vec<_>>>()?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV writer for {}", path.display()))?;

    writer.write_record(layout.headers())?;
    for row in &rows {
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}
