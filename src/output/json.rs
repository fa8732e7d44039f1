//! JSON artifact with every enriched item

use crate::model::EnrichedItem;
use crate::output::OutputResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `items` as a pretty-printed JSON array
pub fn write_items_json(path: &Path, items: &[EnrichedItem]) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, items)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
