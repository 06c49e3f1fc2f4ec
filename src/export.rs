use crate::types::{Candidate, LeadRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output column order. Matches the field order of [`LeadRow`].
pub const COLUMNS: [&str; 12] = [
    "channel_id",
    "handle",
    "channel_name",
    "country",
    "subs",
    "last_upload_utc",
    "emails",
    "websites",
    "contact",
    "score",
    "channel_url",
    "handle_url",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `<out_dir>/<label>_leads_<YYYYMMDD>.csv`
pub fn output_path(out_dir: &Path, label: &str, date: NaiveDate) -> PathBuf {
    out_dir.join(format!("{}_leads_{}.csv", label, date.format("%Y%m%d")))
}

/// Write the daily leads file: UTF-8 BOM, header row, one row per lead in the
/// given order. The header is written even when there are no leads.
pub fn write_leads_csv(path: &Path, leads: &[Candidate]) -> Result<()> {
    debug!("Exporting {} leads to CSV: {:?}", leads.len(), path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = BufWriter::new(file);
    out.write_all(UTF8_BOM)?;

    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(COLUMNS)?;
    for lead in leads {
        wtr.serialize(LeadRow::from(lead))
            .with_context(|| format!("Failed to write row for {}", lead.id))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;

    info!("Exported {} leads to CSV: {:?}", leads.len(), path);
    Ok(())
}
