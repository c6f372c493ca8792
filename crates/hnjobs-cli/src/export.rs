use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use hnjobs_core::models::JobPosting;

pub const HEADER: [&str; 9] = [
    "hn_comment_id",
    "company",
    "role",
    "location",
    "salary",
    "contact",
    "description",
    "posted_at",
    "updated_at",
];

/// Write `postings` as CSV with a header row. NULL fields become empty cells.
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(postings: &[JobPosting], writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for posting in postings {
        let f = &posting.fields;
        csv.write_record([
            posting.external_id.to_string().as_str(),
            f.company.as_deref().unwrap_or_default(),
            f.role.as_deref().unwrap_or_default(),
            f.location.as_deref().unwrap_or_default(),
            f.salary.as_deref().unwrap_or_default(),
            f.contact.as_deref().unwrap_or_default(),
            f.description.as_deref().unwrap_or_default(),
            posting.posted_at.map(timestamp).unwrap_or_default().as_str(),
            timestamp(posting.updated_at).as_str(),
        ])?;
    }

    csv.flush()?;
    Ok(postings.len())
}

/// Write the snapshot to a file, replacing it if present.
pub fn export_to_path(postings: &[JobPosting], path: &Path) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    let rows = write_csv(postings, file)?;
    tracing::info!(rows, path = %path.display(), "Exported jobs to CSV");
    Ok(rows)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
