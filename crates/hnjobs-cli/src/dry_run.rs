use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use hnjobs_core::error::AppError;
use hnjobs_core::models::{JobFields, UpsertOutcome};
use hnjobs_core::traits::JobStore;
use serde::Serialize;

/// Store that prints each record as one JSON line instead of writing to
/// the database.
pub struct PrintStore<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for PrintStore<W> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

#[derive(Serialize)]
struct Record<'a> {
    hn_comment_id: i64,
    #[serde(flatten)]
    fields: &'a JobFields,
    posted_at: Option<DateTime<Utc>>,
}

impl PrintStore<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> PrintStore<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }
}

impl<W: Write + Send> JobStore for PrintStore<W> {
    async fn upsert(
        &self,
        external_id: i64,
        fields: &JobFields,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<UpsertOutcome, AppError> {
        if !fields.has_content() {
            return Ok(UpsertOutcome::Skipped);
        }

        let line = serde_json::to_string(&Record {
            hn_comment_id: external_id,
            fields,
            posted_at,
        })?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::Generic("Output lock poisoned".into()))?;
        writeln!(out, "{line}").map_err(|e| AppError::Generic(format!("Write failed: {e}")))?;

        Ok(UpsertOutcome::Inserted)
    }
}
