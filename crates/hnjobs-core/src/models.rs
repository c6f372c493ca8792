use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Names of the extracted fields, in storage/export column order.
pub const FIELD_NAMES: [&str; 6] = [
    "company",
    "role",
    "location",
    "salary",
    "contact",
    "description",
];

/// Structured fields pulled out of a single job post.
///
/// `None` is the canonical "absent" marker. An empty string is a value
/// in its own right and is stored as such.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFields {
    pub company: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
}

impl JobFields {
    /// The all-null record produced by a degraded extraction.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when at least one field carries a non-blank string.
    ///
    /// Records failing this check are never persisted.
    pub fn has_content(&self) -> bool {
        self.values()
            .into_iter()
            .any(|v| v.is_some_and(|s| !s.trim().is_empty()))
    }

    /// Field values in [`FIELD_NAMES`] order.
    pub fn values(&self) -> [Option<&str>; 6] {
        [
            self.company.as_deref(),
            self.role.as_deref(),
            self.location.as_deref(),
            self.salary.as_deref(),
            self.contact.as_deref(),
            self.description.as_deref(),
        ]
    }

    /// Mutable access by field name; `None` for names outside the contract.
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "company" => Some(&mut self.company),
            "role" => Some(&mut self.role),
            "location" => Some(&mut self.location),
            "salary" => Some(&mut self.salary),
            "contact" => Some(&mut self.contact),
            "description" => Some(&mut self.description),
            _ => None,
        }
    }
}

/// A persisted job posting row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPosting {
    /// Source item id (`hn_comment_id`).
    pub external_id: i64,
    pub fields: JobFields,
    pub posted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// What an upsert did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Every field was empty; nothing was written.
    Skipped,
}

impl UpsertOutcome {
    pub fn is_write(&self) -> bool {
        !matches!(self, UpsertOutcome::Skipped)
    }
}

/// Item type as reported by the Hacker News API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Job,
    Story,
    Comment,
    Poll,
    Pollopt,
    #[serde(other)]
    Unknown,
}

/// A Hacker News item (`/item/{id}.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HnItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: Option<ItemKind>,
    pub by: Option<String>,
    pub text: Option<String>,
    /// Creation time, unix seconds.
    pub time: Option<i64>,
    #[serde(default)]
    pub kids: Vec<u64>,
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

impl HnItem {
    pub fn is_job(&self) -> bool {
        self.kind == Some(ItemKind::Job)
    }

    pub fn is_story(&self) -> bool {
        self.kind == Some(ItemKind::Story)
    }

    /// Deleted and dead items carry no usable content.
    pub fn is_live(&self) -> bool {
        !self.deleted && !self.dead
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.time.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    /// The HTML text handed to an extractor.
    ///
    /// Comments only have `text`. Job stories usually have a `title` and a
    /// `url`, sometimes a `text`; the title becomes the header line.
    pub fn extraction_text(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.title.as_deref(),
            self.text.as_deref(),
            self.url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("<p>"))
        }
    }
}
