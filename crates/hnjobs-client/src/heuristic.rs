//! Rule-based field extraction for "Company | Role | Location | ..." posts.

use std::sync::LazyLock;

use hnjobs_core::error::AppError;
use hnjobs_core::models::JobFields;
use hnjobs_core::traits::FieldExtractor;
use regex::Regex;
use scraper::Html;

static SALARY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[$€£]|k|equity").expect("valid salary marker regex"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+").expect("valid email regex"));

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));

// Explicit compensation only; a bare "$1" inside a URL does not count.
static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\$\d{2,3}[,\d]*[kK]?\s*(?:[-–—]\s*\$?\d{2,3}[,\d]*[kK]?)?",
        r"|€[\d,]+",
        r"|£[\d,]+",
        r"|USD\s*[\d,]+",
        r"|(?m:^Compensation[:\s]+[^\n]+)",
    ))
    .expect("valid money regex")
});

/// Extractor that applies [`parse_job_post`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FieldExtractor for HeuristicExtractor {
    async fn extract(&self, text: &str) -> Result<JobFields, AppError> {
        Ok(parse_job_post(text))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Strip markup and decode entities. Each tag boundary becomes a line
/// break; lines are trimmed and blank ones dropped.
pub fn clean_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let joined = fragment.root_element().text().collect::<Vec<_>>().join("\n");

    joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a job post whose first line follows the `Company | Role | ...`
/// convention. Fields that cannot be placed stay `None`.
pub fn parse_job_post(html: &str) -> JobFields {
    let clean = clean_html(html);
    let (header, body) = match clean.split_once('\n') {
        Some((header, body)) => (header, body.trim()),
        None => (clean.as_str(), ""),
    };

    let segments: Vec<Option<&str>> = header
        .split('|')
        .map(str::trim)
        .map(|s| (!s.is_empty()).then_some(s))
        .collect();

    let mut fields = JobFields {
        description: Some(body.to_string()),
        ..JobFields::empty()
    };

    fields.company = segments.first().copied().flatten().map(str::to_string);

    if let Some(Some(second)) = segments.get(1) {
        if is_salary_like(second) {
            fields.salary = Some(second.to_string());
        } else {
            fields.role = Some(second.to_string());
        }
    }

    if let Some(Some(third)) = segments.get(2) {
        if fields.salary.is_none() && is_salary_like(third) {
            fields.salary = Some(third.to_string());
        } else if fields.role.is_none() && (fields.salary.is_none() || segments.len() > 3) {
            // After a salary in segment 1, a lone trailing segment is a location.
            fields.role = Some(third.to_string());
        } else {
            fields.location = Some(third.to_string());
        }
    }

    if let Some(Some(fourth)) = segments.get(3) {
        fields.location = Some(fourth.to_string());
    }

    fields.contact = EMAIL
        .find(&clean)
        .or_else(|| URL.find(&clean))
        .map(|m| m.as_str().to_string());

    if let Some(m) = MONEY.find(&clean) {
        fields.salary = Some(m.as_str().trim().to_string());
    }

    fields
}

fn is_salary_like(segment: &str) -> bool {
    SALARY_MARKER.is_match(segment)
}
