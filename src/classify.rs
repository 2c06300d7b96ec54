//! Maps remote responses onto the [`ErrorKind`] taxonomy.
//!
//! The data API reports failures as a status code plus a JSON body of the
//! form `{"code": "...", "message": "...", "details": ..., "hint": ...}`.
//! Only the `code` and `message` fields are consulted.

use crate::errors::ErrorKind;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Which kind of call produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Probe,
    Insert,
    Execute,
}

/// SQLSTATE for an undefined table.
const UNDEFINED_TABLE: &str = "42P01";
/// API-level "table not found in the schema cache".
const SCHEMA_CACHE_MISS: &str = "PGRST205";
/// SQLSTATE for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn missing_relation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)^\s*(relation\s+\S+\s+does not exist|could not find the table\s+\S+\s+in the schema cache)"#,
        )
        .expect("missing-relation pattern is valid")
    })
}

fn parse_body(body: &str) -> ErrorBody {
    serde_json::from_str(body).unwrap_or_default()
}

/// True when the body says the addressed relation does not exist.
///
/// A body carrying a `code` is judged by that code alone. The message text is
/// only matched, from its start, when no code is present.
pub fn indicates_missing_relation(body: &str) -> bool {
    let parsed = parse_body(body);
    match parsed.code.as_deref() {
        Some(code) => code == UNDEFINED_TABLE || code == SCHEMA_CACHE_MISS,
        None => {
            let text = parsed.message.as_deref().unwrap_or(body);
            missing_relation_regex().is_match(text)
        }
    }
}

/// True when the body reports a unique/primary key violation.
///
/// A bare 409 counts only when the body has no `code`; 409 is also used for
/// foreign key violations (`23503`).
pub fn indicates_conflict(status: u16, body: &str) -> bool {
    match parse_body(body).code.as_deref() {
        Some(code) => code == UNIQUE_VIOLATION,
        None => status == 409,
    }
}

/// Classifies one HTTP response.
///
/// Returns `Ok(())` for any 2xx. 401 and 403 are never read as absence, even
/// if the body mentions a missing relation.
pub fn classify(op: Operation, status: u16, body: &str) -> Result<(), ErrorKind> {
    if (200..300).contains(&status) {
        return Ok(());
    }

    let client_error = (400..500).contains(&status);
    let access_denied = status == 401 || status == 403;

    match op {
        Operation::Probe => {
            if client_error && !access_denied && indicates_missing_relation(body) {
                Err(ErrorKind::Missing)
            } else {
                Err(ErrorKind::Transient)
            }
        }
        Operation::Insert => {
            if indicates_conflict(status, body) {
                Err(ErrorKind::Conflict)
            } else if client_error && !access_denied && indicates_missing_relation(body) {
                Err(ErrorKind::Missing)
            } else {
                Err(ErrorKind::Transient)
            }
        }
        Operation::Execute => {
            if client_error {
                Err(ErrorKind::MalformedStatement)
            } else {
                Err(ErrorKind::Transient)
            }
        }
    }
}

/// Short, single-line excerpt of a response body for logs and reports.
pub fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{}…", cut)
    }
}
