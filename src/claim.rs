//! Claim input and validation
//!
//! A [`RawClaim`] is whatever the caller sent. [`validate`] turns it into a
//! [`Claim`], the only form the rest of the pipeline accepts. Validation is
//! pure: no I/O, no side effects, and every violation is reported at once so
//! a form can highlight all offending fields in one round trip.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Accepted title length, in characters.
pub const TITLE_LEN: RangeInclusive<usize> = 10..=150;

/// Accepted statement length, in characters.
pub const STATEMENT_LEN: RangeInclusive<usize> = 20..=1000;

/// The fixed set of claim categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Health,
    Science,
    Technology,
    #[serde(rename = "Social Media")]
    SocialMedia,
    Business,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Politics,
        Category::Health,
        Category::Science,
        Category::Technology,
        Category::SocialMedia,
        Category::Business,
        Category::Other,
    ];

    /// Display name, also the stored form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Health => "Health",
            Category::Science => "Science",
            Category::Technology => "Technology",
            Category::SocialMedia => "Social Media",
            Category::Business => "Business",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

/// Unvalidated claim as received from a caller.
///
/// Missing text fields deserialize as empty strings so they are reported by
/// [`validate`] rather than rejected by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClaim {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl RawClaim {
    pub fn new(
        title: impl Into<String>,
        statement: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            statement: statement.into(),
            category: category.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

/// A validated claim. Only [`validate`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    title: String,
    statement: String,
    category: Category,
    source_url: Option<String>,
}

impl Claim {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// The source URL as submitted; `None` when absent or empty.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }
}

/// Field a violation applies to. `as_str` matches the wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClaimField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "statement")]
    Statement,
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "sourceUrl")]
    SourceUrl,
}

impl ClaimField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimField::Title => "title",
            ClaimField::Statement => "statement",
            ClaimField::Category => "category",
            ClaimField::SourceUrl => "sourceUrl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: ClaimField,
    pub reason: String,
}

/// One or more field violations, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.violations))]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn has_violation(&self, field: ClaimField) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field.as_str(), v.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_length(
    value: &str,
    range: &RangeInclusive<usize>,
    field: ClaimField,
    label: &str,
    violations: &mut Vec<FieldViolation>,
) {
    let len = value.chars().count();
    let reason = if len < *range.start() {
        format!("{} must be at least {} characters.", label, range.start())
    } else if len > *range.end() {
        format!("{} must be {} characters or less.", label, range.end())
    } else {
        return;
    };
    violations.push(FieldViolation { field, reason });
}

/// Absolute URL with a scheme and a host.
fn check_source_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|_| "Please enter a valid URL.".to_string())?;
    if !url.has_host() {
        return Err("Please enter a valid URL.".to_string());
    }
    Ok(())
}

/// Validate a raw claim.
pub fn validate(raw: &RawClaim) -> Result<Claim, ValidationError> {
    let mut violations = Vec::new();

    check_length(&raw.title, &TITLE_LEN, ClaimField::Title, "Title", &mut violations);
    check_length(
        &raw.statement,
        &STATEMENT_LEN,
        ClaimField::Statement,
        "Statement",
        &mut violations,
    );

    let category = match raw.category.parse::<Category>() {
        Ok(category) => Some(category),
        Err(_) => {
            violations.push(FieldViolation {
                field: ClaimField::Category,
                reason: "Please select a category.".to_string(),
            });
            None
        }
    };

    // Checked trimmed, stored as submitted.
    let source_url = match raw.source_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            if let Err(reason) = check_source_url(url.trim()) {
                violations.push(FieldViolation {
                    field: ClaimField::SourceUrl,
                    reason,
                });
            }
            Some(url.to_string())
        }
        _ => None,
    };

    match category {
        Some(category) if violations.is_empty() => Ok(Claim {
            title: raw.title.clone(),
            statement: raw.statement.clone(),
            category,
            source_url,
        }),
        _ => Err(ValidationError { violations }),
    }
}
