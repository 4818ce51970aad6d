use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignError};

/// Maximum length of a sanitized storage file stem.
pub const MAX_FILE_STEM_LEN: usize = 50;

/// Events recorded when the caller supplies no audit trail of its own.
pub const DEFAULT_AUDIT_EVENTS: [&str; 4] = [
    "Document Created",
    "Document Viewed by Signer",
    "Signature Applied",
    "Document Completed",
];

// ============================================================================
// Data Structures
// ============================================================================

/// Everything known about one signing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    /// `data:image/png;base64,...` URI of the drawn signature
    #[serde(alias = "signatureData")]
    pub signature_image_data: String,
    pub signer_name: String,
    pub signer_email: String,
    /// ISO-8601 signing instant
    pub signed_at: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub document_title: String,
    #[serde(default)]
    pub document_description: Option<String>,
    /// Ordered audit events; empty means "derive from `signed_at`"
    #[serde(default)]
    pub audit_trail: Vec<AuditEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event: String,
    /// ISO-8601 instant of the event
    pub at: String,
}

impl AuditEntry {
    pub fn new(event: impl Into<String>, at: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            at: at.into(),
        }
    }
}

impl SignatureInfo {
    /// Checks the fields the generators rely on. Callers are expected to run
    /// this before handing the info to the core.
    pub fn validate(&self) -> Result<()> {
        if self.signer_name.trim().is_empty() {
            return Err(SignError::ValidationError("signer name is required".into()));
        }
        if self.signer_email.trim().is_empty() {
            return Err(SignError::ValidationError("signer email is required".into()));
        }
        if self.signature_image_data.trim().is_empty() {
            return Err(SignError::ValidationError("signature image is required".into()));
        }
        self.signed_at()?;
        self.audit_events()?;
        Ok(())
    }

    pub fn signed_at(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.signed_at)
    }

    /// The IP address, treating an empty string as absent.
    pub fn ip(&self) -> Option<&str> {
        non_empty(self.ip_address.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(self.document_description.as_deref())
    }

    /// Audit events in display order, each with its parsed instant.
    pub fn audit_events(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        if self.audit_trail.is_empty() {
            let signed_at = self.signed_at()?;
            return Ok(DEFAULT_AUDIT_EVENTS
                .iter()
                .map(|event| (event.to_string(), signed_at))
                .collect());
        }

        self.audit_trail
            .iter()
            .map(|entry| Ok((entry.event.clone(), parse_timestamp(&entry.at)?)))
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parses RFC 3339, offset-less date-times (taken as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }

    Err(SignError::ValidationError(format!("invalid timestamp: {:?}", raw)))
}

/// `Jan 1, 2024, 12:00 PM UTC`
pub fn format_block_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %I:%M %p UTC").to_string()
}

/// `January 1, 2024 at 12:00:00 PM UTC`
pub fn format_long_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y at %I:%M:%S %p UTC").to_string()
}

/// `Jan 1, 2024, 12:00 PM`
pub fn format_audit_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %I:%M %p").to_string()
}

/// `2024-01-01T12:00:00.000Z`
pub fn format_iso(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Storage Filenames
// ============================================================================

/// Reduces a document title to `[A-Za-z0-9_]`, at most 50 characters.
pub fn safe_file_stem(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let stem: String = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_FILE_STEM_LEN)
        .collect();

    if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    }
}

pub fn signed_filename(title: &str) -> String {
    format!("{}_signed.pdf", safe_file_stem(title))
}
