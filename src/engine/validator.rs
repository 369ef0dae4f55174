use crate::config::ValidationConfig;
use crate::record::{IssueCode, RawRow, SalesRecord, ValidationIssue, ValidationStatus};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

const TRANSACTION_ID: usize = 0;
const REGION: usize = 1;
const AMOUNT: usize = 2;
const PRODUCT_ID: usize = 3;
const TIMESTAMP: usize = 4;

/// Row counts for one load. `rows_read` always equals `valid + invalid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_read: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl LoadStats {
    pub fn reconciles(&self) -> bool {
        self.rows_read == self.valid + self.invalid
    }
}

/// Turns raw rows into `SalesRecord`s. Holds the ids seen so far in this load.
pub struct Validator {
    config: ValidationConfig,
    seen_ids: HashSet<String>,
    stats: LoadStats,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            seen_ids: HashSet::new(),
            stats: LoadStats::default(),
        }
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn validate(&mut self, row: RawRow) -> SalesRecord {
        let mut issues = Vec::new();

        if row.malformed {
            issues.push(ValidationIssue::new("row", IssueCode::SchemaMismatch));
        }

        let transaction_id = row.field(TRANSACTION_ID).to_string();
        if transaction_id.is_empty() || !self.seen_ids.insert(transaction_id.clone()) {
            issues.push(ValidationIssue::new("transaction_id", IssueCode::DuplicateOrMissingId));
        }

        let amount = parse_amount(row.field(AMOUNT)).filter(|a| *a <= self.config.max_amount);
        if amount.is_none() {
            issues.push(ValidationIssue::new("amount", IssueCode::InvalidAmount));
        }

        let region = row.field(REGION).to_string();
        if region.is_empty() {
            issues.push(ValidationIssue::new("region", IssueCode::MissingRegion));
        }

        let timestamp = parse_timestamp(row.field(TIMESTAMP), &self.config.timestamp_format);
        if timestamp.is_none() {
            issues.push(ValidationIssue::new("timestamp", IssueCode::InvalidTimestamp));
        }

        let product_id = row.field(PRODUCT_ID).to_string();
        if product_id.is_empty() {
            issues.push(ValidationIssue::new("product_id", IssueCode::MissingProductId));
        }

        if !has_prefix(&transaction_id, self.config.transaction_id_prefix.as_deref()) {
            issues.push(ValidationIssue::new("transaction_id", IssueCode::InvalidIdFormat));
        }
        if !has_prefix(&product_id, self.config.product_id_prefix.as_deref()) {
            issues.push(ValidationIssue::new("product_id", IssueCode::InvalidIdFormat));
        }

        self.stats.rows_read += 1;
        if issues.is_empty() {
            self.stats.valid += 1;
        } else {
            self.stats.invalid += 1;
            tracing::debug!(
                line = row.line,
                transaction_id = %transaction_id,
                issues = ?issues.iter().map(|i| i.code.as_str()).collect::<Vec<_>>(),
                "Rejected row"
            );
        }

        SalesRecord {
            line: row.line,
            transaction_id,
            region,
            amount,
            product_id,
            timestamp,
            status: ValidationStatus::from_issues(issues),
            enrichment: None,
        }
    }

    pub fn validate_all(&mut self, rows: impl IntoIterator<Item = RawRow>) -> Vec<SalesRecord> {
        rows.into_iter().map(|row| self.validate(row)).collect()
    }
}

/// Accepts thousands separators. Rejects negatives and anything that is not a plain decimal.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let amount = Decimal::from_str(&cleaned).ok()?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return None;
    }
    Some(amount)
}

/// Date-only formats resolve to midnight.
pub fn parse_timestamp(raw: &str, format: &str) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(raw, format).ok().or_else(|| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

fn has_prefix(value: &str, prefix: Option<&str>) -> bool {
    match prefix {
        Some(prefix) if !value.is_empty() => value.starts_with(prefix),
        _ => true,
    }
}
