use crate::enrichment::catalog::ProductInfo;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Column order of the input file.
pub const COLUMNS: [&str; 5] = ["transaction_id", "region", "amount", "product_id", "timestamp"];

/// Fields of one input line, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub fields: Vec<String>,
    pub malformed: bool,
}

impl RawRow {
    /// Field at `idx`, or the empty string when the row is too short.
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    SchemaMismatch,
    DuplicateOrMissingId,
    InvalidAmount,
    MissingRegion,
    InvalidTimestamp,
    MissingProductId,
    InvalidIdFormat,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::SchemaMismatch => "schema_mismatch",
            IssueCode::DuplicateOrMissingId => "duplicate_or_missing_id",
            IssueCode::InvalidAmount => "invalid_amount",
            IssueCode::MissingRegion => "missing_region",
            IssueCode::InvalidTimestamp => "invalid_timestamp",
            IssueCode::MissingProductId => "missing_product_id",
            IssueCode::InvalidIdFormat => "invalid_id_format",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub code: IssueCode,
}

impl ValidationIssue {
    pub fn new(field: &'static str, code: IssueCode) -> Self {
        Self { field, code }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationStatus {
    Valid,
    Invalid(Vec<ValidationIssue>),
}

impl ValidationStatus {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        if issues.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid(issues)
        }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ValidationStatus::Valid => &[],
            ValidationStatus::Invalid(issues) => issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub line: usize,
    pub transaction_id: String,
    pub region: String,
    /// `None` only when the source text was not a usable amount.
    pub amount: Option<Decimal>,
    pub product_id: String,
    pub timestamp: Option<NaiveDateTime>,
    pub status: ValidationStatus,
    pub enrichment: Option<ProductInfo>,
}

impl SalesRecord {
    pub fn is_valid(&self) -> bool {
        matches!(self.status, ValidationStatus::Valid)
    }

    /// Amount used for aggregation; invalid records never reach analytics.
    pub fn revenue(&self) -> Decimal {
        self.amount.unwrap_or(Decimal::ZERO)
    }

    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.status.issues().iter().any(|issue| issue.code == code)
    }

    /// Attaches product data. Returns false if the record was already enriched.
    pub fn enrich(&mut self, info: &ProductInfo) -> bool {
        if self.enrichment.is_some() {
            return false;
        }
        self.enrichment = Some(info.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record() -> SalesRecord {
        SalesRecord {
            line: 2,
            transaction_id: "T1".to_string(),
            region: "North".to_string(),
            amount: Some(Decimal::from_str("250.00").unwrap()),
            product_id: "P100".to_string(),
            timestamp: None,
            status: ValidationStatus::Valid,
            enrichment: None,
        }
    }

    fn product(name: &str) -> ProductInfo {
        ProductInfo {
            name: name.to_string(),
            category: "laptops".to_string(),
            brand: None,
            price: Decimal::from(999),
            rating: 4.5,
            stock: 3,
        }
    }

    #[test]
    fn test_enrich_sets_at_most_once() {
        let mut rec = record();

        assert!(rec.enrich(&product("first")));
        assert!(!rec.enrich(&product("second")));
        assert_eq!(rec.enrichment.unwrap().name, "first");
    }

    #[test]
    fn test_status_from_issues() {
        assert_eq!(ValidationStatus::from_issues(vec![]), ValidationStatus::Valid);

        let status = ValidationStatus::from_issues(vec![ValidationIssue::new(
            "region",
            IssueCode::MissingRegion,
        )]);
        assert_eq!(status.issues().len(), 1);
        assert_eq!(status.issues()[0].code.as_str(), "missing_region");
    }

    #[test]
    fn test_short_row_field_is_empty() {
        let row = RawRow {
            line: 3,
            fields: vec!["T1".to_string()],
            malformed: true,
        };
        assert_eq!(row.field(0), "T1");
        assert_eq!(row.field(4), "");
    }
}
