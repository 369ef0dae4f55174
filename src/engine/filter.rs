use crate::error::{PipelineError, Result};
use crate::record::SalesRecord;

use rust_decimal::Decimal;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub region: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl FilterSpec {
    pub fn check(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(PipelineError::InvalidFilter { min, max });
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &SalesRecord) -> bool {
        let region_ok = match self.region.as_deref().map(str::trim) {
            Some(region) if !region.is_empty() => record.region == region,
            _ => true,
        };
        let amount = record.revenue();
        let min_ok = self.min_amount.map_or(true, |min| amount >= min);
        let max_ok = self.max_amount.map_or(true, |max| amount <= max);

        region_ok && min_ok && max_ok
    }
}

/// Returns the records matching `spec`, in their original order.
pub fn apply(records: &[SalesRecord], spec: &FilterSpec) -> Result<Vec<SalesRecord>> {
    spec.check()?;

    let subset: Vec<SalesRecord> = records
        .iter()
        .filter(|record| record.is_valid() && spec.matches(record))
        .cloned()
        .collect();

    tracing::info!(
        input = records.len(),
        output = subset.len(),
        region = ?spec.region,
        min_amount = ?spec.min_amount,
        max_amount = ?spec.max_amount,
        "Applied filter"
    );
    Ok(subset)
}

/// Values a filter prompt can offer: distinct regions and the amount range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl FilterOptions {
    pub fn from_records(records: &[SalesRecord]) -> Self {
        let valid = records.iter().filter(|r| r.is_valid());

        let mut regions = BTreeSet::new();
        let mut min_amount: Option<Decimal> = None;
        let mut max_amount: Option<Decimal> = None;
        for record in valid {
            regions.insert(record.region.clone());
            let amount = record.revenue();
            min_amount = Some(min_amount.map_or(amount, |m| m.min(amount)));
            max_amount = Some(max_amount.map_or(amount, |m| m.max(amount)));
        }

        Self {
            regions: regions.into_iter().collect(),
            min_amount,
            max_amount,
        }
    }
}
