use crate::config::AnalyticsConfig;
use crate::record::SalesRecord;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A named, immutable set of records that a summary is computed over.
#[derive(Debug, Clone)]
pub struct Snapshot {
    name: String,
    records: Arc<[SalesRecord]>,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, records: Vec<SalesRecord>) -> Self {
        Self {
            name: name.into(),
            records: records.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSales {
    pub region: String,
    pub revenue: Decimal,
    pub count: usize,
    /// Share of total revenue, in percent, 2 dp.
    pub share: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    pub product_id: String,
    pub revenue: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSummary {
    pub snapshot: String,
    pub transaction_count: usize,
    pub total_revenue: Decimal,
    pub average_amount: Decimal,
    /// Sorted by revenue descending, then region name.
    pub regions: Vec<RegionSales>,
    pub top_products: Vec<ProductSales>,
    /// Products sold fewer times than the threshold, fewest first.
    pub low_performers: Vec<ProductSales>,
    /// Sorted by date ascending.
    pub daily: Vec<DailySales>,
    pub peak_day: Option<DailySales>,
}

pub struct AnalyticsEngine {
    top_n: usize,
    low_sales_threshold: usize,
}

impl AnalyticsEngine {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            low_sales_threshold: 10,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.top_n).with_low_sales_threshold(config.low_sales_threshold)
    }

    pub fn with_low_sales_threshold(mut self, threshold: usize) -> Self {
        self.low_sales_threshold = threshold;
        self
    }

    pub fn summarize(&self, snapshot: &Snapshot) -> AnalyticsSummary {
        let records: Vec<&SalesRecord> = snapshot.records().iter().filter(|r| r.is_valid()).collect();

        let transaction_count = records.len();
        let total_revenue = total_revenue(&records);
        let average_amount = if transaction_count == 0 {
            Decimal::ZERO
        } else {
            total_revenue / Decimal::from(transaction_count)
        };
        let products = product_sales(&records);
        let daily = daily_sales(&records);
        let peak_day = peak_day(&daily);

        let summary = AnalyticsSummary {
            snapshot: snapshot.name().to_string(),
            transaction_count,
            total_revenue,
            average_amount,
            regions: region_sales(&records, total_revenue),
            top_products: top_products(&products, self.top_n),
            low_performers: low_performers(&products, self.low_sales_threshold),
            daily,
            peak_day,
        };

        tracing::info!(
            snapshot = %summary.snapshot,
            transactions = summary.transaction_count,
            revenue = %summary.total_revenue,
            "Computed analytics"
        );
        summary
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Sums never panic; a total past `Decimal::MAX` stays at `Decimal::MAX`.
fn accumulate(total: Decimal, amount: Decimal) -> Decimal {
    total.checked_add(amount).unwrap_or_else(|| {
        tracing::warn!("Revenue total overflowed, clamping to the largest decimal");
        Decimal::MAX
    })
}

pub fn total_revenue(records: &[&SalesRecord]) -> Decimal {
    records.iter().fold(Decimal::ZERO, |total, r| accumulate(total, r.revenue()))
}

/// Revenue and transaction count per key, in no particular order.
fn group_by<'a, F>(records: &[&'a SalesRecord], key: F) -> Vec<(&'a str, Decimal, usize)>
where
    F: Fn(&'a SalesRecord) -> &'a str,
{
    let mut groups: HashMap<&'a str, (Decimal, usize)> = HashMap::new();
    for &record in records {
        let entry = groups.entry(key(record)).or_insert((Decimal::ZERO, 0));
        entry.0 = accumulate(entry.0, record.revenue());
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(key, (revenue, count))| (key, revenue, count))
        .collect()
}

pub fn region_sales(records: &[&SalesRecord], total: Decimal) -> Vec<RegionSales> {
    let mut regions: Vec<RegionSales> = group_by(records, |r| r.region.as_str())
        .into_iter()
        .map(|(region, revenue, count)| RegionSales {
            region: region.to_string(),
            revenue,
            count,
            share: share_of(revenue, total),
        })
        .collect();

    regions.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.region.cmp(&b.region)));
    regions
}

/// Every product, by revenue descending; ties go to the lower product id.
pub fn product_sales(records: &[&SalesRecord]) -> Vec<ProductSales> {
    let mut products: Vec<ProductSales> = group_by(records, |r| r.product_id.as_str())
        .into_iter()
        .map(|(product_id, revenue, count)| ProductSales {
            product_id: product_id.to_string(),
            revenue,
            count,
        })
        .collect();

    products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.product_id.cmp(&b.product_id)));
    products
}

pub fn top_products(products: &[ProductSales], n: usize) -> Vec<ProductSales> {
    products.iter().take(n).cloned().collect()
}

/// Products with fewer than `threshold` sales, ordered by count, revenue, then id.
pub fn low_performers(products: &[ProductSales], threshold: usize) -> Vec<ProductSales> {
    let mut low: Vec<ProductSales> = products.iter().filter(|p| p.count < threshold).cloned().collect();
    low.sort_by(|a, b| {
        a.count
            .cmp(&b.count)
            .then_with(|| a.revenue.cmp(&b.revenue))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    low
}

pub fn daily_sales(records: &[&SalesRecord]) -> Vec<DailySales> {
    let mut by_date: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for record in records {
        let Some(timestamp) = record.timestamp else {
            continue;
        };
        let entry = by_date.entry(timestamp.date()).or_insert((Decimal::ZERO, 0));
        entry.0 = accumulate(entry.0, record.revenue());
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (revenue, count))| DailySales { date, revenue, count })
        .collect()
}

/// Highest revenue day; the earliest date wins a tie.
pub fn peak_day(daily: &[DailySales]) -> Option<DailySales> {
    daily
        .iter()
        .fold(None::<&DailySales>, |best, day| match best {
            Some(best) if best.revenue >= day.revenue => Some(best),
            _ => Some(day),
        })
        .cloned()
}

/// `part` never exceeds `total`, so dividing first keeps this in range.
fn share_of(part: Decimal, total: Decimal) -> Decimal {
    match part.checked_div(total) {
        Some(ratio) => (ratio * Decimal::ONE_HUNDRED).round_dp(2),
        None => Decimal::ZERO,
    }
}
