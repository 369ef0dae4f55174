use crate::error::Result;
use crate::record::SalesRecord;

use csv::WriterBuilder;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 10] = [
    "transaction_id",
    "region",
    "amount",
    "product_id",
    "timestamp",
    "api_name",
    "api_category",
    "api_brand",
    "api_rating",
    "api_match",
];

/// Writes records as pipe-delimited rows. Missing enrichment leaves the api_* columns empty.
pub fn write_enriched<W: Write>(records: &[SalesRecord], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b'|').from_writer(writer);
    wtr.write_record(HEADER)?;

    for record in records {
        let amount = record.amount.map(|a| a.to_string()).unwrap_or_default();
        let timestamp = record.timestamp.map(|t| t.to_string()).unwrap_or_default();
        let info = record.enrichment.as_ref();
        let rating = info.map(|i| i.rating.to_string()).unwrap_or_default();

        wtr.write_record([
            record.transaction_id.as_str(),
            record.region.as_str(),
            amount.as_str(),
            record.product_id.as_str(),
            timestamp.as_str(),
            info.map(|i| i.name.as_str()).unwrap_or(""),
            info.map(|i| i.category.as_str()).unwrap_or(""),
            info.and_then(|i| i.brand.as_deref()).unwrap_or(""),
            rating.as_str(),
            if info.is_some() { "true" } else { "false" },
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn save_enriched(records: &[SalesRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(csv::Error::from)?;
    }
    let file = File::create(path).map_err(csv::Error::from)?;
    write_enriched(records, file)?;

    tracing::info!(path = %path.display(), records = records.len(), "Saved enriched data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::catalog::ProductInfo;
    use crate::record::ValidationStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn record(tx: &str, product: &str, enrichment: Option<ProductInfo>) -> SalesRecord {
        SalesRecord {
            line: 2,
            transaction_id: tx.to_string(),
            region: "North".to_string(),
            amount: Some(Decimal::from_str("250.00").unwrap()),
            product_id: product.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 5).and_then(|d| d.and_hms_opt(0, 0, 0)),
            status: ValidationStatus::Valid,
            enrichment,
        }
    }

    #[test]
    fn test_write_enriched_output() {
        let info = ProductInfo {
            name: "Essence Mascara".to_string(),
            category: "beauty".to_string(),
            brand: Some("Essence".to_string()),
            price: Decimal::from_str("9.99").unwrap(),
            rating: 4.5,
            stock: 5,
        };
        let records = vec![record("T1", "P1", Some(info)), record("T2", "P2", None)];

        let mut buf = Vec::new();
        write_enriched(&records, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "transaction_id|region|amount|product_id|timestamp|api_name|api_category|api_brand|api_rating|api_match"
        );
        assert_eq!(
            lines[1],
            "T1|North|250.00|P1|2024-01-05 00:00:00|Essence Mascara|beauty|Essence|4.5|true"
        );
        assert_eq!(lines[2], "T2|North|250.00|P2|2024-01-05 00:00:00|||||false");
    }
}
