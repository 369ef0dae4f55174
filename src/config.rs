use crate::error::{PipelineError, Result};

use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parser: ParserConfig,
    pub validation: ValidationConfig,
    pub analytics: AnalyticsConfig,
    pub enrichment: EnrichmentConfig,
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PipelineError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.parser.delimiter_byte()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub delimiter: char,
    pub has_headers: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: '|',
            has_headers: true,
        }
    }
}

impl ParserConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(PipelineError::Config {
                message: format!("Delimiter '{}' must be a single ASCII character", self.delimiter),
            })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// chrono format string; date-only formats are accepted.
    pub timestamp_format: String,
    pub transaction_id_prefix: Option<String>,
    pub product_id_prefix: Option<String>,
    /// Larger amounts are rejected as `invalid_amount`.
    pub max_amount: Decimal,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timestamp_format: "%Y-%m-%d".to_string(),
            transaction_id_prefix: None,
            product_id_prefix: None,
            max_amount: Decimal::from(1_000_000_000_000_000i64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub top_n: usize,
    /// Products with fewer transactions than this are reported as low performers.
    pub low_sales_threshold: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            low_sales_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichScope {
    Filtered,
    AllValid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub scope: EnrichScope,
    pub base_url: String,
    /// Send only the digits of a product id (`P101` -> `101`).
    pub numeric_ids: bool,
    pub max_concurrency: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub lookup_timeout_ms: u64,
    pub phase_timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: EnrichScope::Filtered,
            base_url: "https://dummyjson.com/products".to_string(),
            numeric_ids: true,
            max_concurrency: 8,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2_000,
            lookup_timeout_ms: 10_000,
            phase_timeout_ms: 60_000,
        }
    }
}

impl EnrichmentConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn phase_timeout(&self) -> Duration {
        Duration::from_millis(self.phase_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based), doubling up to the ceiling.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let millis = self.initial_backoff_ms.saturating_mul(factor);
        Duration::from_millis(millis.min(self.max_backoff_ms))
    }
}
