pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod record;

use crate::config::PipelineConfig;
use crate::engine::validator::{LoadStats, Validator};
use crate::error::Result;
use crate::record::SalesRecord;

use std::path::Path;

/// Reads, decodes and validates a sales file in one go.
pub fn load_records(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<(Vec<SalesRecord>, LoadStats)> {
    let bytes = parser::read_input(path)?;
    let parsed = parser::parse_bytes(bytes, &config.parser)?;

    let mut validator = Validator::new(config.validation.clone());
    let records = validator.validate_all(parsed.rows);
    Ok((records, validator.stats()))
}
