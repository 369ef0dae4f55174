use crate::config::{EnrichScope, PipelineConfig};
use crate::engine::analytics::{AnalyticsEngine, AnalyticsSummary, Snapshot};
use crate::engine::filter::{self, FilterOptions, FilterSpec};
use crate::engine::validator::{LoadStats, Validator};
use crate::enrichment::catalog::ProductCatalog;
use crate::enrichment::{EnrichmentCache, EnrichmentReport, Enricher};
use crate::error::Result;
use crate::parser::{self, Encoding};
use crate::record::SalesRecord;

use std::path::Path;
use std::sync::Arc;

/// Mutable state that lives for exactly one run.
pub struct RunContext {
    pub validator: Validator,
    pub cache: EnrichmentCache,
}

impl RunContext {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            validator: Validator::new(config.validation.clone()),
            cache: EnrichmentCache::new(),
        }
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub encoding: Encoding,
    pub stats: LoadStats,
    /// Records that failed validation, with their issues.
    pub rejected: Vec<SalesRecord>,
    /// Regions and amount range across all valid records, before filtering.
    pub filter_options: FilterOptions,
    /// The filtered working set, enriched where lookups succeeded.
    pub records: Vec<SalesRecord>,
    pub summary: AnalyticsSummary,
    pub enrichment: EnrichmentReport,
}

pub struct Pipeline {
    config: PipelineConfig,
    catalog: Option<Arc<dyn ProductCatalog>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, catalog: Option<Arc<dyn ProductCatalog>>) -> Self {
        Self { config, catalog }
    }

    pub async fn run(&self, input: impl AsRef<Path>, spec: &FilterSpec) -> Result<PipelineOutput> {
        spec.check()?;
        let input = input.as_ref();
        tracing::info!(input = %input.display(), "Loading sales data");
        let bytes = parser::read_input(input)?;
        self.run_bytes(bytes, spec).await
    }

    pub async fn run_bytes(&self, bytes: Vec<u8>, spec: &FilterSpec) -> Result<PipelineOutput> {
        spec.check()?;
        let mut ctx = RunContext::new(&self.config);

        let parsed = parser::parse_bytes(bytes, &self.config.parser)?;
        let (valid, rejected): (Vec<SalesRecord>, Vec<SalesRecord>) = ctx
            .validator
            .validate_all(parsed.rows)
            .into_iter()
            .partition(|r| r.is_valid());
        let stats = ctx.validator.stats();
        tracing::info!(
            rows_read = stats.rows_read,
            valid = stats.valid,
            invalid = stats.invalid,
            "Validated input"
        );

        let filter_options = FilterOptions::from_records(&valid);
        let filtered = filter::apply(&valid, spec)?;
        let snapshot = Snapshot::new("filtered", filtered.clone());
        let analytics = AnalyticsEngine::from_config(&self.config.analytics);

        let mut targets = match self.config.enrichment.scope {
            EnrichScope::Filtered => filtered,
            EnrichScope::AllValid => valid,
        };

        let enrich = async {
            match (&self.catalog, self.config.enrichment.enabled) {
                (Some(catalog), true) => {
                    let enricher = Enricher::new(Arc::clone(catalog), self.config.enrichment.clone());
                    enricher.enrich(&mut targets, &mut ctx.cache).await
                }
                _ => {
                    tracing::info!("Enrichment disabled");
                    EnrichmentReport::default()
                }
            }
        };
        let (summary, enrichment) = tokio::join!(async { analytics.summarize(&snapshot) }, enrich);

        let records = match self.config.enrichment.scope {
            EnrichScope::Filtered => targets,
            EnrichScope::AllValid => filter::apply(&targets, spec)?,
        };

        Ok(PipelineOutput {
            encoding: parsed.encoding,
            stats,
            rejected,
            filter_options,
            records,
            summary,
            enrichment,
        })
    }
}
