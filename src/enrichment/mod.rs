pub mod catalog;
pub mod http;

use crate::config::EnrichmentConfig;
use crate::enrichment::catalog::{LookupError, ProductCatalog, ProductInfo};
use crate::record::SalesRecord;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};

/// Terminal outcome for a product that could not be enriched this run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichmentFailure {
    #[error("enrichment failed: not found ({0})")]
    NotFound(LookupError),

    #[error("enrichment failed: gave up after {attempts} attempts ({last})")]
    RetriesExhausted { attempts: u32, last: LookupError },

    #[error("enrichment failed: run deadline reached before lookup finished")]
    Abandoned,
}

/// Lookup results for one pipeline run, successes and failures alike.
#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: HashMap<String, Result<ProductInfo, EnrichmentFailure>>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, product_id: &str) -> Option<&Result<ProductInfo, EnrichmentFailure>> {
        self.entries.get(product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.entries.contains_key(product_id)
    }

    /// First result for a product sticks.
    fn record(&mut self, product_id: String, outcome: Result<ProductInfo, EnrichmentFailure>) {
        self.entries.entry(product_id).or_insert(outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    /// Distinct products the records needed.
    pub products_requested: usize,
    pub products_enriched: usize,
    pub records_enriched: usize,
    pub failures: BTreeMap<String, EnrichmentFailure>,
}

pub struct Enricher {
    catalog: Arc<dyn ProductCatalog>,
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn ProductCatalog>, config: EnrichmentConfig) -> Self {
        Self { catalog, config }
    }

    /// Looks up each distinct product once and merges results into `records`.
    /// Only valid, not-yet-enriched records are touched.
    pub async fn enrich(&self, records: &mut [SalesRecord], cache: &mut EnrichmentCache) -> EnrichmentReport {
        let wanted = distinct_products(records);
        let pending: Vec<String> = wanted.iter().filter(|id| !cache.contains(id)).cloned().collect();

        tracing::info!(
            products = wanted.len(),
            cached = wanted.len() - pending.len(),
            "Starting enrichment"
        );

        if !pending.is_empty() {
            self.lookup_all(&pending, cache).await;
        }

        let mut report = EnrichmentReport {
            products_requested: wanted.len(),
            ..EnrichmentReport::default()
        };
        for id in &wanted {
            match cache.get(id) {
                Some(Ok(_)) => report.products_enriched += 1,
                Some(Err(failure)) => {
                    report.failures.insert(id.clone(), failure.clone());
                }
                None => {}
            }
        }

        for record in records.iter_mut().filter(|r| r.is_valid()) {
            if let Some(Ok(info)) = cache.get(&record.product_id) {
                if record.enrich(info) {
                    report.records_enriched += 1;
                }
            }
        }

        tracing::info!(
            enriched_products = report.products_enriched,
            failed_products = report.failures.len(),
            enriched_records = report.records_enriched,
            "Enrichment finished"
        );
        report
    }

    async fn lookup_all(&self, product_ids: &[String], cache: &mut EnrichmentCache) {
        let deadline = Instant::now() + self.config.phase_timeout();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let (tx, mut rx) = mpsc::channel(product_ids.len().max(1));
        let mut tasks = JoinSet::new();

        for product_id in product_ids {
            let catalog = Arc::clone(&self.catalog);
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            let tx = tx.clone();
            let product_id = product_id.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = fetch_with_retry(catalog.as_ref(), &product_id, &config).await;
                let _ = tx.send((product_id, outcome)).await;
            });
        }
        drop(tx);

        // Single consumer: only this loop writes to the cache.
        loop {
            match time::timeout_at(deadline, rx.recv()).await {
                Ok(Some((product_id, outcome))) => cache.record(product_id, outcome),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.config.phase_timeout_ms,
                        "Enrichment deadline reached, abandoning in-flight lookups"
                    );
                    break;
                }
            }
        }
        tasks.shutdown().await;

        for product_id in product_ids {
            if !cache.contains(product_id) {
                cache.record(product_id.clone(), Err(EnrichmentFailure::Abandoned));
            }
        }
    }
}

/// Retries transient errors with exponential backoff; every attempt is time-boxed.
pub async fn fetch_with_retry(
    catalog: &dyn ProductCatalog,
    product_id: &str,
    config: &EnrichmentConfig,
) -> Result<ProductInfo, EnrichmentFailure> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match time::timeout(config.lookup_timeout(), catalog.fetch(product_id)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout),
        };

        match result {
            Ok(info) => return Ok(info),
            Err(e) if !e.is_transient() => {
                tracing::warn!(product_id, error = %e, "Product lookup failed");
                return Err(EnrichmentFailure::NotFound(e));
            }
            Err(e) if attempt >= max_attempts => {
                tracing::warn!(product_id, attempts = attempt, error = %e, "Product lookup gave up");
                return Err(EnrichmentFailure::RetriesExhausted { attempts: attempt, last: e });
            }
            Err(e) => {
                let delay = config.backoff(attempt);
                tracing::debug!(product_id, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying lookup");
                time::sleep(delay).await;
            }
        }
    }
}

/// Product ids of valid, unenriched records in first-seen order.
fn distinct_products(records: &[SalesRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| r.is_valid() && r.enrichment.is_none() && !r.product_id.is_empty())
        .filter(|r| seen.insert(r.product_id.as_str()))
        .map(|r| r.product_id.clone())
        .collect()
}
