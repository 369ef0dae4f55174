use crate::config::EnrichmentConfig;
use crate::enrichment::catalog::{ApiProduct, LookupError, ProductCatalog, ProductInfo};
use crate::error::Result;

use async_trait::async_trait;
use reqwest::Client;

/// `ProductCatalog` backed by a JSON HTTP API (`GET {base_url}/{key}`).
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    numeric_ids: bool,
}

impl HttpCatalog {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.lookup_timeout())
            .user_agent(concat!("salesflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            numeric_ids: config.numeric_ids,
        })
    }

    pub fn url_for(&self, product_id: &str) -> Option<String> {
        let key = if self.numeric_ids {
            numeric_key(product_id)?
        } else {
            product_id.to_string()
        };
        Some(format!("{}/{}", self.base_url, key))
    }
}

/// `P101` -> `101`. `None` when the id has no digits.
pub fn numeric_key(product_id: &str) -> Option<String> {
    let digits: String = product_id.chars().filter(|c| c.is_ascii_digit()).collect();
    let trimmed = digits.trim_start_matches('0');
    match (digits.is_empty(), trimmed.is_empty()) {
        (true, _) => None,
        (false, true) => Some("0".to_string()),
        (false, false) => Some(trimmed.to_string()),
    }
}

#[async_trait]
impl ProductCatalog for HttpCatalog {
    async fn fetch(&self, product_id: &str) -> std::result::Result<ProductInfo, LookupError> {
        let url = self.url_for(product_id).ok_or(LookupError::NotFound)?;
        tracing::debug!(%url, product_id, "Catalog lookup");

        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Network {
                    message: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::from_status(status.as_u16()));
        }

        let bytes = resp.bytes().await.map_err(|e| LookupError::Network {
            message: e.to_string(),
        })?;
        let api: ApiProduct =
            serde_json::from_slice(&bytes).map_err(|e| LookupError::InvalidPayload {
                message: e.to_string(),
            })?;

        ProductInfo::try_from(api)
    }
}
