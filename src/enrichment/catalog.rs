use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Product metadata from the external catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInfo {
    pub name: String,
    pub category: String,
    pub brand: Option<String>,
    pub price: Decimal,
    pub rating: f64,
    pub stock: u64,
}

/// Catalog response body. Every field is optional until checked.
#[derive(Debug, Deserialize)]
pub struct ApiProduct {
    #[serde(alias = "name")]
    pub title: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub rating: Option<f64>,
    pub stock: Option<u64>,
}

impl TryFrom<ApiProduct> for ProductInfo {
    type Error = LookupError;

    fn try_from(api: ApiProduct) -> Result<Self, Self::Error> {
        let missing = |field: &str| LookupError::InvalidPayload {
            message: format!("missing required field '{}'", field),
        };

        let name = api.title.filter(|t| !t.is_empty()).ok_or_else(|| missing("title"))?;
        let category = api.category.filter(|c| !c.is_empty()).ok_or_else(|| missing("category"))?;
        let price = api.price.ok_or_else(|| missing("price"))?;
        let rating = api
            .rating
            .filter(|r| r.is_finite())
            .ok_or_else(|| missing("rating"))?;
        let stock = api.stock.ok_or_else(|| missing("stock"))?;

        Ok(ProductInfo {
            name,
            category,
            brand: api.brand,
            price,
            rating,
            stock,
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("product not found")]
    NotFound,

    #[error("request rejected with status {status}")]
    Client { status: u16 },

    #[error("invalid catalog payload: {message}")]
    InvalidPayload { message: String },

    #[error("rate limited")]
    RateLimited,

    #[error("server error with status {status}")]
    Server { status: u16 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("lookup timed out")]
    Timeout,
}

impl LookupError {
    /// Transient failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LookupError::RateLimited
                | LookupError::Server { .. }
                | LookupError::Network { .. }
                | LookupError::Timeout
        )
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            404 => LookupError::NotFound,
            429 => LookupError::RateLimited,
            500..=599 => LookupError::Server { status },
            _ => LookupError::Client { status },
        }
    }
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn fetch(&self, product_id: &str) -> Result<ProductInfo, LookupError>;
}
