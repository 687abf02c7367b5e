//! All things related to the storage of redirect rules

use async_trait::async_trait;
use thiserror::Error;

use crate::rules::RedirectRule;

pub use memory::Memory;
#[cfg(feature = "postgres")]
pub use postgres::Postgres;

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

/// Setup the storage
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
pub async fn setup() -> Result<Memory> {
    tracing::info!("Using in-memory storage, rules are lost on shutdown");

    Ok(Memory::new())
}

/// Setup the storage
///
/// Uses the `DATABASE_URL` environment variable
#[cfg(feature = "postgres")]
pub async fn setup() -> Result<Postgres> {
    Postgres::new().await
}

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a rule
///
/// Both paths are expected to be normalized already
pub struct CreateRuleValues<'a> {
    /// The source path
    pub url_old: &'a str,

    /// The target path, empty for a placeholder
    pub url_new: &'a str,
}

/// Values to update a rule
///
/// Both paths are expected to be normalized already
pub struct UpdateRuleValues<'a> {
    /// The new source path
    pub url_old: &'a str,

    /// The new target path, empty for a placeholder
    pub url_new: &'a str,
}

/// Storage with all supported operations
///
/// No validation happens here, the resolver is the only gate for writes
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find all rules, ordered by ID
    async fn find_all_rules(&self) -> Result<Vec<RedirectRule>>;

    /// Find a single rule by its ID
    async fn find_single_rule_by_id(&self, id: i64) -> Result<Option<RedirectRule>>;

    /// Find a single rule by its (normalized) source path
    async fn find_single_rule_by_url_old(&self, url_old: &str) -> Result<Option<RedirectRule>>;

    /// Create a rule, the storage assigns the ID
    async fn create_rule(&self, values: &CreateRuleValues<'_>) -> Result<RedirectRule>;

    /// Update a rule
    ///
    /// Returns `None` when there is no rule with the ID
    async fn update_rule(
        &self,
        id: i64,
        values: &UpdateRuleValues<'_>,
    ) -> Result<Option<RedirectRule>>;

    /// Delete a rule
    ///
    /// Returns `false` when there is no rule with the ID
    async fn delete_rule(&self, id: i64) -> Result<bool>;
}
