//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::rules::RedirectRule;

use super::CreateRuleValues;
use super::Error;
use super::Result;
use super::Storage;
use super::UpdateRuleValues;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres storage
#[derive(Clone, Debug)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage
    ///
    /// Use the `DATABASE_URL` environment variable
    ///
    /// Migrations will be run
    pub async fn new() -> Result<Self> {
        let database_connection_string = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Connection("`DATABASE_URL` is not set".to_string()))?;

        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_connection_string)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

#[async_trait]
impl Storage for Postgres {
    async fn find_all_rules(&self) -> Result<Vec<RedirectRule>> {
        let rules = sqlx::query_as::<_, RedirectRule>(
            r"
            SELECT id, url_old, url_new, created_at, updated_at
            FROM redirects
            ORDER BY id
            ",
        )
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(rules)
    }

    async fn find_single_rule_by_id(&self, id: i64) -> Result<Option<RedirectRule>> {
        let rule = sqlx::query_as::<_, RedirectRule>(
            r"
            SELECT id, url_old, url_new, created_at, updated_at
            FROM redirects
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(rule)
    }

    async fn find_single_rule_by_url_old(&self, url_old: &str) -> Result<Option<RedirectRule>> {
        let rule = sqlx::query_as::<_, RedirectRule>(
            r"
            SELECT id, url_old, url_new, created_at, updated_at
            FROM redirects
            WHERE url_old = $1
            LIMIT 1
            ",
        )
        .bind(url_old)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(rule)
    }

    async fn create_rule(&self, values: &CreateRuleValues<'_>) -> Result<RedirectRule> {
        let rule = sqlx::query_as::<_, RedirectRule>(
            r"
            INSERT INTO redirects (url_old, url_new)
            VALUES ($1, $2)
            RETURNING id, url_old, url_new, created_at, updated_at
            ",
        )
        .bind(values.url_old)
        .bind(values.url_new)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: i64,
        values: &UpdateRuleValues<'_>,
    ) -> Result<Option<RedirectRule>> {
        let rule = sqlx::query_as::<_, RedirectRule>(
            r"
            UPDATE redirects
            SET url_old = $1, url_new = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING id, url_old, url_new, created_at, updated_at
            ",
        )
        .bind(values.url_old)
        .bind(values.url_new)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(rule)
    }

    async fn delete_rule(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM redirects
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}
