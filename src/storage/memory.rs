//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::rules::RedirectRule;

use super::CreateRuleValues;
use super::Result;
use super::Storage;
use super::UpdateRuleValues;

/// Rules and the last assigned ID
#[derive(Debug, Default)]
struct Table {
    /// Last assigned ID, IDs start at 1
    last_id: i64,

    /// All rules, keyed by ID
    rules: BTreeMap<i64, RedirectRule>,
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "postgres", allow(dead_code))]
pub struct Memory {
    /// All rules in storage
    table: Arc<Mutex<Table>>,
}

#[cfg_attr(feature = "postgres", allow(dead_code))]
impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for Memory {
    async fn find_all_rules(&self) -> Result<Vec<RedirectRule>> {
        Ok(self.table.lock().await.rules.values().cloned().collect())
    }

    async fn find_single_rule_by_id(&self, id: i64) -> Result<Option<RedirectRule>> {
        Ok(self.table.lock().await.rules.get(&id).cloned())
    }

    async fn find_single_rule_by_url_old(&self, url_old: &str) -> Result<Option<RedirectRule>> {
        Ok(self
            .table
            .lock()
            .await
            .rules
            .values()
            .find(|rule| rule.url_old == url_old)
            .cloned())
    }

    async fn create_rule(&self, values: &CreateRuleValues<'_>) -> Result<RedirectRule> {
        let mut table = self.table.lock().await;

        table.last_id += 1;

        let now = Utc::now().naive_utc();
        let rule = RedirectRule {
            id: table.last_id,
            url_old: values.url_old.to_string(),
            url_new: values.url_new.to_string(),
            created_at: now,
            updated_at: now,
        };

        table.rules.insert(rule.id, rule.clone());

        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: i64,
        values: &UpdateRuleValues<'_>,
    ) -> Result<Option<RedirectRule>> {
        Ok(self.table.lock().await.rules.get_mut(&id).map(|rule| {
            rule.url_old = values.url_old.to_string();
            rule.url_new = values.url_new.to_string();
            rule.updated_at = Utc::now().naive_utc();

            rule.clone()
        }))
    }

    async fn delete_rule(&self, id: i64) -> Result<bool> {
        Ok(self.table.lock().await.rules.remove(&id).is_some())
    }
}
