//! The redirect resolver
//!
//! Owns every read and write of the redirect rules. Reads are normalized lookups, writes are
//! validated against the full rule set (uniqueness and cycles) before they reach storage.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::normalize::normalize;
use crate::rules::RedirectRule;
use crate::storage;
use crate::storage::CreateRuleValues;
use crate::storage::Storage;
use crate::storage::UpdateRuleValues;

/// Maximum number of resolved paths kept in the cache
const CACHE_CAPACITY: u64 = 10_000;

/// Reasons a rule can not be written
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The source path is empty
    #[error("Source URL is required")]
    SourceRequired,

    /// The rule points to itself
    #[error("Source and target can not be the same")]
    SelfReference,

    /// Another rule already has the same source
    #[error("A redirect for this source already exists")]
    DuplicateSource,

    /// The target has a rule pointing straight back to the source
    #[error("Target already redirects back to the source")]
    DirectLoop,

    /// Following the chain from the source ends up where it started
    #[error("Redirect would create a loop")]
    CycleDetected,
}

/// Resolver errors
#[derive(Debug, Error)]
pub enum Error {
    /// The write was rejected, nothing is stored
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The storage failed
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// Result type for all resolver interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Redirect resolver
///
/// Cheap to clone, all clones share the same storage, write lock and cache.
#[derive(Clone)]
pub struct RedirectResolver<S: Storage> {
    /// Where the rules live
    storage: S,

    /// Serializes "read all rules, validate, write"
    write_lock: Arc<Mutex<()>>,

    /// Resolved targets by normalized path, `None` when disabled
    cache: Option<Cache<String, Option<String>>>,

    /// Bumped on every invalidation, a lookup that overlaps one is not cached
    generation: Arc<AtomicU64>,
}

impl<S: Storage> RedirectResolver<S> {
    /// Create a resolver on top of a storage
    ///
    /// A `cache_ttl` of zero disables the cache of [`resolve`](Self::resolve)
    pub fn new(storage: S, cache_ttl: Duration) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(cache_ttl)
                .build()
        });

        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Find the rule for a (raw) path
    pub async fn lookup(&self, path: &str) -> Result<Option<RedirectRule>> {
        let path = normalize(path);

        Ok(self.storage.find_single_rule_by_url_old(&path).await?)
    }

    /// Find where a (raw) path redirects to
    ///
    /// A single hop only, the target is never resolved any further. Placeholder rules and rules
    /// that would redirect to the path itself resolve to `None`.
    pub async fn resolve(&self, path: &str) -> Result<Option<String>> {
        let path = normalize(path);

        if let Some(cache) = &self.cache {
            if let Some(target) = cache.get(&path).await {
                return Ok(target);
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);

        let target = self
            .lookup(&path)
            .await?
            .and_then(|rule| effective_target(&rule, &path));

        if let Some(cache) = &self.cache {
            if generation == self.generation.load(Ordering::SeqCst) {
                cache.insert(path.clone(), target.clone()).await;

                // a write slipped in between the check and the insert
                if generation != self.generation.load(Ordering::SeqCst) {
                    cache.invalidate(&path).await;
                }
            }
        }

        Ok(target)
    }

    /// Would writing `url_old -> url_new` create a cycle?
    ///
    /// `exclude_id` is the rule being updated, its current state is ignored
    pub async fn would_create_cycle(
        &self,
        url_old: &str,
        url_new: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let rules = self.storage.find_all_rules().await?;

        Ok(detect_cycle(
            &rules,
            &normalize(url_old),
            &normalize(url_new),
            exclude_id,
        ))
    }

    /// Check if `url_old -> url_new` can be written
    ///
    /// Always reads the rule set fresh from storage
    pub async fn assert_valid(
        &self,
        url_old: &str,
        url_new: &str,
        exclude_id: Option<i64>,
    ) -> Result<()> {
        let rules = self.storage.find_all_rules().await?;

        validate(&rules, &normalize(url_old), &normalize(url_new), exclude_id)?;

        Ok(())
    }

    /// Create a rule
    pub async fn create(&self, url_old: &str, url_new: &str) -> Result<RedirectRule> {
        let url_old = normalize(url_old);
        let url_new = normalize(url_new);

        let _guard = self.write_lock.lock().await;

        self.assert_valid(&url_old, &url_new, None).await?;

        let values = CreateRuleValues {
            url_old: &url_old,
            url_new: &url_new,
        };

        let rule = self.storage.create_rule(&values).await?;
        self.invalidate_cache();

        tracing::info!(
            r#"Redirect {} created: "{}" -> "{}""#,
            rule.id,
            rule.url_old,
            rule.url_new
        );

        Ok(rule)
    }

    /// Update a rule
    ///
    /// Fields that are `None` keep their current value, the merge happens under the write lock.
    /// Returns `None` when there is no rule with the ID
    pub async fn update(
        &self,
        id: i64,
        url_old: Option<&str>,
        url_new: Option<&str>,
    ) -> Result<Option<RedirectRule>> {
        let _guard = self.write_lock.lock().await;

        let Some(current) = self.storage.find_single_rule_by_id(id).await? else {
            return Ok(None);
        };

        let url_old = normalize(url_old.unwrap_or(current.url_old.as_str()));
        let url_new = normalize(url_new.unwrap_or(current.url_new.as_str()));

        self.assert_valid(&url_old, &url_new, Some(id)).await?;

        let values = UpdateRuleValues {
            url_old: &url_old,
            url_new: &url_new,
        };

        let rule = self.storage.update_rule(id, &values).await?;
        self.invalidate_cache();

        if let Some(rule) = &rule {
            tracing::info!(
                r#"Redirect {} updated: "{}" -> "{}""#,
                rule.id,
                rule.url_old,
                rule.url_new
            );
        }

        Ok(rule)
    }

    /// Delete a rule
    ///
    /// Rules that pointed at the deleted source are left alone, they now end in a dead end.
    /// Returns `false` when there is no rule with the ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let rules = self.storage.find_all_rules().await?;

        let Some(rule) = rules.iter().find(|rule| rule.id == id) else {
            return Ok(false);
        };

        let orphans = orphaned_by(&rules, rule);

        let deleted = self.storage.delete_rule(id).await?;
        self.invalidate_cache();

        if deleted {
            tracing::info!(r#"Redirect {id} deleted: "{}""#, rule.url_old);

            if !orphans.is_empty() {
                tracing::warn!(
                    r#"Redirects {orphans:?} still point to "{}", which no longer redirects"#,
                    rule.url_old
                );
            }
        }

        Ok(deleted)
    }

    /// Find all rules
    pub async fn find_all(&self) -> Result<Vec<RedirectRule>> {
        Ok(self.storage.find_all_rules().await?)
    }

    /// Find a single rule by its ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<RedirectRule>> {
        Ok(self.storage.find_single_rule_by_id(id).await?)
    }

    /// Forget all resolved paths
    fn invalidate_cache(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}

/// The normalized target of a rule, unless it does not redirect anywhere
fn effective_target(rule: &RedirectRule, path: &str) -> Option<String> {
    let target = normalize(&rule.url_new);

    (!target.is_empty() && target != normalize(path)).then_some(target)
}

/// IDs of the other rules pointing to the source of a rule
fn orphaned_by(rules: &[RedirectRule], deleted: &RedirectRule) -> Vec<i64> {
    rules
        .iter()
        .filter(|rule| rule.id != deleted.id && rule.url_new == deleted.url_old)
        .map(|rule| rule.id)
        .collect()
}

/// Validate a normalized `url_old -> url_new` candidate against a snapshot of the rules
fn validate(
    rules: &[RedirectRule],
    url_old: &str,
    url_new: &str,
    exclude_id: Option<i64>,
) -> core::result::Result<(), ValidationError> {
    if url_old.is_empty() {
        return Err(ValidationError::SourceRequired);
    }

    if !url_new.is_empty() && url_old == url_new {
        return Err(ValidationError::SelfReference);
    }

    let mut others = rules.iter().filter(|rule| Some(rule.id) != exclude_id);

    if others.clone().any(|rule| rule.url_old == url_old) {
        return Err(ValidationError::DuplicateSource);
    }

    if !url_new.is_empty()
        && others.any(|rule| rule.url_old == url_new && rule.url_new == url_old)
    {
        return Err(ValidationError::DirectLoop);
    }

    if detect_cycle(rules, url_old, url_new, exclude_id) {
        return Err(ValidationError::CycleDetected);
    }

    Ok(())
}

/// Walk the rules as if `url_old -> url_new` was already written
///
/// Returns `true` when the walk from `url_old` comes back to a path it already passed. Reaching
/// a path without a rule is a dead end, not a cycle.
fn detect_cycle(
    rules: &[RedirectRule],
    url_old: &str,
    url_new: &str,
    exclude_id: Option<i64>,
) -> bool {
    if url_new.is_empty() {
        return false;
    }

    let mut mapping = rules
        .iter()
        .filter(|rule| Some(rule.id) != exclude_id && !rule.is_placeholder())
        .map(|rule| (rule.url_old.as_str(), rule.url_new.as_str()))
        .collect::<HashMap<&str, &str>>();

    mapping.insert(url_old, url_new);

    let mut visited = HashSet::new();
    let mut current = url_old;

    while let Some(&next) = mapping.get(current) {
        if next == url_old {
            return true;
        }

        // a loop further down the chain, never reaching the origin
        if !visited.insert(next) {
            return true;
        }

        current = next;
    }

    false
}
