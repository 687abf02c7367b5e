//! Redirect rules

use chrono::naive::NaiveDateTime;

/// A single `url_old -> url_new` mapping
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct RedirectRule {
    /// Rule ID, assigned by storage
    pub id: i64,

    /// Normalized source path, unique across all rules
    pub url_old: String,

    /// Normalized target path, empty while the rule is a placeholder
    pub url_new: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl RedirectRule {
    /// Is the rule a placeholder without a target?
    pub fn is_placeholder(&self) -> bool {
        self.url_new.is_empty()
    }
}
