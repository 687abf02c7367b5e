//! Redirects API endpoints
//!
//! Everything related to the management of redirect rules

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::normalize::normalize;
use crate::resolver::RedirectResolver;
use crate::rules::RedirectRule;
use crate::storage::Storage;

use super::Admin;
use super::Error;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;

/// Redirect response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    /// Rule ID
    pub id: i64,

    /// Normalized source path
    pub url_old: String,

    /// Normalized target path, empty for a placeholder
    pub url_new: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl RedirectResponse {
    /// Create a response from a [`RedirectRule`](RedirectRule)
    fn from_rule(rule: RedirectRule) -> Self {
        Self {
            id: rule.id,
            url_old: rule.url_old,
            url_new: rule.url_new,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }

    /// Create a response from multiple [`RedirectRule`](RedirectRule)s
    fn from_rule_multiple(rules: Vec<RedirectRule>) -> Vec<Self> {
        rules.into_iter().map(Self::from_rule).collect()
    }
}

/// List all redirects
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/redirects
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": 1, "urlOld": "/listing.php", "urlNew": "/properties" ... } ] }
/// ```
pub async fn list<S: Storage>(
    _admin: Admin,
    Extension(resolver): Extension<RedirectResolver<S>>,
) -> Result<Success<Vec<RedirectResponse>>, Error> {
    let rules = resolver.find_all().await?;

    Ok(Success::ok(RedirectResponse::from_rule_multiple(rules)))
}

/// Get a single redirect
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/redirects/1
/// ```
pub async fn single<S: Storage>(
    _admin: Admin,
    Extension(resolver): Extension<RedirectResolver<S>>,
    PathParameters(id): PathParameters<i64>,
) -> Result<Success<RedirectResponse>, Error> {
    fetch_rule(&resolver, id)
        .await
        .map(|rule| Success::ok(RedirectResponse::from_rule(rule)))
}

/// Create redirect form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedirectForm {
    /// Old URL or path, normalized before it is stored
    url_old: String,

    /// New URL or path, leave out for a placeholder
    #[serde(default)]
    url_new: String,
}

/// Create a redirect based on the [`CreateRedirectForm`](CreateRedirectForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "urlOld": "/listing.php", "urlNew": "/properties" }' \
///     http://localhost:6000/api/redirects
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": 1, "urlOld": "/listing.php", "urlNew": "/properties" ... } }
/// ```
pub async fn create<S: Storage>(
    _admin: Admin,
    Extension(resolver): Extension<RedirectResolver<S>>,
    Form(form): Form<CreateRedirectForm>,
) -> Result<Success<RedirectResponse>, Error> {
    let rule = resolver.create(&form.url_old, &form.url_new).await?;

    Ok(Success::created(RedirectResponse::from_rule(rule)))
}

/// Update redirect form
///
/// Fields that are left out keep their current value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRedirectForm {
    /// New old URL
    url_old: Option<String>,

    /// New new URL, an empty string turns the redirect into a placeholder
    url_new: Option<String>,
}

/// Update a redirect based on the [`UpdateRedirectForm`](UpdateRedirectForm) form
///
/// Request:
/// ```sh
/// curl -v -XPATCH -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "urlNew": "/properties/for-sale" }' \
///     http://localhost:6000/api/redirects/1
/// ```
pub async fn update<S: Storage>(
    _admin: Admin,
    Extension(resolver): Extension<RedirectResolver<S>>,
    PathParameters(id): PathParameters<i64>,
    Form(form): Form<UpdateRedirectForm>,
) -> Result<Success<RedirectResponse>, Error> {
    resolver
        .update(id, form.url_old.as_deref(), form.url_new.as_deref())
        .await?
        .map(|rule| Success::ok(RedirectResponse::from_rule(rule)))
        .ok_or_else(|| Error::not_found("Redirect not found"))
}

/// Delete a redirect
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/redirects/1
/// ```
pub async fn delete<S: Storage>(
    _admin: Admin,
    Extension(resolver): Extension<RedirectResolver<S>>,
    PathParameters(id): PathParameters<i64>,
) -> Result<Success<&'static str>, Error> {
    if resolver.delete(id).await? {
        Ok(Success::<&'static str>::no_content())
    } else {
        Err(Error::not_found("Redirect not found"))
    }
}

/// Resolve query
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// The path to resolve, as a visitor would request it
    path: String,
}

/// Resolve response going to the user
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// The normalized path
    pub path: String,

    /// Where the path redirects to, if anywhere
    pub target: Option<String>,
}

/// Show where a path would redirect to, without redirecting
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:6000/api/redirects/resolve?path=/Listing.php%3Fid=3'
/// ```
///
/// Response:
/// ```json
/// { "data": { "path": "/listing.php", "target": "/properties" } }
/// ```
pub async fn resolve<S: Storage>(
    _admin: Admin,
    Extension(resolver): Extension<RedirectResolver<S>>,
    QueryParameters(query): QueryParameters<ResolveQuery>,
) -> Result<Success<ResolveResponse>, Error> {
    let target = resolver.resolve(&query.path).await?;

    Ok(Success::ok(ResolveResponse {
        path: normalize(&query.path),
        target,
    }))
}

/// Fetch rule from the resolver
async fn fetch_rule<S: Storage>(
    resolver: &RedirectResolver<S>,
    id: i64,
) -> Result<RedirectRule, Error> {
    resolver
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Redirect not found"))
}
