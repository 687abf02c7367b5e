//! All API endpoint setup

use axum::Router;
use axum::routing::get;

pub use admin_token::Admin;
pub use admin_token::AdminToken;
pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use response::Error;
pub use response::Success;

use crate::storage::Storage;

mod admin_token;
mod redirects;
mod request;
mod response;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let redirects = Router::new()
        .route(
            "/",
            get(redirects::list::<S>).post(redirects::create::<S>),
        )
        .route("/resolve", get(redirects::resolve::<S>))
        .route(
            "/{redirect}",
            get(redirects::single::<S>)
                .patch(redirects::update::<S>)
                .delete(redirects::delete::<S>),
        );

    Router::new().nest("/redirects", redirects)
}
