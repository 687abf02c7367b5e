use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use http_body_util::BodyExt;
use serde_json::Map;
use serde_json::Value;
use tower::Service;

use crate::Settings;
use crate::setup_app;
use crate::storage::Memory;

pub const ADMIN_TOKEN: &str = "Bearer verysecret";

/// Test helper version of a redirect rule
#[derive(Debug, PartialEq, Eq)]
pub struct Redirect {
    pub id: i64,
    pub url_old: String,
    pub url_new: String,
}

/// Error response
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
}

/// Default settings for the tests
pub fn test_settings() -> Settings {
    Settings {
        admin_token: "verysecret".to_string(),
        cache_ttl: Duration::ZERO,
        spa_index: None,
    }
}

/// Setup the app on an empty memory storage
pub async fn setup_test_app() -> Router {
    setup_test_app_with_settings(test_settings()).await
}

/// Setup the app on an empty memory storage, with custom settings
pub async fn setup_test_app_with_settings(settings: Settings) -> Router {
    setup_app(Memory::new(), settings).await.unwrap()
}

pub async fn root(app: &mut Router, path: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();

    let status_code = response.status();
    let headers = response.headers();

    let location = headers.get(LOCATION);
    let location = location.map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();

    (status_code, location, body)
}

/// Send a request to the API, returning the status code and the parsed body (if any)
async fn call_api(
    app: &mut Router,
    access_token: Option<&str>,
    method: Method,
    uri: &str,
    payload: Option<&Value>,
) -> (StatusCode, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(access_token) = access_token {
        builder = builder.header(AUTHORIZATION, access_token);
    }

    let body = if let Some(payload) = payload {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
        Body::from(serde_json::to_vec(payload).unwrap())
    } else {
        Body::empty()
    };

    let response = app.call(builder.body(body).unwrap()).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, body)
}

fn redirect_payload(url_old: Option<&str>, url_new: Option<&str>) -> Value {
    let mut payload = Map::new();

    if let Some(url_old) = url_old {
        payload.insert("urlOld".to_string(), Value::String(url_old.to_string()));
    }

    if let Some(url_new) = url_new {
        payload.insert("urlNew".to_string(), Value::String(url_new.to_string()));
    }

    Value::Object(payload)
}

pub async fn maybe_create_redirect(
    app: &mut Router,
    access_token: &str,
    url_old: &str,
    url_new: Option<&str>,
) -> (StatusCode, Option<Redirect>, Option<String>) {
    let payload = redirect_payload(Some(url_old), url_new);

    let (status_code, body) = call_api(
        app,
        Some(access_token),
        Method::POST,
        "/api/redirects",
        Some(&payload),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_redirect(&body))
        } else {
            None
        },
        if status_code == StatusCode::BAD_REQUEST {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

/// Create a redirect that is expected to be valid
pub async fn create_redirect(
    app: &mut Router,
    url_old: &str,
    url_new: &str,
) -> Redirect {
    let (status_code, redirect, error) =
        maybe_create_redirect(app, ADMIN_TOKEN, url_old, Some(url_new)).await;

    assert_eq!(StatusCode::CREATED, status_code, "error: {error:?}");

    redirect.unwrap()
}

pub async fn maybe_create_redirect_with_raw_body(
    app: &mut Router,
    body: &'static str,
    include_content_type: bool,
) -> (StatusCode, Option<Error>) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/redirects");

    if include_content_type {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }

    let request = builder
        .header(AUTHORIZATION, ADMIN_TOKEN)
        .body(Body::from(body.as_bytes()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::BAD_REQUEST {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_update_redirect(
    app: &mut Router,
    id: i64,
    url_old: Option<&str>,
    url_new: Option<&str>,
) -> (StatusCode, Option<Redirect>, Option<String>) {
    let payload = redirect_payload(url_old, url_new);

    let (status_code, body) = call_api(
        app,
        Some(ADMIN_TOKEN),
        Method::PATCH,
        &format!("/api/redirects/{id}"),
        Some(&payload),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirect(&body))
        } else {
            None
        },
        if status_code == StatusCode::BAD_REQUEST {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_delete_redirect(app: &mut Router, id: i64) -> StatusCode {
    let (status_code, _) = call_api(
        app,
        Some(ADMIN_TOKEN),
        Method::DELETE,
        &format!("/api/redirects/{id}"),
        None,
    )
    .await;

    status_code
}

pub async fn single_redirect(app: &mut Router, id: i64) -> (StatusCode, Option<Redirect>) {
    let (status_code, body) = call_api(
        app,
        Some(ADMIN_TOKEN),
        Method::GET,
        &format!("/api/redirects/{id}"),
        None,
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirect(&body))
        } else {
            None
        },
    )
}

/// Fetch a redirect by an arbitrary path parameter, returning the error message on failure
pub async fn single_redirect_by_raw_id(app: &mut Router, id: &str) -> (StatusCode, Option<String>) {
    let (status_code, body) = call_api(
        app,
        Some(ADMIN_TOKEN),
        Method::GET,
        &format!("/api/redirects/{id}"),
        None,
    )
    .await;

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn list_redirects(
    app: &mut Router,
    access_token: Option<&str>,
) -> (StatusCode, Option<Vec<Redirect>>, Option<String>) {
    let (status_code, body) =
        call_api(app, access_token, Method::GET, "/api/redirects", None).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirects(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn resolve_redirect(app: &mut Router, query: &str) -> (StatusCode, Value) {
    let (status_code, body) = call_api(
        app,
        Some(ADMIN_TOKEN),
        Method::GET,
        &format!("/api/redirects/resolve?{query}"),
        None,
    )
    .await;

    (status_code, serde_json::from_slice::<Value>(&body[..]).unwrap())
}

fn value_to_redirect(redirect: &Map<String, Value>) -> Redirect {
    Redirect {
        id: redirect["id"].as_i64().unwrap(),
        url_old: redirect["urlOld"]
            .as_str()
            .map(ToString::to_string)
            .unwrap(),
        url_new: redirect["urlNew"]
            .as_str()
            .map(ToString::to_string)
            .unwrap(),
    }
}

fn get_redirect(body: &Bytes) -> Redirect {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_redirect)
        .unwrap()
}

fn get_redirects(body: &Bytes) -> Vec<Redirect> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_redirect)
        .collect()
}

fn value_to_error(error: &Map<String, Value>) -> Error {
    Error {
        error: error["error"].as_str().map(ToString::to_string).unwrap(),
        description: error
            .get("description")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    }
}

fn get_error(body: &Bytes) -> Error {
    serde_json::from_slice::<Value>(&body[..])
        .unwrap()
        .as_object()
        .map(value_to_error)
        .unwrap()
}

fn get_error_message(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["error"]
        .as_str()
        .map(ToString::to_string)
        .unwrap()
}
