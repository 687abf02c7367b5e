use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_admin_token() {
    let mut app = helper::setup_test_app().await;

    let (status_code, redirects, error) = helper::list_redirects(&mut app, None).await;
    assert_eq!(StatusCode::UNAUTHORIZED, status_code);
    assert!(redirects.is_none());
    assert_eq!(Some("Missing API token".to_string()), error);

    let (status_code, _, error) =
        helper::list_redirects(&mut app, Some("Bearer notsosecret")).await;
    assert_eq!(StatusCode::UNAUTHORIZED, status_code);
    assert_eq!(Some("Invalid API token".to_string()), error);

    let (status_code, _, _) =
        helper::maybe_create_redirect(&mut app, "Bearer notsosecret", "/old", Some("/new")).await;
    assert_eq!(StatusCode::UNAUTHORIZED, status_code);

    let (status_code, redirects, _) =
        helper::list_redirects(&mut app, Some(helper::ADMIN_TOKEN)).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(Some(Vec::new()), redirects);
}
