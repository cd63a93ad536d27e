use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

const SECRET: &str = "s3cret";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<String> {
    let body = serde_urlencoded::to_string(fields).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .unwrap()
}

fn authed<'a>(extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    let mut fields = vec![("secret", SECRET), ("dbName", "users")];
    fields.extend_from_slice(extra);
    fields
}

// --- envelope ---

#[tokio::test]
async fn wrong_secret_yields_err_envelope() {
    let resp = app(SECRET)
        .oneshot(form_request("/save", &[("secret", "nope"), ("dbName", "users")]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"err": "wrong secret"}));
}

#[tokio::test]
async fn invalid_json_field_yields_err_envelope() {
    let resp = app(SECRET)
        .oneshot(form_request("/find", &authed(&[("query", "{oops")])))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert!(body["err"].as_str().unwrap().starts_with("invalid query"));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn missing_credentials_is_a_client_error() {
    let resp = app(SECRET)
        .oneshot(form_request("/save", &[("dbName", "users")]))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

// --- empty database ---

#[tokio::test]
async fn queries_on_unknown_database_are_empty() {
    let resp = app(SECRET)
        .oneshot(form_request("/find", &authed(&[("query", "{}"), ("projection", "{}")])))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"data": []}));

    let resp = app(SECRET)
        .oneshot(form_request("/find-one", &authed(&[("query", "{}")])))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"data": null}));

    let resp = app(SECRET)
        .oneshot(form_request("/count", &authed(&[("query", "{}")])))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"data": 0}));
}

#[tokio::test]
async fn insert_requires_doc() {
    let resp = app(SECRET)
        .oneshot(form_request("/insert", &authed(&[])))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"err": "missing doc"}));
}

// --- full lifecycle ---

#[tokio::test]
async fn document_lifecycle() {
    let mut app = app(SECRET).into_service();

    async fn send(
        app: &mut axum::routing::RouterIntoService<String>,
        uri: &str,
        fields: &[(&str, &str)],
    ) -> Value {
        let resp = ServiceExt::ready(app)
            .await
            .unwrap()
            .call(form_request(uri, &authed(fields)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await
    }

    // insert
    let body = send(&mut app, "/insert", &[("doc", r#"{"name":"a","n":1}"#)]).await;
    let id = body["data"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    send(&mut app, "/insert", &[("doc", r#"{"name":"b","n":2}"#)]).await;

    // find with projection
    let body = send(
        &mut app,
        "/find",
        &[("query", r#"{"name":"a"}"#), ("projection", r#"{"n":1}"#)],
    )
    .await;
    assert_eq!(body["data"], json!([{"_id": id, "n": 1}]));

    // find-one
    let body = send(&mut app, "/find-one", &[("query", r#"{"n":{"$gt":1}}"#), ("projection", "{}")]).await;
    assert_eq!(body["data"]["name"], "b");

    // update all
    let body = send(
        &mut app,
        "/update",
        &[
            ("query", "{}"),
            ("update", r#"{"$inc":{"n":10}}"#),
            ("options", r#"{"multi":true}"#),
        ],
    )
    .await;
    assert_eq!(body, json!({"data": 2}));

    let body = send(&mut app, "/count", &[("query", r#"{"n":{"$gte":11}}"#)]).await;
    assert_eq!(body, json!({"data": 2}));

    // remove one
    let body = send(&mut app, "/remove", &[("query", r#"{"name":"a"}"#), ("options", "{}")]).await;
    assert_eq!(body, json!({"data": 1}));

    let body = send(&mut app, "/count", &[("query", "{}")]).await;
    assert_eq!(body, json!({"data": 1}));

    // save
    let body = send(&mut app, "/save", &[]).await;
    assert_eq!(body, json!({"data": true}));
}
