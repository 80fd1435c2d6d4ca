//! Loopback stand-ins for the issuer and the files service.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use caller_service::{Caller, TokenCache, TokenClient};
use secrecy::Secret;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Default)]
pub struct IssuerStub {
    pub mints: AtomicUsize,
    /// When set, every request is refused with invalid_grant.
    pub reject: bool,
    pub expires_in: i64,
}

async fn stub_token(State(stub): State<Arc<IssuerStub>>, headers: HeaderMap) -> Response {
    if stub.reject || !headers.contains_key(header::AUTHORIZATION) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }
    let n = stub.mints.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("token-{}", n),
        "token_type": "Bearer",
        "expires_in": stub.expires_in,
    }))
    .into_response()
}

pub async fn spawn_issuer(reject: bool) -> (String, Arc<IssuerStub>) {
    spawn_issuer_with(IssuerStub {
        mints: AtomicUsize::new(0),
        reject,
        expires_in: 3600,
    })
    .await
}

pub async fn spawn_issuer_with(stub: IssuerStub) -> (String, Arc<IssuerStub>) {
    let stub = Arc::new(stub);
    let router = Router::new()
        .route("/oauth2/token", post(stub_token))
        .with_state(stub.clone());
    (serve(router).await, stub)
}

/// Files endpoint that answers 401 to the first `reject_first` calls.
pub struct FilesStub {
    pub calls: AtomicUsize,
    pub reject_first: usize,
    pub status_after: StatusCode,
    pub delay: Duration,
}

async fn stub_files(State(stub): State<Arc<FilesStub>>, headers: HeaderMap) -> Response {
    let n = stub.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(stub.delay).await;
    if n < stub.reject_first || !headers.contains_key(header::AUTHORIZATION) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response();
    }
    if stub.status_after != StatusCode::OK {
        return stub.status_after.into_response();
    }
    Json(json!({
        "file1": { "name": "James Bond" },
        "file2": { "name": "Harry Potter" }
    }))
    .into_response()
}

pub async fn spawn_files(reject_first: usize) -> (String, Arc<FilesStub>) {
    spawn_files_with(FilesStub {
        calls: AtomicUsize::new(0),
        reject_first,
        status_after: StatusCode::OK,
        delay: Duration::ZERO,
    })
    .await
}

pub async fn spawn_files_with(stub: FilesStub) -> (String, Arc<FilesStub>) {
    let stub = Arc::new(stub);
    let router = Router::new()
        .route("/files", get(stub_files))
        .with_state(stub.clone());
    (serve(router).await, stub)
}

/// Raw socket server that sends a 200 header promising a body, writes one
/// byte of it and then goes silent without closing the connection.
pub async fn spawn_stalled_body() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{",
                    )
                    .await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(socket);
            });
        }
    });
    format!("http://{}", addr)
}

pub fn caller(issuer_url: &str, files_url: &str, request_timeout: Duration) -> Caller {
    let http = reqwest::Client::new();
    let source = TokenClient::new(
        http.clone(),
        issuer_url,
        "svc-a",
        Secret::new("s3cr3t".to_string()),
        Duration::from_secs(5),
    );
    let cache = Arc::new(TokenCache::new(
        Arc::new(source),
        chrono::Duration::seconds(30),
    ));
    Caller::new(http, files_url, cache, request_timeout)
}
