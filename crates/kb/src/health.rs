//! Liveness endpoint for the hosting platform's health probes.

use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

pub fn router() -> Router {
    Router::new()
        .route("/", get(healthz))
        .route("/healthz", get(healthz))
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "health endpoint listening");
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_ok_on_both_paths() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_on(listener));

        for path in ["/", "/healthz"] {
            let resp = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::OK);
            assert_eq!(resp.text().await.unwrap(), "ok");
        }

        let resp = reqwest::get(format!("http://{addr}/missing")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
