//! Throwaway upstream servers for exercising the HTTP providers.

use axum::Router;
use std::net::SocketAddr;

/// Serve `app` on an ephemeral local port and return its address.
pub async fn spawn_upstream(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
