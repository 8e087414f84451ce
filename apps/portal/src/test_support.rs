//! Helpers shared by tests that need a real HTTP peer.

use axum::Router;
use tokio::net::TcpListener;

/// Serves `router` on an ephemeral localhost port and returns its base URL
/// (no trailing slash).
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
