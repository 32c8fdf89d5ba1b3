use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on a random local port for the lifetime of the test runtime.
pub(crate) async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
