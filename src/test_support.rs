//! Helpers shared by unit tests.

use tokio::net::TcpListener;

/// A server that accepts connections and never answers.
///
/// Returns its base URL; accepted sockets stay open until the runtime shuts down.
pub async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
