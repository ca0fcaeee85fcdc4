//! Minimal in-process WebSocket server standing in for the backend.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;

pub type ServerSocket = WebSocketStream<TcpStream>;

pub struct TestServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TestServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        Self { listener, addr }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Accepts the next client connection and completes the handshake.
    pub async fn accept(&self) -> ServerSocket {
        let (stream, _) = self.listener.accept().await.expect("accept connection");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("websocket handshake")
    }
}
