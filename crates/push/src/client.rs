//! WebSocket client for the backend push endpoint.
//!
//! [`PushClient`] holds the connection configuration. Call
//! [`PushClient::connect`] to establish a live [`PushConnection`].

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Configuration handle for the push endpoint.
pub struct PushClient {
    ws_url: String,
}

/// A live WebSocket connection to the backend.
pub struct PushConnection {
    /// Unique client ID sent during the WebSocket handshake.
    pub client_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl PushClient {
    /// Create a client targeting a push endpoint base URL, e.g.
    /// `ws://localhost:8080`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to the push WebSocket endpoint.
    ///
    /// Generates a unique `client_id` (UUID v4) and appends it as a
    /// query parameter so the backend can distinguish concurrent UIs.
    pub async fn connect(&self) -> Result<PushConnection, PushClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/ws?clientId={}", self.ws_url, client_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            PushClientError::Connection(format!(
                "Failed to connect to push endpoint at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            client_id = %client_id,
            "Connected to push endpoint at {}",
            self.ws_url,
        );

        Ok(PushConnection {
            client_id,
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum PushClientError {
    /// Failed to establish the initial WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
