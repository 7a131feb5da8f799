// WebSocket client utilities for testing

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket test client speaking the JSON lobby protocol.
pub struct WebSocketClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketClient {
    /// Connect, retrying until the server accepts or `timeout` elapses.
    pub async fn connect_retry(
        url: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let start = tokio::time::Instant::now();
        loop {
            match connect_async(url).await {
                Ok((stream, _)) => return Ok(Self { stream }),
                Err(err) => {
                    if start.elapsed() >= timeout {
                        return Err(Box::new(err));
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.stream.send(Message::text(text.to_string())).await?;
        Ok(())
    }

    pub async fn send_json(&mut self, value: &Value) -> Result<(), Box<dyn std::error::Error>> {
        self.send_text(&value.to_string()).await
    }

    pub async fn hello(
        &mut self,
        player_id: &str,
        display_name: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.send_json(&json!({
            "type": "hello",
            "protocol": 1,
            "player_id": player_id,
            "display_name": display_name,
        }))
        .await
    }

    /// Next text frame as JSON. `None` once the server closed the socket.
    /// Control frames are skipped.
    pub async fn recv_json(&mut self) -> Result<Option<Value>, Box<dyn std::error::Error>> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| "Timeout waiting for message")?;
            match next.transpose()? {
                Some(Message::Text(text)) => return Ok(Some(serde_json::from_str(text.as_str())?)),
                Some(Message::Close(_)) | None => return Ok(None),
                Some(_) => continue,
            }
        }
    }

    /// Skip frames until one of type `ty` arrives.
    pub async fn recv_until(&mut self, ty: &str) -> Result<Value, Box<dyn std::error::Error>> {
        loop {
            match self.recv_json().await? {
                Some(msg) if msg["type"] == ty => return Ok(msg),
                Some(_) => continue,
                None => return Err(format!("socket closed before a {ty} frame").into()),
            }
        }
    }

    pub async fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.stream.close(None).await?;
        Ok(())
    }
}
