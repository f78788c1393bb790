//! WebSocket connection wrapper for driving `/ws` end-to-end.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub struct WsConnection {
    sender: futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    receiver: futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
}

impl WsConnection {
    /// Connect to `/ws`, optionally presenting a bearer token (an
    /// absent token degrades to a guest connection per `WsAuth`).
    pub async fn connect(base_url: &str, token: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let ws_url = base_url.replace("http://", "ws://");
        let url = format!("{}/ws", ws_url);

        let mut builder = tokio_tungstenite::tungstenite::http::Request::builder()
            .uri(&url)
            .header(
                "Sec-WebSocket-Key",
                tokio_tungstenite::tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header(
                "Host",
                url.split("//")
                    .nth(1)
                    .and_then(|s| s.split('/').next())
                    .unwrap_or("localhost"),
            );

        if let Some(tok) = token {
            builder = builder.header("Authorization", format!("Bearer {}", tok));
        }

        let request = builder
            .body(())
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

        let (ws_stream, _) = connect_async(request).await?;
        let (sender, receiver) = ws_stream.split();

        Ok(Self { sender, receiver })
    }

    pub async fn send_json(&mut self, msg: &Value) -> Result<(), Box<dyn std::error::Error>> {
        self.sender.send(Message::Text(msg.to_string().into())).await?;
        Ok(())
    }

    pub async fn recv_json(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(Box::new(err)),
                None => return Err("connection closed with no message".into()),
            }
        }
    }

    pub async fn recv_json_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        tokio::time::timeout(timeout, self.recv_json())
            .await
            .map_err(|_| Box::<dyn std::error::Error>::from("timeout waiting for message"))?
    }

    /// Keep pulling frames (skipping pings/pongs) until one matches
    /// `type`, or the timeout elapses. Scenarios that race against
    /// broadcast fan-out need this rather than an exact-next-frame read.
    pub async fn recv_json_of_type(
        &mut self,
        event_type: &str,
        timeout: std::time::Duration,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(format!("timed out waiting for `{event_type}`").into());
            }
            let value = self.recv_json_timeout(remaining).await?;
            if value.get("type").and_then(|t| t.as_str()) == Some(event_type) {
                return Ok(value);
            }
        }
    }

    pub async fn close(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.sender.close().await?;
        Ok(())
    }
}
