//! WebSocket connection to the venue's push feed
//!
//! One socket carries both market data and order reports. The token from
//! the REST login authenticates the handshake.

use super::{parse_push, FeedError, PushMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use futures_util::{SinkExt, StreamExt};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Push-feed WebSocket client
pub struct FeedConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    state: ConnectionState,
    last_activity: Instant,
}

impl FeedConnection {
    /// Connect and authenticate with the session token
    pub async fn connect(url: &Url, token: &str) -> Result<Self, FeedError> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
        request.headers_mut().insert(
            "X-Auth-Token",
            token
                .parse()
                .map_err(|_| FeedError::ConnectionFailed("invalid token header".to_string()))?,
        );

        let connect_future = connect_async(request);
        let (stream, _) = timeout(Duration::from_secs(10), connect_future)
            .await
            .map_err(|_| FeedError::Timeout)?
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        // Send frames immediately, the feed is latency-sensitive.
        if let MaybeTlsStream::Plain(tcp) = stream.get_ref() {
            tcp.set_nodelay(true)
                .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
        }

        Ok(Self {
            stream,
            state: ConnectionState::Connected,
            last_activity: Instant::now(),
        })
    }

    /// Send a text frame
    pub async fn send_text(&mut self, text: &str) -> Result<(), FeedError> {
        if self.state != ConnectionState::Connected {
            return Err(FeedError::NotConnected);
        }
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| FeedError::SendFailed(e.to_string()))?;
        self.last_activity = Instant::now();
        Ok(())
    }

    /// Next text frame; None on graceful close. Control frames are handled
    /// inline and skipped.
    pub async fn recv_text(&mut self) -> Result<Option<String>, FeedError> {
        if self.state != ConnectionState::Connected {
            return Err(FeedError::NotConnected);
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.last_activity = Instant::now();
                    return Ok(Some(text.to_string()));
                }
                Some(Ok(Message::Close(_))) => {
                    self.state = ConnectionState::Disconnected;
                    return Ok(None);
                }
                Some(Ok(_)) => {
                    // Ping/pong/binary: nothing for the engine.
                    self.last_activity = Instant::now();
                }
                Some(Err(e)) => return Err(FeedError::ReceiveFailed(e.to_string())),
                None => {
                    self.state = ConnectionState::Disconnected;
                    return Ok(None);
                }
            }
        }
    }

    #[inline(always)]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    #[inline(always)]
    pub fn idle_duration(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Close the connection gracefully
    pub async fn close(&mut self) -> Result<(), FeedError> {
        if self.state == ConnectionState::Connected {
            let _ = self.stream.close(None).await;
            self.state = ConnectionState::Disconnected;
        }
        Ok(())
    }
}

/// Market-data subscription request for a set of full instrument ids
pub fn market_data_subscription(instruments: &[String], depth: u32) -> String {
    let products: Vec<serde_json::Value> = instruments
        .iter()
        .map(|symbol| serde_json::json!({"symbol": symbol, "marketId": "ROFX"}))
        .collect();
    serde_json::json!({
        "type": "smd",
        "level": 1,
        "entries": ["BI", "OF"],
        "depth": depth,
        "products": products,
    })
    .to_string()
}

/// Order-report subscription for our account
pub fn order_report_subscription(account: &str) -> String {
    serde_json::json!({
        "type": "os",
        "account": {"id": account},
        "snapshotOnlyActive": true,
    })
    .to_string()
}

/// Connect, subscribe and pump parsed push messages into the engine
/// channel until the socket or the engine goes away.
pub async fn run_feed(
    url: Url,
    token: String,
    instruments: Vec<String>,
    account: String,
    tx: mpsc::Sender<PushMessage>,
) -> Result<(), FeedError> {
    let mut connection = FeedConnection::connect(&url, &token).await?;
    tracing::info!(target: "feed", %url, "feed connected");

    connection
        .send_text(&market_data_subscription(&instruments, 1))
        .await?;
    connection
        .send_text(&order_report_subscription(&account))
        .await?;
    tracing::info!(
        target: "feed",
        instruments = instruments.len(),
        "subscriptions sent"
    );

    loop {
        match connection.recv_text().await {
            Ok(Some(text)) => match parse_push(&text) {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        // Engine gone; nothing left to feed.
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(target: "feed", "skipping frame: {}", e);
                }
            },
            Ok(None) => {
                tracing::warn!(target: "feed", "feed closed by venue");
                break;
            }
            Err(e) => {
                tracing::error!(target: "feed", "feed error: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_data_subscription_shape() {
        let msg = market_data_subscription(
            &["MERV - XMEV - ALUA - CI".to_string(), "MERV - XMEV - ALUA - 48hs".to_string()],
            1,
        );
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "smd");
        assert_eq!(value["entries"], serde_json::json!(["BI", "OF"]));
        assert_eq!(value["products"].as_array().unwrap().len(), 2);
        assert_eq!(value["products"][0]["symbol"], "MERV - XMEV - ALUA - CI");
    }

    #[test]
    fn test_order_report_subscription_shape() {
        let msg = order_report_subscription("REM123");
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "os");
        assert_eq!(value["account"]["id"], "REM123");
    }

    #[test]
    fn test_connection_state() {
        assert_ne!(ConnectionState::Connected, ConnectionState::Disconnected);
    }
}
