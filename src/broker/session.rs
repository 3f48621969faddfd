//! Venue session: token login and order entry over REST
//!
//! Login exchanges credentials for a token carried on every later call
//! (and on the WebSocket handshake). Called at startup and per dispatched
//! leg - never inside the tick-processing fast path.

use super::{Credentials, ExecutionClient, ExecutionError, OrderRequest, OrderStatus};
use crate::infrastructure::config::VenueConfig;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Session / order-entry failures
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Http(u16),
    #[error("login rejected: no token in response")]
    LoginRejected,
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

/// Authenticated venue session
#[derive(Debug, Clone)]
pub struct Session {
    http: reqwest::Client,
    rest_url: Url,
    ws_url: Url,
    token: String,
    account: String,
    proprietary: String,
}

#[derive(Debug, Deserialize)]
struct OrderAck {
    order: OrderAckBody,
}

#[derive(Debug, Deserialize)]
struct OrderAckBody {
    #[serde(rename = "clientId")]
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct OrderStatusResponse {
    order: OrderStatus,
}

impl Session {
    /// Log in and build an authenticated session
    pub async fn login(venue: &VenueConfig, credentials: &Credentials) -> Result<Self, SessionError> {
        let rest_url =
            Url::parse(&venue.rest_url).map_err(|e| SessionError::Endpoint(e.to_string()))?;
        let ws_url =
            Url::parse(&venue.ws_url).map_err(|e| SessionError::Endpoint(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("clearing-arb/0.1")
            .build()
            .map_err(|e| SessionError::Network(e.to_string()))?;

        let login_url = rest_url
            .join("auth/getToken")
            .map_err(|e| SessionError::Endpoint(e.to_string()))?;

        tracing::info!("Logging in to {}", login_url);

        let response = http
            .post(login_url)
            .header("X-Username", &credentials.user)
            .header("X-Password", &credentials.password)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Http(response.status().as_u16()));
        }

        let token = response
            .headers()
            .get("X-Auth-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(SessionError::LoginRejected)?;

        tracing::info!("Session established for account {}", credentials.account);

        Ok(Self {
            http,
            rest_url,
            ws_url,
            token,
            account: credentials.account.clone(),
            proprietary: venue.proprietary.clone(),
        })
    }

    /// Auth token for the WebSocket handshake
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Trading account id
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Originating-user tag the venue stamps on our order reports
    pub fn proprietary(&self) -> &str {
        &self.proprietary
    }

    /// Market-data / order-report push endpoint
    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SessionError> {
        let url = self
            .rest_url
            .join(path)
            .map_err(|e| SessionError::Endpoint(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .header("X-Auth-Token", &self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Http(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| SessionError::Parse(e.to_string()))
    }
}

impl From<SessionError> for ExecutionError {
    fn from(e: SessionError) -> Self {
        ExecutionError::Transport(e.to_string())
    }
}

/// Order entry over the session's REST endpoints
#[derive(Debug, Clone)]
pub struct RestExecutionClient {
    session: Session,
}

impl RestExecutionClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    async fn send_order(&self, order: &OrderRequest) -> Result<String, ExecutionError> {
        let ack: OrderAck = self
            .session
            .get_json(
                "rest/order/newSingleOrder",
                &[
                    ("marketId", "ROFX".to_string()),
                    ("symbol", order.instrument.clone()),
                    ("side", order.side.as_str().to_string()),
                    ("orderQty", order.size.to_string()),
                    ("price", order.price.to_string()),
                    ("ordType", "limit".to_string()),
                    ("account", self.session.account.clone()),
                ],
            )
            .await?;
        Ok(ack.order.client_id)
    }
}

impl ExecutionClient for RestExecutionClient {
    async fn submit(&self, order: &OrderRequest) -> Result<String, ExecutionError> {
        self.send_order(order).await
    }

    async fn status(&self, client_order_id: &str) -> Result<OrderStatus, ExecutionError> {
        let response: OrderStatusResponse = self
            .session
            .get_json(
                "rest/order/id",
                &[
                    ("clOrdId", client_order_id.to_string()),
                    ("proprietary", self.session.proprietary.clone()),
                ],
            )
            .await?;
        Ok(response.order)
    }

    async fn cancel(&self, client_order_id: &str) -> Result<(), ExecutionError> {
        let _: serde_json::Value = self
            .session
            .get_json(
                "rest/order/cancelById",
                &[
                    ("clOrdId", client_order_id.to_string()),
                    ("proprietary", self.session.proprietary.clone()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn submit_streaming(&self, order: &OrderRequest) -> Result<(), ExecutionError> {
        // Push-style entry rides the same session; the ack is ignored here
        // and the fill outcome arrives via the order-report subscription.
        let client_id = self.send_order(order).await?;
        tracing::debug!(%client_id, "streaming order accepted");
        Ok(())
    }
}
