use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use wp_api_types::{BridgeCommand, SignalPayload};
use wp_bridge::WalletBridge;

/// HTTP adapter mapping bridge commands onto a wallet daemon's REST surface.
///
/// Reads `WALLET_NODE_URL` from environment at construction time
/// (default: `http://localhost:8332`).
pub struct HttpBridge {
    endpoint: String,
    http: reqwest::Client,
}

impl Default for HttpBridge {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpBridge {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("WALLET_NODE_URL").ok())
            .unwrap_or_else(|| "http://localhost:8332".to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, PartialEq)]
struct PlannedRequest {
    url: String,
    body: Option<Value>,
}

fn plan_request(endpoint: &str, command: &BridgeCommand) -> PlannedRequest {
    match command {
        BridgeCommand::Environment { signal } => PlannedRequest {
            url: format!("{endpoint}/environment/{signal}"),
            body: None,
        },
        BridgeCommand::Universal { category, args, .. } => PlannedRequest {
            url: format!("{endpoint}/rpc/{category}"),
            body: Some(Value::Array(args.clone())),
        },
        BridgeCommand::Service {
            category, params, ..
        } => PlannedRequest {
            url: format!("{endpoint}/service/{category}"),
            body: Some(params.clone()),
        },
        BridgeCommand::WebSimple { resource, .. } => PlannedRequest {
            url: format!("{endpoint}/{resource}"),
            body: None,
        },
        BridgeCommand::WebUrl { url, .. } => PlannedRequest {
            url: url.clone(),
            body: None,
        },
    }
}

fn is_web_fetch(command: &BridgeCommand) -> bool {
    matches!(
        command,
        BridgeCommand::WebSimple { .. } | BridgeCommand::WebUrl { .. }
    )
}

#[async_trait]
impl WalletBridge for HttpBridge {
    async fn issue(&self, command: BridgeCommand) -> Result<SignalPayload> {
        let planned = plan_request(&self.endpoint, &command);
        let request = match planned.body {
            Some(body) => self.http.post(&planned.url).json(&body),
            None => self.http.get(&planned.url),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                // The daemon goes down mid-sequence (stop/restart steps), so
                // readiness probes must survive a dead endpoint and keep
                // polling. Everything else is a broken transport.
                if matches!(command, BridgeCommand::Environment { .. }) {
                    warn!("environment probe {} unreachable: {err}", command.signal());
                    return Ok(SignalPayload::not_ready());
                }
                return Err(err).context("wallet bridge transport");
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // A structured error body still gets through; the readiness gates
            // halt on reported errors even while polling.
            if let Ok(payload) = serde_json::from_str::<SignalPayload>(&text) {
                if payload.error.is_some() {
                    return Ok(payload);
                }
            }
            if matches!(command, BridgeCommand::Environment { .. }) {
                return Ok(SignalPayload::not_ready());
            }
            return Ok(SignalPayload::from_error(
                status.as_u16(),
                Some(text),
            ));
        }

        // Fetched resources may be binary; presence of the completion is the
        // only semantics those commands carry.
        if is_web_fetch(&command) || text.trim().is_empty() {
            return Ok(SignalPayload::default());
        }

        serde_json::from_str(&text).context("wallet bridge payload parse")
    }
}
