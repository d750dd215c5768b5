use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use wp_api_types::{BridgeCommand, SignalPayload};

/// Asynchronous command/completion channel to the wallet backend.
///
/// The contract is at most one completion per issued command. A transport
/// `Err` means the channel itself broke; errors reported by the backend ride
/// inside the payload's `error` field instead.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    async fn issue(&self, command: BridgeCommand) -> Result<SignalPayload>;
}

/// In-memory bridge answering from per-signal queues of canned payloads.
///
/// When a queue is empty the built-in responses take over: environment and
/// URL probes report loaded, `mnsync` reports synced, `getbalance` returns a
/// fixed numeric balance, the list queries return empty lists. A driver run
/// against an unscripted `ScriptedBridge` therefore completes cleanly, which
/// keeps tests focused on the one payload they want to distort.
#[derive(Default)]
pub struct ScriptedBridge {
    queues: Mutex<HashMap<String, VecDeque<SignalPayload>>>,
    issued: Mutex<Vec<BridgeCommand>>,
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload for the next command issued under `signal`.
    pub async fn enqueue(&self, signal: impl Into<String>, payload: SignalPayload) {
        let mut queues = self.queues.lock().await;
        queues.entry(signal.into()).or_default().push_back(payload);
    }

    /// Every command issued so far, in order.
    pub async fn issued(&self) -> Vec<BridgeCommand> {
        self.issued.lock().await.clone()
    }

    /// Number of issued commands whose completion signal is `signal`.
    pub async fn issued_under(&self, signal: &str) -> usize {
        self.issued
            .lock()
            .await
            .iter()
            .filter(|command| command.signal() == signal)
            .count()
    }

    fn builtin_response(command: &BridgeCommand) -> SignalPayload {
        match command {
            BridgeCommand::Environment { .. } | BridgeCommand::WebUrl { .. } => {
                SignalPayload::ready()
            }
            BridgeCommand::Universal { category, .. } => match category.as_str() {
                "mnsync" => SignalPayload::synced(true),
                "getbalance" => SignalPayload::with_result(json!(20)),
                "listdapps" => SignalPayload::with_result(json!([])),
                _ => SignalPayload::default(),
            },
            BridgeCommand::Service { category, .. } if category == "transactions" => {
                SignalPayload::with_transactions(json!([]))
            }
            _ => SignalPayload::default(),
        }
    }
}

#[async_trait]
impl WalletBridge for ScriptedBridge {
    async fn issue(&self, command: BridgeCommand) -> Result<SignalPayload> {
        let scripted = {
            let mut queues = self.queues.lock().await;
            queues
                .get_mut(command.signal())
                .and_then(VecDeque::pop_front)
        };

        let payload = scripted.unwrap_or_else(|| Self::builtin_response(&command));
        self.issued.lock().await.push(command);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_payloads_replay_in_order() -> Result<()> {
        let bridge = ScriptedBridge::new();
        bridge
            .enqueue("environment", SignalPayload::not_ready())
            .await;
        bridge.enqueue("environment", SignalPayload::ready()).await;

        let first = bridge
            .issue(BridgeCommand::environment("environment"))
            .await?;
        let second = bridge
            .issue(BridgeCommand::environment("environment"))
            .await?;

        assert!(!first.is_ready());
        assert!(second.is_ready());
        assert_eq!(bridge.issued_under("environment").await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn builtin_responses_cover_the_rpc_surface() -> Result<()> {
        let bridge = ScriptedBridge::new();

        let sync = bridge
            .issue(BridgeCommand::universal("mnsync", "mnsync", vec![json!("status")]))
            .await?;
        assert_eq!(sync.sync_flag(), Some(true));

        let balance = bridge
            .issue(BridgeCommand::universal("getbalance", "getbalance", vec![]))
            .await?;
        assert_eq!(balance.numeric_result(), Some(20.0));

        let txs = bridge
            .issue(BridgeCommand::service(
                "transactions",
                "transactions",
                json!({ "limit": 20 }),
            ))
            .await?;
        assert_eq!(txs.transaction_list().map(Vec::len), Some(0));

        let dapps = bridge
            .issue(BridgeCommand::universal("listdapps", "listdappsfirst", vec![json!(1)]))
            .await?;
        assert_eq!(dapps.result_array().map(Vec::len), Some(0));

        let seed = bridge
            .issue(BridgeCommand::universal("sethdseed", "sethdseed", vec![]))
            .await?;
        assert_eq!(seed, SignalPayload::default());
        Ok(())
    }

    #[tokio::test]
    async fn issued_log_preserves_command_order() -> Result<()> {
        let bridge = ScriptedBridge::new();
        bridge
            .issue(BridgeCommand::environment("environment"))
            .await?;
        bridge
            .issue(BridgeCommand::universal("sethdseed", "sethdseed", vec![]))
            .await?;

        let issued = bridge.issued().await;
        assert_eq!(issued.len(), 2);
        assert_eq!(issued[0].signal(), "environment");
        assert_eq!(issued[1].signal(), "sethdseed");
        Ok(())
    }
}
