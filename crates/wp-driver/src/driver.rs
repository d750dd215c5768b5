use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use wp_api_types::{BackendError, BridgeCommand, SignalPayload};
use wp_bridge::WalletBridge;

use crate::config::ProbeConfig;
use crate::status::StatusLine;
use crate::timing::{DelaySource, stagger_delay};

/// Named stage of the verification sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Environment,
    SetSeed,
    SeedReadiness,
    SyncStatus,
    EncryptWallet,
    EncryptReadiness,
    NewAddress,
    StopWallet,
    StopReadiness,
    FirstBalance,
    RestartWallet,
    RestartReadiness,
    SecondBalance,
    Transactions,
    ImageFetch,
    UrlFetch,
    DappList,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::SetSeed => "sethdseed",
            Self::SeedReadiness => "sethdseed_environment",
            Self::SyncStatus => "mnsync",
            Self::EncryptWallet => "encryptwallet",
            Self::EncryptReadiness => "encryptwallet_environment",
            Self::NewAddress => "getnewaddress",
            Self::StopWallet => "stop",
            Self::StopReadiness => "stop_environment",
            Self::FirstBalance => "getbalance",
            Self::RestartWallet => "restartwallet",
            Self::RestartReadiness => "restartwallet_environment",
            Self::SecondBalance => "getbalance2",
            Self::Transactions => "transactions",
            Self::ImageFetch => "wallet_images",
            Self::UrlFetch => "web_url",
            Self::DappList => "listdappsfirst",
        }
    }
}

/// First failure detected by a step. Terminal for the run; nothing is retried
/// past this point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepFailure {
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("wallet is not ready")]
    WalletNotReady,
    #[error("mnsync failed")]
    SyncFlagMissing,
    #[error("failed to get balance")]
    BalanceNotNumeric,
    #[error("failed to get transactions")]
    TransactionsNotArray,
    #[error("failed to check first dapplist")]
    DappListNotArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The iteration counter exceeded the operator cap.
    Completed { iterations: u64 },
    /// A step reported a backend error or a malformed payload.
    Failed { step: Step, failure: StepFailure },
}

/// Drives the wallet backend through the fixed lifecycle sequence, one pass
/// per iteration, until the pass cap is exceeded or a step fails.
///
/// Advancement is purely sequential: every command's completion is awaited
/// before the next command goes out, so no synchronization beyond the bridge
/// contract is needed. The readiness gates poll without bound; a backend that
/// never comes up stalls the run with no watchdog.
pub struct VerifyDriver {
    bridge: Arc<dyn WalletBridge>,
    delay: Arc<dyn DelaySource>,
    config: ProbeConfig,
    status: StatusLine,
    iteration: u64,
}

impl VerifyDriver {
    pub fn new(
        bridge: Arc<dyn WalletBridge>,
        delay: Arc<dyn DelaySource>,
        config: ProbeConfig,
    ) -> Self {
        Self {
            bridge,
            delay,
            config,
            status: StatusLine::default(),
            iteration: 0,
        }
    }

    /// Last operator-facing status line.
    pub fn status_line(&self) -> &str {
        self.status.line()
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Runs the full verification sequence. Re-invoking restarts from
    /// iteration 0. A transport-level `Err` from the bridge aborts the run
    /// outside the verification semantics; everything the backend reports
    /// lands in the returned [`RunOutcome`].
    pub async fn run(&mut self) -> Result<RunOutcome> {
        self.iteration = 0;
        self.status = StatusLine::default();
        loop {
            if let Some(outcome) = self.run_pass().await? {
                return Ok(outcome);
            }
        }
    }

    fn fail(&mut self, step: Step, failure: StepFailure) -> Option<RunOutcome> {
        self.status
            .update(self.iteration, &format!("FAILED: {failure}"));
        Some(RunOutcome::Failed { step, failure })
    }

    /// Poll-until-ready gate shared by every step that depends on backend
    /// initialization. A reported backend error halts the run; not-ready
    /// re-issues the probe under the same signal name after the fixed poll
    /// delay, with no retry cap.
    async fn readiness_gate(
        &mut self,
        step: Step,
        probe: &'static str,
    ) -> Result<Option<RunOutcome>> {
        loop {
            let signal = self.bridge.issue(BridgeCommand::environment(probe)).await?;
            if let Some(err) = signal.backend_error() {
                return Ok(self.fail(step, err.into()));
            }
            self.status.probe_tick(self.iteration, probe);
            if signal.is_ready() {
                return Ok(None);
            }
            self.delay.sleep(self.config.poll_delay).await;
        }
    }

    async fn stagger(&mut self) {
        let timeout = stagger_delay(self.iteration, self.config.stagger_ceiling);
        if !timeout.is_zero() {
            self.status
                .update(self.iteration, &format!("timeout for {} ms", timeout.as_millis()));
        }
        self.delay.sleep(timeout).await;
    }

    /// The transaction-list query plus five deliberately odd payload shapes
    /// issued alongside it. Only the primary completion is inspected.
    async fn transaction_sweep(&self) -> Result<SignalPayload> {
        let (primary, skip1, skip2, skip3, skip4, skip5) = tokio::join!(
            self.bridge.issue(BridgeCommand::service(
                "transactions",
                "transactions",
                json!({ "limit": 20 }),
            )),
            self.bridge.issue(BridgeCommand::service(
                "transactions",
                "skip1",
                json!({ "limit": 20, "addresses": {} }),
            )),
            self.bridge.issue(BridgeCommand::service(
                "transactions",
                "skip2",
                json!({ "limit": 20, "addresses": { "address_to": {} } }),
            )),
            self.bridge.issue(BridgeCommand::service(
                "transactions",
                "skip3",
                json!({ "limit": 20, "addresses": { "address_to": [] } }),
            )),
            self.bridge.issue(BridgeCommand::service(
                "transactions",
                "skip4",
                json!({ "limit": 20, "category": null }),
            )),
            self.bridge.issue(BridgeCommand::service(
                "transactions",
                "skip5",
                json!({ "limit": 20, "text": null }),
            )),
        );
        let _ = (skip1, skip2, skip3, skip4, skip5);
        primary
    }

    /// One full pass over the sequence. `None` means loop again.
    async fn run_pass(&mut self) -> Result<Option<RunOutcome>> {
        // The opening environment check is strict: an unloaded wallet here is
        // an immediate failure, not a poll.
        let signal = self
            .bridge
            .issue(BridgeCommand::environment("environment"))
            .await?;
        if let Some(err) = signal.backend_error() {
            return Ok(self.fail(Step::Environment, err.into()));
        }
        if !signal.is_ready() {
            return Ok(self.fail(Step::Environment, StepFailure::WalletNotReady));
        }

        // Alternate the two seed fixtures by pass parity so reseeding is
        // exercised in both directions.
        let fixture_index = (self.iteration % 2) as usize;
        self.status
            .update(self.iteration, &format!("sethdseed{}", fixture_index + 1));
        let fixture = self.config.seed_fixtures[fixture_index].clone();
        self.bridge
            .issue(BridgeCommand::universal(
                "sethdseed",
                "sethdseed",
                vec![json!(fixture)],
            ))
            .await?;

        if let Some(outcome) = self
            .readiness_gate(Step::SeedReadiness, "sethdseed_environment")
            .await?
        {
            return Ok(Some(outcome));
        }

        let signal = self
            .bridge
            .issue(BridgeCommand::universal(
                "mnsync",
                "mnsync",
                vec![json!("status")],
            ))
            .await?;
        if signal.sync_flag().is_none() {
            return Ok(self.fail(Step::SyncStatus, StepFailure::SyncFlagMissing));
        }

        self.stagger().await;
        let passphrase = self.config.passphrase.clone();
        self.bridge
            .issue(BridgeCommand::universal(
                "encryptwallet",
                "encryptwallet",
                vec![json!(passphrase)],
            ))
            .await?;
        self.status.update(self.iteration, "checking encryptwallet");

        if let Some(outcome) = self
            .readiness_gate(Step::EncryptReadiness, "encryptwallet_environment")
            .await?
        {
            return Ok(Some(outcome));
        }

        self.status.update(self.iteration, "checking getnewaddress");
        let signal = self
            .bridge
            .issue(BridgeCommand::universal(
                "getnewaddress",
                "getnewaddress",
                vec![],
            ))
            .await?;
        if let Some(err) = signal.backend_error() {
            return Ok(self.fail(Step::NewAddress, err.into()));
        }

        self.status.update(self.iteration, "checking stop");
        self.stagger().await;
        self.bridge
            .issue(BridgeCommand::universal("stop", "stop", vec![]))
            .await?;

        if let Some(outcome) = self
            .readiness_gate(Step::StopReadiness, "stop_environment")
            .await?
        {
            return Ok(Some(outcome));
        }

        let signal = self
            .bridge
            .issue(BridgeCommand::universal("getbalance", "getbalance", vec![]))
            .await?;
        if let Some(err) = signal.backend_error() {
            return Ok(self.fail(Step::FirstBalance, err.into()));
        }
        let Some(balance) = signal.numeric_result() else {
            return Ok(self.fail(Step::FirstBalance, StepFailure::BalanceNotNumeric));
        };
        self.status
            .update(self.iteration, &format!("balance is {balance}"));

        self.status.update(self.iteration, "checking restartwallet");
        self.stagger().await;
        self.bridge
            .issue(BridgeCommand::service(
                "restartwallet",
                "restartwallet",
                json!({}),
            ))
            .await?;

        if let Some(outcome) = self
            .readiness_gate(Step::RestartReadiness, "restartwallet_environment")
            .await?
        {
            return Ok(Some(outcome));
        }

        self.status.update(self.iteration, "checking getbalance2");
        let signal = self
            .bridge
            .issue(BridgeCommand::universal("getbalance", "getbalance2", vec![]))
            .await?;
        if let Some(err) = signal.backend_error() {
            return Ok(self.fail(Step::SecondBalance, err.into()));
        }
        let Some(balance) = signal.numeric_result() else {
            return Ok(self.fail(Step::SecondBalance, StepFailure::BalanceNotNumeric));
        };
        self.status
            .update(self.iteration, &format!("balance2 is {balance}"));

        self.status.update(self.iteration, "checking transactions");
        self.stagger().await;
        let signal = self.transaction_sweep().await?;
        if let Some(err) = signal.backend_error() {
            return Ok(self.fail(Step::Transactions, err.into()));
        }
        if signal.transaction_list().is_none() {
            return Ok(self.fail(Step::Transactions, StepFailure::TransactionsNotArray));
        }

        let image_resource = self.config.image_resource.clone();
        self.bridge
            .issue(BridgeCommand::web_simple(
                image_resource,
                "wallet_images",
                "GET",
            ))
            .await?;

        self.status.update(self.iteration, "checking web_url");
        let probe_url = self.config.probe_url.clone();
        self.bridge
            .issue(BridgeCommand::web_url("web_url", probe_url, "GET"))
            .await?;

        self.status.update(self.iteration, "checking listdapps");
        let (first, discarded) = tokio::join!(
            self.bridge.issue(BridgeCommand::universal(
                "listdapps",
                "listdappsfirst",
                vec![json!(1)],
            )),
            self.bridge.issue(BridgeCommand::universal(
                "listdapps",
                "sendtonull",
                vec![json!(1)],
            )),
        );
        let _ = discarded;
        let signal = first?;
        if let Some(err) = signal.backend_error() {
            return Ok(self.fail(Step::DappList, err.into()));
        }
        let Some(dapps) = signal.result_array() else {
            return Ok(self.fail(Step::DappList, StepFailure::DappListNotArray));
        };
        let dapp_count = dapps.len();
        self.status
            .update(self.iteration, &format!("dapplist first length is {dapp_count}"));

        // The second listing's completion has no consumer; issue and move on.
        self.bridge
            .issue(BridgeCommand::universal(
                "listdapps",
                "listdappssecond",
                vec![json!(1)],
            ))
            .await?;

        self.iteration += 1;
        if self.iteration > self.config.max_iterations {
            self.status.update(self.iteration, "*** success ***");
            return Ok(Some(RunOutcome::Completed {
                iterations: self.iteration,
            }));
        }
        Ok(None)
    }
}
