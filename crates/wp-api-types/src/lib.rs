use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One command on the wallet-bridge surface. Every command carries the name
/// of the completion signal it will be answered under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BridgeCommand {
    Environment {
        signal: String,
    },
    Universal {
        category: String,
        signal: String,
        args: Vec<Value>,
    },
    Service {
        category: String,
        signal: String,
        params: Value,
    },
    WebSimple {
        resource: String,
        signal: String,
        method: String,
    },
    WebUrl {
        signal: String,
        url: String,
        method: String,
    },
}

impl BridgeCommand {
    pub fn environment(signal: impl Into<String>) -> Self {
        Self::Environment {
            signal: signal.into(),
        }
    }

    pub fn universal(
        category: impl Into<String>,
        signal: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self::Universal {
            category: category.into(),
            signal: signal.into(),
            args,
        }
    }

    pub fn service(
        category: impl Into<String>,
        signal: impl Into<String>,
        params: Value,
    ) -> Self {
        Self::Service {
            category: category.into(),
            signal: signal.into(),
            params,
        }
    }

    pub fn web_simple(
        resource: impl Into<String>,
        signal: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self::WebSimple {
            resource: resource.into(),
            signal: signal.into(),
            method: method.into(),
        }
    }

    pub fn web_url(
        signal: impl Into<String>,
        url: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self::WebUrl {
            signal: signal.into(),
            url: url.into(),
            method: method.into(),
        }
    }

    /// Name of the completion signal this command is answered under.
    pub fn signal(&self) -> &str {
        match self {
            Self::Environment { signal }
            | Self::Universal { signal, .. }
            | Self::Service { signal, .. }
            | Self::WebSimple { signal, .. }
            | Self::WebUrl { signal, .. } => signal,
        }
    }

    /// RPC category for `universal`/`service` commands, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Universal { category, .. } | Self::Service { category, .. } => {
                Some(category.as_str())
            }
            _ => None,
        }
    }
}

/// Payload of a completion signal. Which fields are populated depends on the
/// command category; the driver validates the ones it cares about per step.
///
/// A JSON `null` in `error` deserializes to `None`, so "error is null" and
/// "error is absent" are the same condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errortext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_loaded: Option<bool>,
    #[serde(
        rename = "IsBlockchainSynced",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_blockchain_synced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignalPayload {
    pub fn ready() -> Self {
        Self {
            is_loaded: Some(true),
            ..Self::default()
        }
    }

    pub fn not_ready() -> Self {
        Self {
            is_loaded: Some(false),
            ..Self::default()
        }
    }

    pub fn synced(flag: bool) -> Self {
        Self {
            is_blockchain_synced: Some(flag),
            ..Self::default()
        }
    }

    pub fn with_result(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn with_transactions(transactions: Value) -> Self {
        Self {
            transactions: Some(transactions),
            ..Self::default()
        }
    }

    pub fn from_error(code: impl Into<Value>, text: Option<String>) -> Self {
        Self {
            error: Some(code.into()),
            errortext: text,
            ..Self::default()
        }
    }

    /// A defined, non-null `error` field always means a backend failure,
    /// regardless of whatever else the payload carries.
    pub fn backend_error(&self) -> Option<BackendError> {
        self.error.as_ref().map(|code| BackendError {
            code: code.clone(),
            text: self.errortext.clone(),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.is_loaded == Some(true)
    }

    /// Blockchain-sync flag presence. The value itself is not checked; an
    /// absent field is what marks the sync query as failed.
    pub fn sync_flag(&self) -> Option<bool> {
        self.is_blockchain_synced
    }

    /// `result` as a number. A string `"20"`, a null, or a missing field all
    /// count as non-numeric.
    pub fn numeric_result(&self) -> Option<f64> {
        self.result.as_ref().and_then(Value::as_f64)
    }

    pub fn result_array(&self) -> Option<&Vec<Value>> {
        self.result.as_ref().and_then(Value::as_array)
    }

    pub fn transaction_list(&self) -> Option<&Vec<Value>> {
        self.transactions.as_ref().and_then(Value::as_array)
    }
}

/// Error reported by the wallet backend inside a completion payload.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{}", render_code(.code), .text.as_deref().map(|text| format!(" {text}")).unwrap_or_default())]
pub struct BackendError {
    pub code: Value,
    pub text: Option<String>,
}

/// String codes render unquoted; everything else as plain JSON.
fn render_code(code: &Value) -> String {
    match code {
        Value::String(code) => code.clone(),
        code => code.to_string(),
    }
}
