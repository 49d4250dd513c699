//! Operator-facing outcome reports.
//!
//! A [`Report`] is built from any outcome without panicking. Failures carry
//! the chain's code and codespace verbatim.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use nftmx_tx::BroadcastResult;
use nftmx_types::{MarketError, Result, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    ExecutionFailure,
    Error,
}

/// Attribute values keyed by event type, then attribute key.
pub type EventsByType = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txhash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub events: EventsByType,
}

impl Report {
    fn empty(status: ReportStatus) -> Self {
        Self {
            status,
            kind: None,
            txhash: None,
            height: None,
            code: None,
            codespace: None,
            message: None,
            events: BTreeMap::new(),
        }
    }

    pub fn from_outcome(outcome: &Result<BroadcastResult>) -> Self {
        match outcome {
            Ok(result) => Self::from_result(result),
            Err(e) => Self::from_error(e),
        }
    }

    pub fn from_result(result: &BroadcastResult) -> Self {
        match result {
            BroadcastResult::Success(s) => Self {
                txhash: Some(s.txhash.clone()),
                height: Some(s.height),
                events: s.events_by_type(),
                ..Self::empty(ReportStatus::Success)
            },
            BroadcastResult::Failure(f) => Self {
                kind: Some("contract_execution".to_string()),
                txhash: Some(f.txhash.clone()),
                height: Some(f.height),
                code: Some(f.code),
                codespace: Some(f.codespace.clone()),
                message: Some(f.raw_log.clone()),
                ..Self::empty(ReportStatus::ExecutionFailure)
            },
        }
    }

    pub fn from_error(error: &MarketError) -> Self {
        let mut report = Self {
            kind: Some(error.kind().to_string()),
            message: Some(error.to_string()),
            ..Self::empty(ReportStatus::Error)
        };
        match error {
            MarketError::ContractExecution { code, codespace, txhash, raw_log } => {
                report.status = ReportStatus::ExecutionFailure;
                report.code = Some(*code);
                report.codespace = Some(codespace.clone());
                report.txhash = Some(txhash.clone());
                report.message = Some(raw_log.clone());
            }
            MarketError::Transport(TransportError::Rejected { code, codespace, .. }) => {
                report.code = Some(*code);
                report.codespace = Some(codespace.clone());
            }
            MarketError::Transport(TransportError::NotConfirmed { txhash, .. }) => {
                report.txhash = Some(txhash.clone());
            }
            _ => {}
        }
        report
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| format!("{{\"status\":\"error\",\"message\":\"unserializable report: {}\"}}", e))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            ReportStatus::Success => {
                write!(f, "success")?;
            }
            ReportStatus::ExecutionFailure => {
                write!(
                    f,
                    "execution failed: code {} codespace {}",
                    self.code.unwrap_or_default(),
                    self.codespace.as_deref().unwrap_or("")
                )?;
            }
            ReportStatus::Error => {
                write!(f, "error [{}]", self.kind.as_deref().unwrap_or("other"))?;
            }
        }
        if let Some(txhash) = &self.txhash {
            write!(f, "\n  txhash: {}", txhash)?;
        }
        if let Some(height) = self.height {
            write!(f, "\n  height: {}", height)?;
        }
        if self.status == ReportStatus::Error {
            if let (Some(code), Some(codespace)) = (self.code, &self.codespace) {
                write!(f, "\n  code: {} codespace: {}", code, codespace)?;
            }
        }
        if let Some(message) = &self.message {
            write!(f, "\n  {}", message)?;
        }
        for (kind, attributes) in &self.events {
            write!(f, "\n  {}:", kind)?;
            for (key, values) in attributes {
                write!(f, "\n    {} = {}", key, values.join(", "))?;
            }
        }
        Ok(())
    }
}
