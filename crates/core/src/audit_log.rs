//! In-memory structured audit log for chain execution.
//!
//! Stores per-chain log entries capped at a configurable maximum (default 500)
//! with FIFO eviction. Uses `std::sync::RwLock` so it can be shared between
//! the orchestrator and any inspection surface without an async runtime.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for audit log entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Numeric severity for comparison (higher = more severe).
    pub fn as_severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

/// Phase of chain execution that produced the log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Selection,
    Execution,
    Timeout,
    CriticalHalt,
    Complete,
}

/// A single audit log entry for a chain execution.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub chain_id: String,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Query parameters for filtering audit log entries.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    /// Minimum log level (inclusive). Entries below this severity are excluded.
    pub level: Option<LogLevel>,
    /// Filter to a specific execution phase.
    pub phase: Option<ExecutionPhase>,
    /// Maximum number of entries to return.
    pub limit: Option<u32>,
    /// Only return entries at or after this ISO 8601 timestamp.
    pub since: Option<String>,
}

/// In-memory per-chain audit log with FIFO eviction.
///
/// Thread-safe via `std::sync::RwLock`.
pub struct AuditLog {
    entries: Arc<RwLock<HashMap<String, VecDeque<LogEntry>>>>,
    max_entries_per_chain: usize,
}

impl AuditLog {
    /// Create a new audit log with the default cap of 500 entries per chain.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_chain: 500,
        }
    }

    /// Create a new audit log with a custom per-chain entry cap.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_chain: max,
        }
    }

    /// Append a basic log entry for a chain.
    pub fn log(
        &self,
        chain_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(chain_id, level, phase, message, None, None);
    }

    /// Append a log entry with optional structured details and duration.
    pub fn log_with_details(
        &self,
        chain_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            chain_id: chain_id.to_string(),
            level,
            phase,
            message: message.into(),
            details,
            duration_ms,
        };

        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        let deque = guard
            .entry(chain_id.to_string())
            .or_insert_with(VecDeque::new);
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_chain {
            deque.pop_front();
        }
    }

    /// Query log entries for a chain, filtered by the given parameters.
    ///
    /// Returns entries newest-first.
    pub fn query(&self, chain_id: &str, params: &LogQueryParams) -> Vec<LogEntry> {
        let guard = self.entries.read().expect("audit_log lock poisoned");
        let Some(deque) = guard.get(chain_id) else {
            return Vec::new();
        };

        let min_severity = params
            .level
            .as_ref()
            .map(|l| l.as_severity())
            .unwrap_or(0);

        let since: Option<DateTime<Utc>> = params
            .since
            .as_ref()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());

        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev()
            .filter(|e| e.level.as_severity() >= min_severity)
            .filter(|e| {
                params
                    .phase
                    .as_ref()
                    .map_or(true, |p| &e.phase == p)
            })
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Clear all log entries for a specific chain.
    pub fn clear(&self, chain_id: &str) {
        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        guard.remove(chain_id);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
