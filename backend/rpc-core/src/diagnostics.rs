//! Structured diagnostic channel for the transport and decoder.
//!
//! Diagnostics are an explicit value handed to the components that emit
//! them, never process-wide state. With no sink attached, event
//! construction is skipped entirely.

use crate::config::DiagnosticsConfig;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    RequestEncoded {
        rpc_ids: Vec<String>,
        request_index: u64,
        body_preview: String,
    },
    ResponseStatus {
        rpc_ids: Vec<String>,
        status: u16,
        attempt: u32,
    },
    FrameRead {
        offset: usize,
        declared_length: usize,
        preview: String,
    },
    EnvelopeSkipped {
        marker: String,
    },
    EnvelopeMatched {
        rpc_id: String,
        sequence_index: u32,
    },
    RetryScheduled {
        rpc_ids: Vec<String>,
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    RefreshStarted {
        provider: &'static str,
        generation: u64,
    },
    RefreshCoalesced {
        generation: u64,
    },
    UnknownEnumValue {
        schema: String,
        field: String,
        enum_name: String,
        number: i64,
    },
    TrailingFieldsIgnored {
        schema: String,
        count: usize,
    },
}

/// Receiver of diagnostic events. Implementations must be cheap and must not block.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Forwards events to the `log` facade at debug level.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, event: DiagnosticEvent) {
        debug!("rpc diagnostic: {event:?}");
    }
}

/// Collects events in memory, for inspection after a call.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

const DEFAULT_PREVIEW_BYTES: usize = 256;

#[derive(Clone)]
pub struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticSink>>,
    preview_bytes: usize,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.is_enabled())
            .field("preview_bytes", &self.preview_bytes)
            .finish()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Diagnostics {
    pub fn disabled() -> Self {
        Self {
            sink: None,
            preview_bytes: DEFAULT_PREVIEW_BYTES,
        }
    }

    pub fn to_log() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink: Some(sink),
            preview_bytes: DEFAULT_PREVIEW_BYTES,
        }
    }

    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        let diagnostics = if config.enabled {
            Self::to_log()
        } else {
            Self::disabled()
        };
        diagnostics.with_preview_bytes(config.preview_bytes)
    }

    pub fn with_preview_bytes(mut self, preview_bytes: usize) -> Self {
        self.preview_bytes = preview_bytes;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Build and record an event; the closure only runs when a sink is attached.
    pub fn emit(&self, event: impl FnOnce() -> DiagnosticEvent) {
        if let Some(sink) = &self.sink {
            sink.record(event());
        }
    }

    /// Lossy UTF-8 preview of a payload, cut to the configured budget.
    pub fn preview(&self, bytes: &[u8]) -> String {
        let cut = bytes.len().min(self.preview_bytes);
        let mut preview = String::from_utf8_lossy(&bytes[..cut]).into_owned();
        if cut < bytes.len() {
            preview.push_str("...");
        }
        preview
    }
}
