//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events through the `log`
//! facade (UART / USB-CDC on the device, stderr on host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => {
                info!("START | outputs safe, mode={}", mode);
            }
            AppEvent::TransitionStarted { from, to } => {
                info!("MODE  | {} -> {} (settling)", from, to);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {} -> {} committed", from, to);
            }
            AppEvent::RelayFault { error, recovered } => {
                warn!(
                    "FAULT | {}; outputs {}",
                    error,
                    if *recovered { "released" } else { "in unknown state" }
                );
            }
        }
    }
}
