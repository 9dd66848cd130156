//! Diagnostic reporting for recoverable machine errors.
//!
//! Machines never fail an operation because of a recoverable error; they
//! hand it to a [`DiagnosticSink`] and degrade (skip the entry, return
//! `false`). The default sink forwards to `tracing`.

use crate::machine::{RegistrationError, SwitchError};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// A recoverable condition reported by a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Registration(RegistrationError),
    Switch(SwitchError),
}

impl Diagnostic {
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Self::Switch(SwitchError::TransitionChainExceeded { .. }) => DiagnosticLevel::Warning,
            Self::Registration(_) | Self::Switch(_) => DiagnosticLevel::Error,
        }
    }

    /// Name of the machine that raised the diagnostic.
    pub fn machine(&self) -> &str {
        match self {
            Self::Registration(RegistrationError::DuplicateId { machine, .. })
            | Self::Switch(SwitchError::UnknownState { machine, .. })
            | Self::Switch(SwitchError::NotStarted { machine, .. })
            | Self::Switch(SwitchError::TransitionChainExceeded { machine, .. }) => machine,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration(e) => e.fmt(f),
            Self::Switch(e) => e.fmt(f),
        }
    }
}

impl From<RegistrationError> for Diagnostic {
    fn from(error: RegistrationError) -> Self {
        Self::Registration(error)
    }
}

impl From<SwitchError> for Diagnostic {
    fn from(error: SwitchError) -> Self {
        Self::Switch(error)
    }
}

/// Fire-and-forget destination for diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.level() {
            DiagnosticLevel::Error => {
                tracing::error!(machine = diagnostic.machine(), "{diagnostic}")
            }
            DiagnosticLevel::Warning => {
                tracing::warn!(machine = diagnostic.machine(), "{diagnostic}")
            }
        }
    }
}

/// Keeps every reported diagnostic in memory.
///
/// Clones share the same buffer, so a clone can be handed to a machine
/// while the original is kept for inspection.
///
/// # Example
///
/// ```rust
/// use statetree::diagnostics::{Diagnostic, DiagnosticSink, MemorySink};
/// use statetree::machine::SwitchError;
///
/// let sink = MemorySink::new();
/// let handle = sink.clone();
/// handle.report(&Diagnostic::Switch(SwitchError::UnknownState {
///     machine: "fsm".into(),
///     hash: 9,
/// }));
///
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.lock().push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(hash: i32) -> Diagnostic {
        Diagnostic::Switch(SwitchError::UnknownState {
            machine: "Guard".to_string(),
            hash,
        })
    }

    #[test]
    fn memory_sink_shares_buffer_between_clones() {
        let sink = MemorySink::new();
        let clone = sink.clone();

        clone.report(&unknown(1));
        clone.report(&unknown(2));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.diagnostics()[1], unknown(2));

        sink.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn levels_and_machine_names() {
        let duplicate = Diagnostic::from(RegistrationError::DuplicateId {
            machine: "Guard".to_string(),
            name: "Idle".to_string(),
            existing: "Idle".to_string(),
            hash: 4,
        });
        let chain = Diagnostic::from(SwitchError::TransitionChainExceeded {
            machine: "Legs".to_string(),
            limit: 64,
            dropped: 1,
        });

        assert_eq!(duplicate.level(), DiagnosticLevel::Error);
        assert_eq!(duplicate.machine(), "Guard");
        assert_eq!(chain.level(), DiagnosticLevel::Warning);
        assert_eq!(chain.machine(), "Legs");
    }

    #[test]
    fn display_forwards_to_error() {
        assert_eq!(
            unknown(999).to_string(),
            "State id '999' does not belong to the FSM 'Guard'"
        );
    }

    #[test]
    fn duplicate_message_mentions_hash_collision() {
        let diagnostic = Diagnostic::from(RegistrationError::DuplicateId {
            machine: "Guard".to_string(),
            name: "Walk".to_string(),
            existing: "Stroll".to_string(),
            hash: 2,
        });

        let message = diagnostic.to_string();
        assert!(message.contains("'Walk' is already in use"));
        assert!(message.contains("duplicate hash id"));
    }

    #[test]
    fn tracing_sink_accepts_every_level() {
        let sink = TracingSink;
        sink.report(&unknown(3));
        sink.report(&Diagnostic::from(SwitchError::TransitionChainExceeded {
            machine: "Guard".to_string(),
            limit: 64,
            dropped: 2,
        }));
    }
}
