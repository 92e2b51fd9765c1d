//! Turn outcome observers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_policy::Intent;
use chat_primitives::SessionId;
use tracing::{debug, info, warn};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnKind {
    /// Blank input; nothing happened.
    Ignored,
    /// Answered from memory.
    Recalled {
        /// Similarity of the stored match.
        score: f32,
    },
    /// Answered by the completion provider.
    Generated {
        /// Branch that produced the instruction.
        intent: Intent,
        /// Whether the reply was written to memory.
        stored: bool,
    },
    /// Answered by an auxiliary capability.
    Auxiliary {
        /// Capability name.
        capability: String,
    },
    /// Aborted with a failure notice.
    Failed {
        /// Step that failed.
        stage: &'static str,
        /// Error text.
        reason: String,
    },
}

impl TurnKind {
    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Recalled { .. } => "recalled",
            Self::Generated { .. } => "generated",
            Self::Auxiliary { .. } => "auxiliary",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A finished turn as seen by observers.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnEvent {
    /// Session the turn belonged to.
    pub session: SessionId,
    /// Outcome.
    pub kind: TurnKind,
    /// Wall time spent in the turn.
    pub elapsed: Duration,
}

/// Receives an event for every finished turn.
pub trait TurnObserver: Send + Sync {
    /// Records the event.
    fn on_turn(&self, event: &TurnEvent);
}

/// Observer that writes events to the tracing system.
#[derive(Debug, Default)]
pub struct TracingTurnObserver;

impl TurnObserver for TracingTurnObserver {
    fn on_turn(&self, event: &TurnEvent) {
        let elapsed_ms = u64::try_from(event.elapsed.as_millis()).unwrap_or(u64::MAX);
        match &event.kind {
            TurnKind::Ignored => debug!(session = %event.session, "blank input ignored"),
            TurnKind::Recalled { score } => {
                info!(session = %event.session, elapsed_ms, score, "turn answered from memory");
            }
            TurnKind::Generated { intent, stored } => {
                info!(
                    session = %event.session,
                    elapsed_ms,
                    %intent,
                    stored,
                    "turn answered by model"
                );
            }
            TurnKind::Auxiliary { capability } => {
                info!(
                    session = %event.session,
                    elapsed_ms,
                    capability = capability.as_str(),
                    "turn answered by capability"
                );
            }
            TurnKind::Failed { stage, reason } => {
                warn!(session = %event.session, elapsed_ms, stage, %reason, "turn aborted");
            }
        }
    }
}

/// Forwards events to several observers.
#[derive(Default)]
pub struct CompositeTurnObserver {
    observers: Vec<Arc<dyn TurnObserver>>,
}

impl CompositeTurnObserver {
    /// Creates a composite from the supplied observers.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn TurnObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer.
    pub fn push(&mut self, observer: Arc<dyn TurnObserver>) {
        self.observers.push(observer);
    }
}

impl TurnObserver for CompositeTurnObserver {
    fn on_turn(&self, event: &TurnEvent) {
        for observer in &self.observers {
            observer.on_turn(event);
        }
    }
}

/// Observer that keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingTurnObserver {
    events: Mutex<Vec<TurnEvent>>,
}

impl CollectingTurnObserver {
    /// Creates a shared collector.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Takes the collected events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<TurnEvent> {
        let mut lock = self.events.lock().expect("collecting observer poisoned");
        lock.drain(..).collect()
    }
}

impl TurnObserver for CollectingTurnObserver {
    fn on_turn(&self, event: &TurnEvent) {
        self.events
            .lock()
            .expect("collecting observer poisoned")
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: TurnKind) -> TurnEvent {
        TurnEvent {
            session: SessionId::random(),
            kind,
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn composite_fans_out() {
        let first = CollectingTurnObserver::new();
        let second = CollectingTurnObserver::new();
        let composite = CompositeTurnObserver::new([
            Arc::new(TracingTurnObserver) as Arc<dyn TurnObserver>,
            first.clone() as Arc<dyn TurnObserver>,
            second.clone() as Arc<dyn TurnObserver>,
        ]);

        composite.on_turn(&event(TurnKind::Recalled { score: 0.99 }));

        assert_eq!(first.drain().len(), 1);
        let seen = second.drain();
        assert_eq!(seen[0].kind.label(), "recalled");
        assert!(second.drain().is_empty());
    }

    #[test]
    fn labels_are_stable() {
        let generated = TurnKind::Generated {
            intent: Intent::Opinion,
            stored: true,
        };
        assert_eq!(generated.label(), "generated");
        assert_eq!(
            TurnKind::Failed {
                stage: "completion",
                reason: "timeout".into()
            }
            .label(),
            "failed"
        );
    }
}
