use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Something that happened in the matching domain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DomainEvent {
    MatchCreated {
        match_id: Uuid,
        round_id: Uuid,
        student_id: String,
        organization_id: String,
    },
    MatchApproved {
        match_id: Uuid,
        student_id: String,
        organization_id: String,
        approved_by: Option<String>,
    },
    MatchRejected {
        match_id: Uuid,
        notes: Option<String>,
    },
    MatchConfirmed {
        match_id: Uuid,
    },
    StudentMatched {
        student_id: String,
        match_id: Uuid,
    },
    RoundCompleted {
        round_id: Uuid,
        matched_students: usize,
        average_score: Option<f64>,
    },
    RoundFailed {
        round_id: Uuid,
        reason: String,
    },
}

/// Tag used as the key of the registration table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MatchCreated,
    MatchApproved,
    MatchRejected,
    MatchConfirmed,
    StudentMatched,
    RoundCompleted,
    RoundFailed,
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::MatchCreated { .. } => EventKind::MatchCreated,
            DomainEvent::MatchApproved { .. } => EventKind::MatchApproved,
            DomainEvent::MatchRejected { .. } => EventKind::MatchRejected,
            DomainEvent::MatchConfirmed { .. } => EventKind::MatchConfirmed,
            DomainEvent::StudentMatched { .. } => EventKind::StudentMatched,
            DomainEvent::RoundCompleted { .. } => EventKind::RoundCompleted,
            DomainEvent::RoundFailed { .. } => EventKind::RoundFailed,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Handlers installed by `EventBus::with_default_handlers`
const DEFAULT_HANDLERS: &[(EventKind, fn(&DomainEvent))] = &[
    (EventKind::MatchCreated, log_match_created),
    (EventKind::MatchApproved, log_match_decision),
    (EventKind::MatchRejected, log_match_decision),
    (EventKind::MatchConfirmed, log_match_decision),
    (EventKind::StudentMatched, log_student_matched),
    (EventKind::RoundCompleted, log_round_finished),
    (EventKind::RoundFailed, log_round_finished),
];

/// Synchronous in-process dispatcher
///
/// Handlers run in registration order on the publishing thread. They only
/// observe events; organization counters belong to the approval path.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_handlers() -> Self {
        let mut bus = Self::new();
        for (kind, handler) in DEFAULT_HANDLERS {
            bus.register(*kind, Arc::new(*handler));
        }
        bus
    }

    pub fn register(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map(Vec::len).unwrap_or(0)
    }

    /// Deliver to every handler registered for the event's kind
    ///
    /// Returns how many handlers ran.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let Some(handlers) = self.handlers.get(&event.kind()) else {
            debug!("No handlers registered for {:?}", event.kind());
            return 0;
        };
        for handler in handlers {
            handler(event);
        }
        handlers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&EventKind, usize> =
            self.handlers.iter().map(|(kind, list)| (kind, list.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

fn log_match_created(event: &DomainEvent) {
    if let DomainEvent::MatchCreated {
        match_id,
        round_id,
        student_id,
        organization_id,
    } = event
    {
        debug!(
            "Match {} created in round {}: {} -> {}",
            match_id, round_id, student_id, organization_id
        );
    }
}

fn log_match_decision(event: &DomainEvent) {
    match event {
        DomainEvent::MatchApproved {
            match_id,
            student_id,
            organization_id,
            approved_by,
        } => info!(
            "Match {} approved by {}: {} -> {}",
            match_id,
            approved_by.as_deref().unwrap_or("system"),
            student_id,
            organization_id
        ),
        DomainEvent::MatchRejected { match_id, notes } => {
            info!("Match {} rejected ({})", match_id, notes.as_deref().unwrap_or("no notes"))
        }
        DomainEvent::MatchConfirmed { match_id } => info!("Match {} confirmed", match_id),
        _ => {}
    }
}

fn log_student_matched(event: &DomainEvent) {
    if let DomainEvent::StudentMatched { student_id, match_id } = event {
        info!("Student {} matched via {}", student_id, match_id);
    }
}

fn log_round_finished(event: &DomainEvent) {
    match event {
        DomainEvent::RoundCompleted {
            round_id,
            matched_students,
            average_score,
        } => info!(
            "Matching round {} completed: {} matched, average score {:.4}",
            round_id,
            matched_students,
            average_score.unwrap_or(0.0)
        ),
        DomainEvent::RoundFailed { round_id, reason } => {
            error!("Matching round {} failed: {}", round_id, reason)
        }
        _ => {}
    }
}
