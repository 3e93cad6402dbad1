// Service exports
pub mod commands;
pub mod events;
pub mod locks;
pub mod matching;
pub mod memory;
pub mod repository;

pub use commands::{Command, CommandOutcome, Query, QueryOutcome};
pub use events::{DomainEvent, EventBus, EventHandler, EventKind};
pub use locks::KeyedLocks;
pub use matching::{MatchingDefaults, MatchingService, Repositories};
pub use memory::{InMemoryStore, Snapshot, SnapshotError};
pub use repository::{
    GradeRepository, MatchRepository, OrganizationRepository, PreferenceRepository,
    RepositoryError, RoundRepository, StatementRepository, StudentRepository,
};
