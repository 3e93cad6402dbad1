//! Placement Engine - matching students into organizational internship positions
//!
//! This library provides the matching core: preference-driven scoring, two
//! interchangeable assignment strategies, round orchestration and the match
//! approval workflow. Storage sits behind repository traits, with an
//! in-memory implementation shipped for tests and snapshot-driven runs.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Matcher, MatchingInput, MatchingStrategy, ResultsSummary};
pub use error::MatchingError;
pub use models::{AlgorithmType, Match, MatchStatus, MatchingRound, RoundStatus, ScoringWeights};
pub use services::{InMemoryStore, MatchingDefaults, MatchingService, Repositories, Snapshot};
