// Core algorithm exports
pub mod matcher;
pub mod preferences;
pub mod priority;
pub mod scoring;
pub mod weighted;

pub use matcher::{strategy_for, MatchResult, Matcher, MatchingInput, MatchingStrategy, PreparedInput, ResultsSummary, SkipCounts};
pub use preferences::{OrganizationAreaPreference, PreferenceStore, StudentAreaPreference};
pub use priority::PreferencePriorityStrategy;
pub use scoring::{calculate_match_score, grade_score, letter_grade_points, rank_score, ScoreInputs};
pub use weighted::WeightedPreferenceStrategy;
