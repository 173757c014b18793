// Core domain exports
pub mod archetype;
pub mod clock;
pub mod disclosure;
pub mod exchange;
pub mod filters;
pub mod matcher;
pub mod reactions;
pub mod review;
pub mod scoring;

pub use archetype::{ArchetypeCode, ArchetypeError, ArchetypeRegistry, PersonalityArchetype, TraitVector};
pub use clock::{Clock, ManualClock, SystemClock};
pub use disclosure::{anonymous_counterpart, redact_counterpart, DisclosureLevel};
pub use exchange::{ExchangeRules, SubmissionOutcome};
pub use filters::{check_candidate, validate_filter, validate_preferred_date, MatchingWindow};
pub use matcher::{MatchResult, Matcher};
pub use scoring::calculate_compatibility;
