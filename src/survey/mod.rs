// Character-ranking survey: ballots, duplicate guard, aggregation, service.

pub mod aggregate;
pub mod ballot;
pub mod guard;
pub mod service;

pub use aggregate::{aggregate, CharacterStat, PositionStats};
pub use ballot::{Ballot, CharacterRef, Rankings, Role};
pub use guard::VoteGuard;
pub use service::{SurveyError, SurveyService};
