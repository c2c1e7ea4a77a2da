//! Pure decision logic for government document retrieval and form handling.
//!
//! Everything here is deterministic and free of I/O, which keeps the ranking
//! heuristics, the field model, and the autofill matching unit-testable
//! without any backing service.

pub mod autofill;
pub mod decide;
pub mod fields;
pub mod query;

pub use autofill::{AutofillSuggestion, FieldMatcher, KeywordMatcher, MatchKind, UserProfile};
pub use decide::{Candidate, DecisionKind, FilterDecision};
pub use fields::{Confidence, ExtractionStage, FieldType, FormField, FormSchema};
pub use query::QueryContext;

/// Why a query was refused before touching any backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rejection {
	EmptyQuery,
	QueryTooShort { min: usize },
}
impl std::fmt::Display for Rejection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::EmptyQuery => write!(f, "Query must not be empty."),
			Self::QueryTooShort { min } =>
				write!(f, "Query must be at least {min} characters long."),
		}
	}
}
