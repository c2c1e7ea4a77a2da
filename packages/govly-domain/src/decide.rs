//! Candidate filtering and result shaping.
//!
//! Takes the raw nearest-neighbor candidates from the vector store and turns
//! them into a small, decisive result set: detect a query category, restrict
//! candidates to it, collapse near-duplicates, and cap the survivors.

use serde::Serialize;

use govly_config::{CategoryRule, Retrieval};

use crate::query::QueryContext;

/// One retrieved document candidate, ordered by similarity.
#[derive(Clone, Debug, Serialize)]
pub struct Candidate {
	pub source_id: String,
	pub title: String,
	pub url: String,
	pub content: String,
	pub country: String,
	pub agency: String,
	/// Cosine similarity reported by the vector store, higher is closer.
	pub similarity: f32,
}

/// How the composer should phrase the answer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
	/// One clear winner, answer with a direct recommendation.
	SingleRecommendation,
	/// A handful of comparable options, answer with a short comparison.
	MultipleOptions,
}

/// Outcome of the filter stage.
#[derive(Clone, Debug, Serialize)]
pub struct FilterDecision {
	pub kind: DecisionKind,
	/// Matched category rule name, if any.
	pub category: Option<String>,
	/// Surviving candidates, still in similarity order.
	pub candidates: Vec<Candidate>,
}

/// Shapes `candidates` into a [`FilterDecision`].
///
/// `candidates` must already be sorted by descending similarity; the vector
/// store returns them that way and the ordering is preserved throughout.
pub fn decide(
	mut candidates: Vec<Candidate>,
	ctx: &QueryContext,
	retrieval: &Retrieval,
) -> FilterDecision {
	let category = detect_category(ctx, &retrieval.categories);

	if let Some(rule) = &category {
		let restricted = candidates
			.iter()
			.filter(|c| matches_category(c, rule))
			.cloned()
			.collect::<Vec<_>>();

		// A category restriction that wipes out every candidate is treated
		// as a miss rather than an empty answer.
		if !restricted.is_empty() {
			candidates = restricted;
		}
	}

	let category = category.map(|r| r.name.clone());

	if candidates.len() > 1 {
		let gap = candidates[0].similarity - candidates[1].similarity;

		if gap.abs() < retrieval.duplicate_epsilon {
			// The runners-up say nothing new, keep the best one only.
			candidates.truncate(1);
		}
	}
	if candidates.len() == 1 {
		return FilterDecision { kind: DecisionKind::SingleRecommendation, category, candidates };
	}

	candidates.truncate(retrieval.max_options);

	FilterDecision { kind: DecisionKind::MultipleOptions, category, candidates }
}

/// Picks the category rule the query falls under.
///
/// An explicit `category_hint` wins when it names a known rule; otherwise the
/// first rule with a query keyword present in the query text is used.
fn detect_category<'a>(ctx: &QueryContext, rules: &'a [CategoryRule]) -> Option<&'a CategoryRule> {
	if let Some(hint) = &ctx.category_hint
		&& let Some(rule) = rules.iter().find(|r| &r.name == hint)
	{
		return Some(rule);
	}

	let query = ctx.query.to_lowercase();

	rules.iter().find(|r| r.query_keywords.iter().any(|k| query.contains(k.as_str())))
}

fn matches_category(candidate: &Candidate, rule: &CategoryRule) -> bool {
	let title = candidate.title.to_lowercase();
	let content = candidate.content.to_lowercase();

	rule.candidate_keywords.iter().any(|k| title.contains(k.as_str()) || content.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(source_id: &str, title: &str, similarity: f32) -> Candidate {
		Candidate {
			source_id: source_id.into(),
			title: title.into(),
			url: format!("https://example.gov/{source_id}"),
			content: title.to_lowercase(),
			country: "VN".into(),
			agency: "none".into(),
			similarity,
		}
	}

	fn retrieval() -> Retrieval {
		Retrieval {
			candidate_k: 10,
			duplicate_epsilon: 0.05,
			max_options: 2,
			min_query_chars: 3,
			categories: vec![
				CategoryRule {
					name: "business_single_member".into(),
					query_keywords: vec!["solo".into(), "alone".into(), "một mình".into()],
					candidate_keywords: vec!["single-member".into(), "sole".into()],
				},
				CategoryRule {
					name: "business_multi_member".into(),
					query_keywords: vec!["partner".into(), "partners".into()],
					candidate_keywords: vec!["multi-member".into(), "partnership".into()],
				},
			],
		}
	}

	fn ctx(query: &str) -> QueryContext {
		QueryContext::build(query, "vn", "vi", "none", None, 3).unwrap()
	}

	#[test]
	fn near_duplicates_collapse_to_single_recommendation() {
		let decision = decide(
			vec![candidate("a", "Registration decree", 0.91), candidate("b", "Registration circular", 0.89)],
			&ctx("how do i register"),
			&retrieval(),
		);

		assert_eq!(decision.kind, DecisionKind::SingleRecommendation);
		assert_eq!(decision.candidates.len(), 1);
		assert_eq!(decision.candidates[0].source_id, "a");
	}

	#[test]
	fn distinct_results_stay_multiple_and_capped() {
		let decision = decide(
			vec![
				candidate("a", "Decree A", 0.90),
				candidate("b", "Decree B", 0.70),
				candidate("c", "Decree C", 0.60),
			],
			&ctx("business registration"),
			&retrieval(),
		);

		assert_eq!(decision.kind, DecisionKind::MultipleOptions);
		assert_eq!(decision.candidates.len(), 2);
	}

	#[test]
	fn category_keywords_restrict_candidates() {
		let decision = decide(
			vec![
				candidate("a", "Multi-member LLC guide", 0.90),
				candidate("b", "Single-member LLC guide", 0.70),
			],
			&ctx("i want to start a company alone"),
			&retrieval(),
		);

		assert_eq!(decision.category.as_deref(), Some("business_single_member"));
		assert_eq!(decision.candidates.len(), 1);
		assert_eq!(decision.candidates[0].source_id, "b");
	}

	#[test]
	fn category_hint_overrides_keyword_detection() {
		let mut c = ctx("i want to start a company alone");

		c.category_hint = Some("business_multi_member".into());

		let decision = decide(
			vec![
				candidate("a", "Multi-member LLC guide", 0.90),
				candidate("b", "Single-member LLC guide", 0.88),
			],
			&c,
			&retrieval(),
		);

		assert_eq!(decision.category.as_deref(), Some("business_multi_member"));
		assert_eq!(decision.candidates[0].source_id, "a");
	}

	#[test]
	fn empty_restriction_falls_back_to_all_candidates() {
		let decision = decide(
			vec![candidate("a", "Tax filing guide", 0.90), candidate("b", "Tax circular", 0.60)],
			&ctx("i want to start a company alone"),
			&retrieval(),
		);

		// The category matched the query but no candidate, so nothing is dropped.
		assert_eq!(decision.category.as_deref(), Some("business_single_member"));
		assert_eq!(decision.candidates.len(), 2);
	}

	#[test]
	fn single_candidate_is_a_recommendation() {
		let decision =
			decide(vec![candidate("a", "Decree A", 0.90)], &ctx("business registration"), &retrieval());

		assert_eq!(decision.kind, DecisionKind::SingleRecommendation);
	}

	#[test]
	fn no_candidates_yield_empty_options() {
		let decision = decide(Vec::new(), &ctx("business registration"), &retrieval());

		assert_eq!(decision.kind, DecisionKind::MultipleOptions);
		assert!(decision.candidates.is_empty());
	}
}
