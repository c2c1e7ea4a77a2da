//! Response composition.
//!
//! Turns a filter decision into user-facing text. The generation provider is
//! asked once, retried once on failure, and a fixed neutral answer covers the
//! case where both attempts fail, so a broken generation endpoint degrades
//! the answer instead of the whole request.

use unicode_segmentation::UnicodeSegmentation;

use govly_config::Composer;
use govly_domain::{DecisionKind, FilterDecision, QueryContext};
use govly_providers::generation::GenerationParams;

use crate::{GovlyService, ServiceResult, SourceKind};

const EXCERPT_CHARS: usize = 800;

const SYSTEM_PROMPT: &str = "\
You are an assistant for government services in Southeast Asia. Answer from \
the provided documents only. Be concrete: name the document, the issuing \
agency, and the next step the user should take. If the documents do not \
answer the question, say so plainly.";

/// Answer shape, picked once per request and terminal after that.
///
/// Retrying a failed generation call never changes the state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ComposerState {
	SingleFormRecommendation,
	MultiFormSelection,
	DocumentExplanation,
}
impl ComposerState {
	pub(crate) fn select(kind: SourceKind, decision: DecisionKind) -> Self {
		match (kind, decision) {
			(SourceKind::Link, _) => Self::DocumentExplanation,
			(SourceKind::Form, DecisionKind::SingleRecommendation) =>
				Self::SingleFormRecommendation,
			(SourceKind::Form, DecisionKind::MultipleOptions) => Self::MultiFormSelection,
		}
	}

	fn max_sentences(self, composer: &Composer) -> usize {
		match self {
			Self::SingleFormRecommendation => composer.single_max_sentences,
			Self::MultiFormSelection => composer.multi_max_sentences,
			Self::DocumentExplanation => composer.explain_max_sentences,
		}
	}

	fn instruction(self, max_sentences: usize) -> String {
		match self {
			Self::SingleFormRecommendation => format!(
				"Recommend document 1 directly, name the form and its key requirements, \
				 and do not hedge. Answer in at most {max_sentences} sentences."
			),
			Self::MultiFormSelection => format!(
				"Compare the forms and explain which situation each one fits. If the \
				 choice is still ambiguous, end with exactly one clarifying question. \
				 Answer in at most {max_sentences} sentences."
			),
			Self::DocumentExplanation => format!(
				"Explain what the documents say that answers the question, with at most \
				 one clarifying question if something essential is missing. Answer in at \
				 most {max_sentences} sentences."
			),
		}
	}
}

pub(crate) async fn compose(
	service: &GovlyService,
	ctx: &QueryContext,
	decision: &FilterDecision,
	kind: SourceKind,
) -> ServiceResult<String> {
	if decision.candidates.is_empty() {
		return Ok(no_results_response(ctx));
	}

	let composer = &service.cfg.composer;
	let state = ComposerState::select(kind, decision.kind);
	let max_sentences = state.max_sentences(composer);
	let system_prompt = build_system_prompt(ctx);
	let user_prompt = build_user_prompt(ctx, decision, state, max_sentences);
	let params =
		GenerationParams { temperature: composer.temperature, max_tokens: composer.max_tokens };

	for attempt in 1..=2 {
		match service
			.providers
			.generation
			.generate(&service.cfg.providers.generation, &system_prompt, &user_prompt, params)
			.await
		{
			Ok(text) => return Ok(truncate_sentences(&text, max_sentences)),
			Err(err) => {
				tracing::warn!(attempt, error = %err, "Generation attempt failed.");
			},
		}
	}

	Ok(fallback_response(decision))
}

/// Base instructions plus the user's country and answer language.
fn build_system_prompt(ctx: &QueryContext) -> String {
	let mut prompt = SYSTEM_PROMPT.to_owned();

	if ctx.country != "none" {
		prompt.push_str(&format!(" The request concerns {} government services.", ctx.country));
	}

	prompt.push_str(&format!(" Write the answer in the language tagged \"{}\".", ctx.language));

	prompt
}

/// Numbered document context plus instructions for the decided answer shape.
fn build_user_prompt(
	ctx: &QueryContext,
	decision: &FilterDecision,
	state: ComposerState,
	max_sentences: usize,
) -> String {
	let context = format_document_context(decision);
	let instruction = state.instruction(max_sentences);

	format!("Documents:\n{context}\nQuestion: {}\n\n{instruction}", ctx.query)
}

fn format_document_context(decision: &FilterDecision) -> String {
	let mut context = String::new();

	for (i, candidate) in decision.candidates.iter().enumerate() {
		let excerpt = char_prefix(&candidate.content, EXCERPT_CHARS);

		context.push_str(&format!(
			"{}. {} ({})\n   {}\n",
			i + 1,
			candidate.title,
			candidate.url,
			excerpt.trim()
		));
	}

	context
}

fn no_results_response(ctx: &QueryContext) -> String {
	if ctx.country == "none" {
		"No matching documents were found for this query. Try rephrasing it or naming the \
		 country the request concerns."
			.into()
	} else {
		format!(
			"No matching documents were found for this query in {}. Try rephrasing it or \
			 widening the search.",
			ctx.country
		)
	}
}

/// Deterministic answer used when generation fails twice.
fn fallback_response(decision: &FilterDecision) -> String {
	match decision.kind {
		DecisionKind::SingleRecommendation => {
			let top = &decision.candidates[0];

			format!("The most relevant document is \"{}\". See {} for details.", top.title, top.url)
		},
		DecisionKind::MultipleOptions => {
			let titles = decision
				.candidates
				.iter()
				.map(|c| format!("\"{}\" ({})", c.title, c.url))
				.collect::<Vec<_>>()
				.join(", ");

			format!("Several documents may apply: {titles}. Review each to find the best fit.")
		},
	}
}

/// Keeps at most `max` sentences of `text`.
fn truncate_sentences(text: &str, max: usize) -> String {
	let mut end = text.len();

	for (count, (idx, sentence)) in text.split_sentence_bound_indices().enumerate() {
		if count == max {
			end = idx;

			break;
		}

		end = idx + sentence.len();
	}

	text[..end].trim().to_string()
}

fn char_prefix(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}

#[cfg(test)]
mod tests {
	use govly_domain::Candidate;

	use super::*;

	fn candidate(source_id: &str, title: &str) -> Candidate {
		Candidate {
			source_id: source_id.into(),
			title: title.into(),
			url: format!("https://example.gov/{source_id}"),
			content: "Hướng dẫn đăng ký doanh nghiệp.".into(),
			country: "VN".into(),
			agency: "none".into(),
			similarity: 0.9,
		}
	}

	fn decision(kind: DecisionKind, candidates: Vec<Candidate>) -> FilterDecision {
		FilterDecision { kind, category: None, candidates }
	}

	#[test]
	fn truncates_to_sentence_limit() {
		let text = "First. Second! Third? Fourth.";

		assert_eq!(truncate_sentences(text, 2), "First. Second!");
		assert_eq!(truncate_sentences(text, 10), text);
	}

	#[test]
	fn single_fallback_names_the_top_document() {
		let d = decision(
			DecisionKind::SingleRecommendation,
			vec![candidate("a", "Business registration decree")],
		);

		let text = fallback_response(&d);

		assert!(text.contains("Business registration decree"));
		assert!(text.contains("https://example.gov/a"));
	}

	#[test]
	fn multiple_fallback_lists_every_option() {
		let d = decision(
			DecisionKind::MultipleOptions,
			vec![candidate("a", "Decree A"), candidate("b", "Decree B")],
		);

		let text = fallback_response(&d);

		assert!(text.contains("Decree A"));
		assert!(text.contains("Decree B"));
	}

	#[test]
	fn prompt_numbers_documents_and_carries_the_question() {
		let ctx = QueryContext::build("how to register", "vn", "vi", "none", None, 3).unwrap();
		let d = decision(
			DecisionKind::MultipleOptions,
			vec![candidate("a", "Decree A"), candidate("b", "Decree B")],
		);
		let prompt = build_user_prompt(&ctx, &d, ComposerState::MultiFormSelection, 8);

		assert!(prompt.contains("1. Decree A"));
		assert!(prompt.contains("2. Decree B"));
		assert!(prompt.contains("Question: how to register"));
		assert!(prompt.contains("at most 8 sentences"));
	}

	#[test]
	fn link_queries_always_explain() {
		assert_eq!(
			ComposerState::select(SourceKind::Link, DecisionKind::SingleRecommendation),
			ComposerState::DocumentExplanation
		);
		assert_eq!(
			ComposerState::select(SourceKind::Form, DecisionKind::SingleRecommendation),
			ComposerState::SingleFormRecommendation
		);
		assert_eq!(
			ComposerState::select(SourceKind::Form, DecisionKind::MultipleOptions),
			ComposerState::MultiFormSelection
		);
	}

	#[test]
	fn system_prompt_carries_country_and_language() {
		let ctx = QueryContext::build("how to register", "vn", "vi", "none", None, 3).unwrap();
		let prompt = build_system_prompt(&ctx);

		assert!(prompt.contains("VN government services"));
		assert!(prompt.contains("\"vi\""));
	}

	#[test]
	fn excerpt_respects_char_boundaries() {
		let text = "đăng ký".repeat(300);

		assert_eq!(char_prefix(&text, 800).chars().count(), 800);
	}
}
