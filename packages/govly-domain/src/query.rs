//! Request-time query context.
//!
//! A [`QueryContext`] is built once per request from the raw user input and
//! carries everything the ranking and composition stages need: the cleaned
//! query text, a normalized country code, and lowercased keyword tokens.

use crate::Rejection;

/// Normalized view of a user query.
#[derive(Clone, Debug)]
pub struct QueryContext {
	/// Trimmed original query text.
	pub query: String,
	/// Uppercase ISO-style country code, already alias-resolved.
	pub country: String,
	/// Lowercase language tag the answer should be written in, `"en"` by
	/// default.
	pub language: String,
	/// Agency filter, `"none"` when the caller did not restrict it.
	pub agency: String,
	/// Optional category name forced by the caller.
	pub category_hint: Option<String>,
	/// Lowercased word tokens of the query.
	pub keywords: Vec<String>,
}
impl QueryContext {
	/// Validates the raw input and builds the context.
	///
	/// Rejects queries that are empty after trimming or shorter than
	/// `min_query_chars` counted in characters, not bytes.
	pub fn build(
		query: &str,
		country: &str,
		language: &str,
		agency: &str,
		category_hint: Option<String>,
		min_query_chars: usize,
	) -> Result<Self, Rejection> {
		let query = query.trim();

		if query.is_empty() {
			return Err(Rejection::EmptyQuery);
		}
		if query.chars().count() < min_query_chars {
			return Err(Rejection::QueryTooShort { min: min_query_chars });
		}

		let keywords =
			query.to_lowercase().split_whitespace().map(|w| w.to_owned()).collect::<Vec<_>>();

		Ok(Self {
			query: query.to_owned(),
			country: normalize_country(country),
			language: normalize_language(language),
			agency: normalize_agency(agency),
			category_hint: category_hint
				.map(|c| c.trim().to_lowercase())
				.filter(|c| !c.is_empty()),
			keywords,
		})
	}
}

/// Resolves common country spellings to a canonical uppercase code.
///
/// Unknown values pass through trimmed and uppercased so new corpora work
/// without a code change.
pub fn normalize_country(country: &str) -> String {
	let c = country.trim().to_lowercase();

	match c.as_str() {
		"" | "none" => "none".into(),
		"vietnam" | "viet nam" | "vn" => "VN".into(),
		"singapore" | "sg" => "SG".into(),
		"thailand" | "th" => "TH".into(),
		"indonesia" | "id" => "ID".into(),
		"malaysia" | "my" => "MY".into(),
		"philippines" | "ph" => "PH".into(),
		_ => c.to_uppercase(),
	}
}

fn normalize_language(language: &str) -> String {
	let l = language.trim().to_lowercase();

	if l.is_empty() || l == "none" { "en".into() } else { l }
}

fn normalize_agency(agency: &str) -> String {
	let a = agency.trim();

	if a.is_empty() || a.eq_ignore_ascii_case("none") { "none".into() } else { a.to_owned() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_context_with_normalized_country() {
		let ctx = QueryContext::build("register a business", "viet nam", "", "", None, 3).unwrap();

		assert_eq!(ctx.country, "VN");
		assert_eq!(ctx.language, "en");
		assert_eq!(ctx.agency, "none");
		assert_eq!(ctx.keywords, ["register", "a", "business"]);
	}

	#[test]
	fn rejects_blank_query() {
		assert!(matches!(
			QueryContext::build("   ", "vn", "vi", "none", None, 3),
			Err(Rejection::EmptyQuery)
		));
	}

	#[test]
	fn rejects_short_query_by_chars_not_bytes() {
		// Three characters, nine bytes. Must pass a three-character minimum.
		assert!(QueryContext::build("đăng", "vn", "vi", "none", None, 3).is_ok());
		assert!(matches!(
			QueryContext::build("ab", "vn", "vi", "none", None, 3),
			Err(Rejection::QueryTooShort { min: 3 })
		));
	}

	#[test]
	fn unknown_country_passes_through_uppercased() {
		assert_eq!(normalize_country(" brunei "), "BRUNEI");
		assert_eq!(normalize_country("none"), "none");
	}

	#[test]
	fn blank_category_hint_is_dropped() {
		let ctx =
			QueryContext::build("open a shop", "sg", "EN", "acra", Some("  ".into()), 3).unwrap();

		assert!(ctx.category_hint.is_none());
		assert_eq!(ctx.language, "en");
	}
}
