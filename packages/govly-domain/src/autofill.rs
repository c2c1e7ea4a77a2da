//! Profile-based autofill suggestions.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldType, FormField, FormSchema};

/// Stored user attributes a form can be prefilled from.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UserProfile {
	pub full_name: Option<String>,
	pub email: Option<String>,
	pub phone_number: Option<String>,
	pub address: Option<String>,
	pub id_number: Option<String>,
	pub date_of_birth: Option<String>,
	pub gender: Option<String>,
	pub nationality: Option<String>,
	pub occupation: Option<String>,
}

/// How a suggestion was derived.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
	/// The normalized field name hit the canonical dictionary.
	Exact,
	/// A keyword in the field name pointed at a profile attribute.
	Keyword,
}

/// One prefill proposal for a schema field.
#[derive(Clone, Debug, Serialize)]
pub struct AutofillSuggestion {
	pub field_name: String,
	pub value: String,
	pub matched_by: MatchKind,
}

/// Maps schema fields to profile attributes.
///
/// Seam for swapping the matching strategy without touching the service.
pub trait FieldMatcher {
	fn match_field(&self, field: &FormField, profile: &UserProfile) -> Option<AutofillSuggestion>;
}

/// Dictionary-then-keyword matcher.
///
/// Tries the canonical name dictionary first, then falls back to substring
/// keywords. Signature fields are never matched, they need a human.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordMatcher;
impl KeywordMatcher {
	fn exact(name: &str, profile: &UserProfile) -> Option<String> {
		match name {
			"ho_va_ten" | "ho_ten" | "full_name" | "name" | "applicant_name" =>
				profile.full_name.clone(),
			"ngay_sinh" | "date_of_birth" | "dob" => profile.date_of_birth.clone(),
			"so_cmnd" | "so_cmnd_cccd" | "cccd" | "national_id" | "id_number" =>
				profile.id_number.clone(),
			"dia_chi" | "dia_chi_thuong_tru" | "address" => profile.address.clone(),
			"so_dien_thoai" | "dien_thoai" | "phone" | "phone_number" | "telephone" =>
				profile.phone_number.clone(),
			"email" | "thu_dien_tu" => profile.email.clone(),
			"gioi_tinh" | "gender" | "sex" => profile.gender.clone(),
			"quoc_tich" | "nationality" => profile.nationality.clone(),
			"nghe_nghiep" | "occupation" => profile.occupation.clone(),
			_ => None,
		}
	}

	fn keyword(name: &str, profile: &UserProfile) -> Option<String> {
		const TABLE: &[(&[&str], fn(&UserProfile) -> Option<String>)] = &[
			(&["ten", "name", "applicant", "owner"], |p| p.full_name.clone()),
			(&["sinh", "birth", "dob"], |p| p.date_of_birth.clone()),
			(&["cmnd", "cccd", "passport", "id_number"], |p| p.id_number.clone()),
			(&["dia_chi", "address", "tru_so"], |p| p.address.clone()),
			(&["dien_thoai", "phone", "contact"], |p| p.phone_number.clone()),
			(&["email", "mail"], |p| p.email.clone()),
			(&["gioi_tinh", "gender"], |p| p.gender.clone()),
			(&["quoc_tich", "nationality"], |p| p.nationality.clone()),
			(&["nghe_nghiep", "occupation", "job"], |p| p.occupation.clone()),
		];

		TABLE
			.iter()
			.find(|(keywords, _)| keywords.iter().any(|k| name.contains(k)))
			.and_then(|(_, pick)| pick(profile))
	}
}
impl FieldMatcher for KeywordMatcher {
	fn match_field(&self, field: &FormField, profile: &UserProfile) -> Option<AutofillSuggestion> {
		if field.field_type == FieldType::Signature {
			return None;
		}
		if let Some(value) = Self::exact(&field.name, profile) {
			return Some(AutofillSuggestion {
				field_name: field.name.clone(),
				value,
				matched_by: MatchKind::Exact,
			});
		}

		Self::keyword(&field.name, profile).map(|value| AutofillSuggestion {
			field_name: field.name.clone(),
			value,
			matched_by: MatchKind::Keyword,
		})
	}
}

/// Runs `matcher` over every schema field.
pub fn suggest<M>(schema: &FormSchema, profile: &UserProfile, matcher: &M) -> Vec<AutofillSuggestion>
where
	M: FieldMatcher,
{
	schema.fields.iter().filter_map(|f| matcher.match_field(f, profile)).collect()
}

/// Fraction of schema fields that received a suggestion.
///
/// Counted over every field, so a form with a signature block never reaches
/// `1.0`. Returns `0.0` for an empty schema.
pub fn completeness(schema: &FormSchema, suggestions: &[AutofillSuggestion]) -> f32 {
	if schema.fields.is_empty() {
		return 0.;
	}

	suggestions.len() as f32 / schema.fields.len() as f32
}
