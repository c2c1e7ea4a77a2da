//! Autofill suggestions for an extracted schema.

use serde::Serialize;

use govly_domain::{AutofillSuggestion, FormSchema, KeywordMatcher, autofill};
use govly_storage::profiles;

use crate::{GovlyService, ServiceResult};

#[derive(Clone, Debug, Serialize)]
pub struct AutofillBlock {
	pub suggestions: Vec<AutofillSuggestion>,
	/// Fraction of fillable fields covered by the suggestions.
	pub completeness: f32,
}

impl GovlyService {
	/// Suggestions for `schema` from a stored profile, `None` when the user
	/// has no profile.
	pub(crate) async fn autofill_for(
		&self,
		user_id: &str,
		schema: &FormSchema,
	) -> ServiceResult<Option<AutofillBlock>> {
		let Some(profile) = profiles::get_profile(&self.db.pool, user_id).await? else {
			tracing::info!(user_id, "No profile stored, skipping autofill.");

			return Ok(None);
		};
		let suggestions = autofill::suggest(schema, &profile, &KeywordMatcher);
		let completeness = autofill::completeness(schema, &suggestions);

		Ok(Some(AutofillBlock { suggestions, completeness }))
	}
}
