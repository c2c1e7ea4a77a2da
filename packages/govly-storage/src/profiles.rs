use serde_json::Value;
use sqlx::PgExecutor;

use govly_domain::UserProfile;

use crate::Result;

pub async fn get_profile<'e, E>(executor: E, user_id: &str) -> Result<Option<UserProfile>>
where
	E: PgExecutor<'e>,
{
	let row: Option<(Value,)> =
		sqlx::query_as("SELECT profile FROM user_profiles WHERE user_id = $1 LIMIT 1")
			.bind(user_id)
			.fetch_optional(executor)
			.await?;
	let Some((profile,)) = row else {
		return Ok(None);
	};

	Ok(Some(serde_json::from_value(profile)?))
}
