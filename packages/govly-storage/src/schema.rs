pub fn render_schema() -> &'static str {
	include_str!("../../../sql/init.sql")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_contains_every_table() {
		let sql = render_schema();

		for table in ["source_chunks", "forms", "user_profiles"] {
			assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
		}
	}
}
