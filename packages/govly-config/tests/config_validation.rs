use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use govly_config::Error;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn render(value: &Value) -> String {
	toml::to_string(value).expect("Failed to render sample config.")
}

fn set_path(value: &mut Value, path: &[&str], new: Value) {
	let mut current = value;

	for key in &path[..path.len() - 1] {
		current = current
			.as_table_mut()
			.and_then(|table| table.get_mut(*key))
			.expect("Sample config must contain the mutated section.");
	}

	current
		.as_table_mut()
		.expect("Mutated section must be a table.")
		.insert(path[path.len() - 1].to_string(), new);
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("govly_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn expect_validation_error(payload: String, needle: &str) {
	let path = write_temp_config(payload);
	let result = govly_config::load(&path);

	fs::remove_file(&path).ok();

	match result {
		Err(Error::Validation { message }) => {
			assert!(
				message.contains(needle),
				"Expected validation message containing {needle:?}, got {message:?}."
			);
		},
		Err(other) => panic!("Expected a validation error, got {other:?}."),
		Ok(_) => panic!("Expected a validation error, got a valid config."),
	}
}

#[test]
fn loads_sample_config() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let cfg = govly_config::load(&path).expect("Sample config must load.");

	fs::remove_file(&path).ok();

	assert_eq!(cfg.retrieval.max_options, 2);
	assert_eq!(cfg.retrieval.candidate_k, 10);
	assert!((cfg.retrieval.duplicate_epsilon - 0.05).abs() < f32::EPSILON);
	assert_eq!(cfg.chunking.chunk_words, 1_200);
	assert_eq!(cfg.chunking.overlap_words, 150);
	assert_eq!(cfg.retrieval.categories.len(), 2);
}

#[test]
fn normalizes_category_keywords() {
	let mut value = sample_value();

	set_path(
		&mut value,
		&["retrieval", "categories"],
		Value::Array(vec![Value::Table(
			[
				("name".to_string(), Value::String("  Housing ".to_string())),
				(
					"query_keywords".to_string(),
					Value::Array(vec![Value::String(" Rent ".to_string())]),
				),
				(
					"candidate_keywords".to_string(),
					Value::Array(vec![Value::String("HOUSING".to_string())]),
				),
			]
			.into_iter()
			.collect(),
		)]),
	);

	let path = write_temp_config(render(&value));
	let cfg = govly_config::load(&path).expect("Config with categories must load.");

	fs::remove_file(&path).ok();

	assert_eq!(cfg.retrieval.categories[0].name, "housing");
	assert_eq!(cfg.retrieval.categories[0].query_keywords, vec!["rent".to_string()]);
	assert_eq!(cfg.retrieval.categories[0].candidate_keywords, vec!["housing".to_string()]);
}

#[test]
fn rejects_dimension_mismatch() {
	let mut value = sample_value();

	set_path(&mut value, &["providers", "embedding", "dimensions"], Value::Integer(768));

	expect_validation_error(render(&value), "must match storage.qdrant.vector_dim");
}

#[test]
fn rejects_zero_duplicate_epsilon() {
	let mut value = sample_value();

	set_path(&mut value, &["retrieval", "duplicate_epsilon"], Value::Float(0.0));

	expect_validation_error(render(&value), "retrieval.duplicate_epsilon");
}

#[test]
fn rejects_zero_max_options() {
	let mut value = sample_value();

	set_path(&mut value, &["retrieval", "max_options"], Value::Integer(0));

	expect_validation_error(render(&value), "retrieval.max_options");
}

#[test]
fn rejects_overlap_not_less_than_chunk() {
	let mut value = sample_value();

	set_path(&mut value, &["chunking", "overlap_words"], Value::Integer(1_200));

	expect_validation_error(render(&value), "chunking.overlap_words");
}

#[test]
fn rejects_candidate_k_below_max_options() {
	let mut value = sample_value();

	set_path(&mut value, &["retrieval", "candidate_k"], Value::Integer(1));

	expect_validation_error(render(&value), "retrieval.candidate_k");
}

#[test]
fn rejects_empty_provider_api_key() {
	let mut value = sample_value();

	set_path(&mut value, &["providers", "generation", "api_key"], Value::String("  ".to_string()));

	expect_validation_error(render(&value), "Provider generation api_key");
}

#[test]
fn rejects_category_rule_without_candidate_keywords() {
	let mut value = sample_value();

	set_path(
		&mut value,
		&["retrieval", "categories"],
		Value::Array(vec![Value::Table(
			[
				("name".to_string(), Value::String("housing".to_string())),
				(
					"query_keywords".to_string(),
					Value::Array(vec![Value::String("rent".to_string())]),
				),
				("candidate_keywords".to_string(), Value::Array(Vec::new())),
			]
			.into_iter()
			.collect(),
		)]),
	);

	expect_validation_error(render(&value), "Category rule housing");
}
