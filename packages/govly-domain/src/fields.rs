//! Form field model and OCR-text field inference.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Input widget kind a field renders as.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
	Text,
	Date,
	Checkbox,
	Signature,
}

/// How much the extracted schema can be trusted.
///
/// Ordered so that a worse schema never overwrites a better one.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
	Low,
	Medium,
	High,
}

/// Which stage of the extraction chain produced a schema.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
	/// Served from the stored schema of an earlier extraction.
	Cached,
	/// Recovered from OCR text of the document.
	Ocr,
	/// Nothing usable was found, a placeholder schema explains why.
	Diagnostic,
}

/// One fillable field of a form.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FormField {
	/// Normalized machine name, e.g. `ho_ten`.
	pub name: String,
	/// Human label as printed on the form.
	pub label: String,
	pub field_type: FieldType,
	pub required: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Trust in this field, inherited from the stage that recovered it.
	pub confidence: Confidence,
}

/// Extracted schema of a form.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FormSchema {
	pub fields: Vec<FormField>,
	pub confidence: Confidence,
}
impl FormSchema {
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

/// Normalizes a printed label into a machine field name.
///
/// Diacritics are stripped, everything non-alphanumeric collapses into a
/// single underscore, and the result is lowercased. `Họ và tên` becomes
/// `ho_va_ten`.
pub fn normalize_field_name(label: &str) -> String {
	let stripped = label
		.nfkd()
		.filter(|c| !is_combining_mark(*c))
		.map(|c| match c {
			'đ' => 'd',
			'Đ' => 'D',
			_ => c,
		})
		.collect::<String>();
	let mut name = String::with_capacity(stripped.len());
	let mut last_was_sep = true;

	for c in stripped.to_lowercase().chars() {
		if c.is_ascii_alphanumeric() {
			name.push(c);
			last_was_sep = false;
		} else if !last_was_sep {
			name.push('_');
			last_was_sep = true;
		}
	}
	while name.ends_with('_') {
		name.pop();
	}

	name
}

/// Guesses a field type from its printed label.
///
/// Vietnamese forms dominate the corpus, so the keyword tables carry both
/// Vietnamese and English markers. Anything unrecognized is a text field.
pub fn infer_field_type(label: &str) -> FieldType {
	let l = label.to_lowercase();

	const SIGNATURE: &[&str] = &["ký tên", "chữ ký", "ky ten", "chu ky", "signature", "sign here"];
	const DATE: &[&str] = &["ngày", "ngay", "tháng", "thang", "năm", "nam sinh", "date", "dd/mm"];
	const CHECKBOX: &[&str] = &["đánh dấu", "danh dau", "chọn một", "tick", "checkbox", "check one"];

	if SIGNATURE.iter().any(|k| l.contains(k)) {
		FieldType::Signature
	} else if DATE.iter().any(|k| l.contains(k)) {
		FieldType::Date
	} else if CHECKBOX.iter().any(|k| l.contains(k)) {
		FieldType::Checkbox
	} else {
		FieldType::Text
	}
}

/// Recovers a field schema from flat OCR text.
///
/// Scans line by line for label patterns, a trailing colon or a run of fill-in
/// underscores or dots, and keeps lines that mention a known field keyword.
/// Duplicate names are dropped, first occurrence wins.
pub fn infer_fields(text: &str) -> FormSchema {
	// Matches "Label: ......" and "Label ________" style lines.
	static LABEL_LINE: LazyLock<Regex> =
		LazyLock::new(|| Regex::new(r"^(?P<label>[^:_.]{2,80}?)\s*(?::|_{3,}|\.{4,})").unwrap());

	let mut fields = Vec::new();
	let mut seen = Vec::new();

	for line in text.lines() {
		let line = line.trim();

		if line.is_empty() || line.len() > 160 {
			continue;
		}

		let Some(caps) = LABEL_LINE.captures(line) else { continue };
		let label = caps["label"].trim().trim_end_matches(['(', '[']).trim();

		if label.is_empty() || !mentions_field_keyword(label) {
			continue;
		}

		let name = normalize_field_name(label);

		if name.is_empty() || seen.contains(&name) {
			continue;
		}

		seen.push(name.clone());
		fields.push(FormField {
			name,
			label: label.to_owned(),
			field_type: infer_field_type(label),
			required: false,
			description: None,
			confidence: Confidence::Medium,
		});
	}

	FormSchema { fields, confidence: Confidence::Medium }
}

fn mentions_field_keyword(label: &str) -> bool {
	const KEYWORDS: &[&str] = &[
		"họ", "tên", "ho ten", "địa chỉ", "dia chi", "ngày", "ngay", "số", "so cmnd", "cccd",
		"điện thoại", "dien thoai", "email", "ký", "chữ ký", "quốc tịch", "nghề nghiệp",
		"name", "address", "date", "phone", "telephone", "nationality", "occupation",
		"signature", "id number", "passport",
	];
	let l = label.to_lowercase();

	KEYWORDS.iter().any(|k| l.contains(k))
}

/// Placeholder schema for documents no stage could read.
///
/// A small fixed set of generic fields so a caller can always render
/// something, plus a note carrying the reason manual entry is needed.
pub fn diagnostic_schema(reason: &str) -> FormSchema {
	let generic = |name: &str, label: &str, field_type| FormField {
		name: name.to_owned(),
		label: label.to_owned(),
		field_type,
		required: false,
		description: None,
		confidence: Confidence::Low,
	};

	FormSchema {
		fields: vec![
			generic("full_name", "Full name", FieldType::Text),
			generic("date", "Date", FieldType::Date),
			generic("signature", "Signature", FieldType::Signature),
			FormField {
				name: "manual_entry".into(),
				label: "Manual entry".into(),
				field_type: FieldType::Text,
				required: false,
				description: Some(reason.to_owned()),
				confidence: Confidence::Low,
			},
		],
		confidence: Confidence::Low,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_vietnamese_labels() {
		assert_eq!(normalize_field_name("Họ và tên"), "ho_va_ten");
		assert_eq!(normalize_field_name("Số CMND/CCCD:"), "so_cmnd_cccd");
		assert_eq!(normalize_field_name("  Địa chỉ thường trú  "), "dia_chi_thuong_tru");
	}

	#[test]
	fn infers_types_from_labels() {
		assert_eq!(infer_field_type("Ngày sinh"), FieldType::Date);
		assert_eq!(infer_field_type("Chữ ký người khai"), FieldType::Signature);
		assert_eq!(infer_field_type("Đánh dấu vào ô phù hợp"), FieldType::Checkbox);
		assert_eq!(infer_field_type("Họ và tên"), FieldType::Text);
	}

	#[test]
	fn confidence_orders_low_to_high() {
		assert!(Confidence::Low < Confidence::Medium);
		assert!(Confidence::Medium < Confidence::High);
	}

	#[test]
	fn infers_fields_from_ocr_text() {
		let text = "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM\n\
			Họ và tên: ...............\n\
			Ngày sinh: ____________\n\
			Địa chỉ thường trú: ...............\n\
			Mục này không phải trường\n\
			Chữ ký người khai: ____________\n";
		let schema = infer_fields(text);
		let names = schema.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();

		assert_eq!(names, ["ho_va_ten", "ngay_sinh", "dia_chi_thuong_tru", "chu_ky_nguoi_khai"]);
		assert_eq!(schema.fields[1].field_type, FieldType::Date);
		assert_eq!(schema.fields[3].field_type, FieldType::Signature);
		assert_eq!(schema.confidence, Confidence::Medium);
	}

	#[test]
	fn duplicate_labels_keep_first_occurrence() {
		let schema = infer_fields("Họ và tên: ....\nHọ và tên: ....\n");

		assert_eq!(schema.fields.len(), 1);
	}

	#[test]
	fn diagnostic_schema_is_low_confidence() {
		let schema = diagnostic_schema("No text layer and OCR returned nothing.");
		let names = schema.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();

		assert_eq!(schema.confidence, Confidence::Low);
		assert_eq!(names, ["full_name", "date", "signature", "manual_entry"]);
		assert_eq!(
			schema.fields[3].description.as_deref(),
			Some("No text layer and OCR returned nothing.")
		);
	}
}
