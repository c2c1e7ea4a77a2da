//! Word-window document chunking.
//!
//! Splits a document into fixed-size word windows with a fixed overlap so
//! that neighboring chunks share context. Windows are exact: chunk `i` starts
//! at word `i * (size - overlap)` and every chunk except possibly the last
//! holds exactly `size` words. Stripping the leading `overlap` words from
//! every chunk after the first reconstructs the original word sequence.

/// One chunk of a source document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Chunk {
	/// Zero-based position of this chunk within its document.
	pub index: usize,
	/// Chunk text, words joined by a single space.
	pub text: String,
	pub word_count: usize,
	/// blake3 hash of the chunk text, hex encoded.
	pub content_hash: String,
}

/// Splits `text` into overlapping word windows.
///
/// # Panics
///
/// Panics when `overlap >= size` or `size == 0`; both are rejected by config
/// validation long before this is reached.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
	assert!(size > 0, "chunk size must be positive");
	assert!(overlap < size, "overlap must be smaller than chunk size");

	let words = text.split_whitespace().collect::<Vec<_>>();

	if words.is_empty() {
		return Vec::new();
	}

	let step = size - overlap;
	let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
	let mut start = 0;
	let mut index = 0;

	while start < words.len() {
		let end = (start + size).min(words.len());
		let text = words[start..end].join(" ");
		let content_hash = blake3::hash(text.as_bytes()).to_hex().to_string();

		chunks.push(Chunk { index, text, word_count: end - start, content_hash });

		if end == words.len() {
			break;
		}

		start += step;
		index += 1;
	}

	chunks
}

#[cfg(test)]
mod tests {
	use super::*;

	fn numbered_words(n: usize) -> String {
		(0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
	}

	#[test]
	fn short_text_is_one_chunk() {
		let chunks = chunk("a b c", 10, 2);

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].text, "a b c");
		assert_eq!(chunks[0].word_count, 3);
	}

	#[test]
	fn empty_text_yields_no_chunks() {
		assert!(chunk("   \n\t ", 10, 2).is_empty());
	}

	#[test]
	fn windows_are_exact_size_with_exact_overlap() {
		let text = numbered_words(25);
		let chunks = chunk(&text, 10, 3);

		assert_eq!(chunks.len(), 4);

		for c in &chunks[..3] {
			assert_eq!(c.word_count, 10);
		}

		// Each chunk after the first repeats the previous chunk's tail.
		for pair in chunks.windows(2) {
			let prev = pair[0].text.split(' ').collect::<Vec<_>>();
			let next = pair[1].text.split(' ').collect::<Vec<_>>();

			assert_eq!(prev[prev.len() - 3..], next[..3]);
		}
	}

	#[test]
	fn stripping_overlaps_reconstructs_the_document() {
		let text = numbered_words(137);
		let chunks = chunk(&text, 30, 7);
		let mut rebuilt = Vec::new();

		for c in &chunks {
			let words = c.text.split(' ').collect::<Vec<_>>();
			let skip = if c.index == 0 { 0 } else { 7 };

			rebuilt.extend(words[skip..].iter().map(|w| (*w).to_owned()));
		}

		assert_eq!(rebuilt.join(" "), text);
	}

	#[test]
	fn indices_are_contiguous_from_zero() {
		let chunks = chunk(&numbered_words(100), 20, 5);

		for (i, c) in chunks.iter().enumerate() {
			assert_eq!(c.index, i);
		}
	}

	#[test]
	fn hash_depends_only_on_chunk_text() {
		let a = chunk("alpha beta gamma", 10, 2);
		let b = chunk("alpha  beta\ngamma", 10, 2);

		assert_eq!(a[0].content_hash, b[0].content_hash);
	}
}
