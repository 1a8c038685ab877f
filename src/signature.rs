//! Constructor metadata and parameter-name extraction
//!
//! Name-convention autowiring needs the declared parameter names of a
//! constructor. Callers either list them explicitly or hand over the
//! signature text (`"logger: Logger, retries: usize = 3"`), from which the
//! names are extracted: default-value expressions and type annotations are
//! stripped, leading binding modifiers are dropped, and destructured
//! parameters yield `None` since no stable name exists for them. Extraction
//! results are cached process-wide, keyed by the signature text.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

static PARSE_CACHE: Lazy<RwLock<HashMap<String, Arc<Vec<Option<String>>>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Declared shape of a constructor: its name plus ordered parameter slots.
///
/// A slot is `None` when no stable name could be extracted for it
/// (destructured patterns). The autowire dispatcher treats such slots as
/// unwireable.
///
/// # Examples
///
/// ```
/// use wirebox::ConstructorMeta;
///
/// let meta = ConstructorMeta::from_signature("EventBus", "logger: Logger, retries: usize = 3");
/// assert_eq!(meta.name(), "EventBus");
/// assert_eq!(meta.params().len(), 2);
/// assert_eq!(meta.params()[0].as_deref(), Some("logger"));
/// assert_eq!(meta.params()[1].as_deref(), Some("retries"));
/// ```
#[derive(Debug, Clone)]
pub struct ConstructorMeta {
	name: String,
	params: Arc<Vec<Option<String>>>,
}

impl ConstructorMeta {
	/// Metadata with explicitly listed parameter names.
	pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
		Self {
			name: name.into(),
			params: Arc::new(params.iter().map(|p| Some((*p).to_string())).collect()),
		}
	}

	/// Metadata for a constructor that takes no parameters.
	pub fn parameterless(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			params: Arc::new(Vec::new()),
		}
	}

	/// Metadata extracted from signature text, using the process-wide cache.
	pub fn from_signature(name: impl Into<String>, signature: &str) -> Self {
		Self {
			name: name.into(),
			params: parameter_names(signature),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Ordered parameter slots; `None` where no stable name exists.
	pub fn params(&self) -> &[Option<String>] {
		&self.params
	}

	pub fn arity(&self) -> usize {
		self.params.len()
	}
}

/// Cached parameter-name extraction for a signature string.
pub(crate) fn parameter_names(signature: &str) -> Arc<Vec<Option<String>>> {
	{
		let cache = PARSE_CACHE
			.read()
			.unwrap_or_else(PoisonError::into_inner);
		if let Some(hit) = cache.get(signature) {
			return hit.clone();
		}
	}
	let parsed = Arc::new(parse(signature));
	let mut cache = PARSE_CACHE
		.write()
		.unwrap_or_else(PoisonError::into_inner);
	cache
		.entry(signature.to_string())
		.or_insert(parsed)
		.clone()
}

fn parse(signature: &str) -> Vec<Option<String>> {
	split_top_level(signature)
		.into_iter()
		.filter(|segment| !segment.trim().is_empty())
		.map(|segment| extract_name(&segment))
		.collect()
}

/// Splits on commas that sit outside any bracket nesting.
fn split_top_level(signature: &str) -> Vec<String> {
	let mut segments = Vec::new();
	let mut current = String::new();
	let mut depth = 0i32;
	for ch in signature.chars() {
		match ch {
			'(' | '[' | '{' | '<' => depth += 1,
			')' | ']' | '}' | '>' => depth -= 1,
			',' if depth == 0 => {
				segments.push(std::mem::take(&mut current));
				continue;
			}
			_ => {}
		}
		current.push(ch);
	}
	segments.push(current);
	segments
}

fn extract_name(segment: &str) -> Option<String> {
	// Default value first, then annotation: `x: u32 = 3` keeps `x: u32`,
	// then `x`.
	let without_default = cut_top_level(segment, '=');
	let without_annotation = cut_top_level(without_default, ':');

	let mut name = without_annotation.trim();
	loop {
		let stripped = name
			.strip_prefix("mut ")
			.or_else(|| name.strip_prefix("ref "))
			.map(str::trim_start);
		match stripped {
			Some(rest) => name = rest,
			None => break,
		}
	}

	// Destructured patterns have no stable single name.
	if name.starts_with('(') || name.starts_with('[') || name.starts_with('{') {
		return None;
	}
	if is_identifier(name) {
		Some(name.to_string())
	} else {
		None
	}
}

/// Returns the part of `segment` before the first top-level occurrence of
/// `delimiter`.
fn cut_top_level(segment: &str, delimiter: char) -> &str {
	let mut depth = 0i32;
	for (idx, ch) in segment.char_indices() {
		match ch {
			'(' | '[' | '{' | '<' => depth += 1,
			')' | ']' | '}' | '>' => depth -= 1,
			c if c == delimiter && depth == 0 => return &segment[..idx],
			_ => {}
		}
	}
	segment
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) if first.is_alphabetic() || first == '_' => {}
		_ => return false,
	}
	chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("logger", &[Some("logger")])]
	#[case("logger: Logger", &[Some("logger")])]
	#[case("logger: Logger, bus: EventBus", &[Some("logger"), Some("bus")])]
	#[case("retries: usize = 3", &[Some("retries")])]
	#[case("mut counter: u64", &[Some("counter")])]
	#[case("ref shared: Arc<Config>", &[Some("shared")])]
	#[case("map: HashMap<String, u32>, next", &[Some("map"), Some("next")])]
	#[case("(a, b): (u8, u8), tail: u8", &[None, Some("tail")])]
	#[case("", &[])]
	fn extracts_parameter_names(#[case] signature: &str, #[case] expected: &[Option<&str>]) {
		let parsed = parse(signature);
		let expected: Vec<Option<String>> = expected
			.iter()
			.map(|o| o.map(|s| s.to_string()))
			.collect();
		assert_eq!(parsed, expected);
	}

	#[test]
	fn default_expressions_with_commas_do_not_split() {
		let parsed = parse("size: usize = max(1, 2), name: String");
		assert_eq!(
			parsed,
			vec![Some("size".to_string()), Some("name".to_string())]
		);
	}

	#[test]
	fn cache_returns_the_same_parse() {
		let a = parameter_names("cached_param: Thing");
		let b = parameter_names("cached_param: Thing");
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn meta_from_signature_reports_arity() {
		let meta = ConstructorMeta::from_signature("Svc", "a: A, b: B, c: C");
		assert_eq!(meta.arity(), 3);
	}
}
