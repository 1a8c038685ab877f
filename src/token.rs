//! Tokens identifying bindable dependency slots

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide token id source. Monotonic, never reset.
static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Numeric identity of a token.
///
/// Ids are unique for the lifetime of the process; two tokens created with
/// identical descriptions still receive distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

impl TokenId {
	fn next() -> Self {
		Self(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the underlying numeric value.
	pub fn value(self) -> u64 {
		self.0
	}
}

impl fmt::Display for TokenId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Type-erased token.
///
/// This is the form the container stores in its maps and side tables.
/// Equality and hashing use the id only, never the description.
#[derive(Debug, Clone)]
pub struct RawToken {
	id: TokenId,
	description: Option<Arc<str>>,
}

impl RawToken {
	pub(crate) fn mint(description: Option<&str>) -> Self {
		Self {
			id: TokenId::next(),
			description: description.map(Arc::from),
		}
	}

	/// Returns the token's unique id.
	pub fn id(&self) -> TokenId {
		self.id
	}

	/// Returns the human-readable description, if one was supplied.
	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}
}

impl PartialEq for RawToken {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for RawToken {}

impl Hash for RawToken {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Display for RawToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.description {
			Some(desc) => write!(f, "Token#{}({})", self.id, desc),
			None => write!(f, "Token#{}", self.id),
		}
	}
}

/// Typed token identifying a bindable dependency slot.
///
/// The type parameter exists only at compile time; at runtime a token is its
/// unique id plus an optional debug description. Two tokens never compare
/// equal unless they originate from the same creation call.
///
/// # Examples
///
/// ```
/// use wirebox::Token;
///
/// struct Config;
///
/// let a = Token::<Config>::new("config");
/// let b = Token::<Config>::new("config");
/// assert_ne!(a, b); // identical descriptions, distinct identities
/// ```
pub struct Token<T> {
	raw: RawToken,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Token<T> {
	/// Creates a token with a human-readable description.
	pub fn new(description: &str) -> Self {
		Self {
			raw: RawToken::mint(Some(description)),
			_marker: PhantomData,
		}
	}

	/// Creates a token without a description; the debug label falls back to
	/// the numeric id.
	pub fn anonymous() -> Self {
		Self {
			raw: RawToken::mint(None),
			_marker: PhantomData,
		}
	}

	/// Returns the type-erased form of this token.
	pub fn raw(&self) -> &RawToken {
		&self.raw
	}

	/// Returns the token's unique id.
	pub fn id(&self) -> TokenId {
		self.raw.id
	}

	/// Returns the human-readable description, if one was supplied.
	pub fn description(&self) -> Option<&str> {
		self.raw.description()
	}
}

impl<T> Clone for Token<T> {
	fn clone(&self) -> Self {
		Self {
			raw: self.raw.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> PartialEq for Token<T> {
	fn eq(&self, other: &Self) -> bool {
		self.raw == other.raw
	}
}

impl<T> Eq for Token<T> {}

impl<T> Hash for Token<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.raw.hash(state);
	}
}

impl<T> fmt::Debug for Token<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.raw)
	}
}

impl<T> fmt::Display for Token<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.raw)
	}
}

/// Creates a token for a dependency slot.
///
/// Every call yields a globally unique token, even with identical
/// descriptions.
pub fn create_token<T>(description: Option<&str>) -> Token<T> {
	match description {
		Some(desc) => Token::new(desc),
		None => Token::anonymous(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Marker;

	#[test]
	fn tokens_are_unique_per_call() {
		let a = Token::<Marker>::new("same");
		let b = Token::<Marker>::new("same");
		assert_ne!(a.id(), b.id());
		assert_ne!(a, b);
	}

	#[test]
	fn display_includes_description() {
		let t = Token::<Marker>::new("database");
		let label = t.to_string();
		assert!(label.starts_with("Token#"));
		assert!(label.contains("database"));
	}

	#[test]
	fn anonymous_display_is_numeric() {
		let t = Token::<Marker>::anonymous();
		assert_eq!(t.to_string(), format!("Token#{}", t.id()));
	}

	#[test]
	fn equality_ignores_description() {
		let t = Token::<Marker>::new("a");
		let same = t.clone();
		assert_eq!(t, same);
	}
}
