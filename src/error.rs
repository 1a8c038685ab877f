//! Failure values for binding resolution and container configuration

use std::fmt;

/// Result alias used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;

/// Ordered list of token labels visited during a resolution, rendered as
/// `A -> B -> C` in error messages.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath(Vec<String>);

impl ResolutionPath {
	pub fn new(segments: Vec<String>) -> Self {
		Self(segments)
	}

	pub fn segments(&self) -> &[String] {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for ResolutionPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.is_empty() {
			write!(f, "(top level)")
		} else {
			write!(f, "{}", self.0.join(" -> "))
		}
	}
}

fn format_dispose_failures(failures: &[(String, String)]) -> String {
	failures
		.iter()
		.map(|(token, error)| format!("  {token}: {error}"))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Errors raised by resolution, autowiring, building and disposal.
///
/// Every message carries concrete identifiers (token label, constructor
/// name, parameter name) and, where applicable, the full dependency path, so
/// wiring failures are diagnosable without a debugger.
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	/// No binding exists for the token anywhere in the container chain.
	#[error(
		"no binding found for {token}\n  Path: {path}\nRegister the token on this container or an ancestor before resolving it."
	)]
	BindingNotFound {
		/// Debug label of the unresolved token
		token: String,
		/// Tokens visited before the failure
		path: ResolutionPath,
	},

	/// A token was encountered a second time while already being resolved
	/// within the same resolve call tree.
	#[error(
		"circular dependency detected\n  Path: {path}\nThis forms a cycle that cannot be resolved."
	)]
	CircularDependency {
		/// Full cycle, with the repeated token at both ends
		path: ResolutionPath,
	},

	/// A strict autowire strategy could not satisfy a constructor parameter.
	#[error(
		"autowiring {constructor} could not satisfy parameter `{parameter}`\n  Attempted: {}",
		.attempted.join(", ")
	)]
	AutowireConfiguration {
		/// Constructor being autowired
		constructor: String,
		/// Parameter that could not be satisfied
		parameter: String,
		/// Conventions or keys that were tried, in order
		attempted: Vec<String>,
	},

	/// A deliberately unimplemented autowire strategy was requested.
	#[error("autowire strategy `{strategy}` is not supported: {reason}")]
	UnsupportedStrategy {
		strategy: &'static str,
		reason: &'static str,
	},

	/// `resolve` reached a binding that produces its value asynchronously.
	#[error("{token} is bound to an async factory; use `resolve_async` instead of `resolve`")]
	SyncAsyncMismatch {
		/// Debug label of the offending token
		token: String,
	},

	/// The value produced for a token does not have the requested type.
	#[error("{token} resolved to a value of a different type than the requested `{expected}`")]
	TypeMismatch {
		/// Debug label of the token (or argument slot) involved
		token: String,
		/// Type name the caller asked for
		expected: &'static str,
	},

	/// A constructor argument slot was left unwired but accessed as required.
	#[error(
		"constructor argument {index} was not wired; supply an autowire entry for it or read it with `opt`"
	)]
	MissingArgument { index: usize },

	/// The container was disposed; resolutions against it are permanently
	/// invalid.
	#[error("container has been disposed and can no longer resolve")]
	ContainerDisposed,

	/// One or more singleton dispose hooks failed during teardown. Every
	/// instance still received a disposal attempt.
	#[error(
		"disposal completed with {} failure(s):\n{}",
		.failures.len(),
		format_dispose_failures(.failures)
	)]
	DisposeFailed {
		/// `(token label, error message)` per failed instance, in disposal
		/// order
		failures: Vec<(String, String)>,
	},

	/// Failure produced by user code inside a factory or constructor.
	#[error("{0}")]
	Factory(String),
}

impl DiError {
	/// Wraps a user-supplied message as a factory failure.
	pub fn factory(message: impl Into<String>) -> Self {
		Self::Factory(message.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn path_renders_arrow_chain() {
		let path = ResolutionPath::new(vec!["A".into(), "B".into(), "A".into()]);
		assert_eq!(path.to_string(), "A -> B -> A");
	}

	#[test]
	fn empty_path_renders_top_level() {
		assert_eq!(ResolutionPath::default().to_string(), "(top level)");
	}

	#[test]
	fn dispose_failed_lists_every_failure() {
		let err = DiError::DisposeFailed {
			failures: vec![
				("Token#1(db)".into(), "flush failed".into()),
				("Token#2(cache)".into(), "timeout".into()),
			],
		};
		let message = err.to_string();
		assert!(message.contains("2 failure(s)"));
		assert!(message.contains("Token#1(db): flush failed"));
		assert!(message.contains("Token#2(cache): timeout"));
	}
}
