//! Compiled binding records: how a value is produced for a token

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::autowire::{AutowireOptions, ResolvedArgs};
use crate::container::Resolver;
use crate::dispose::DisposeHook;
use crate::error::DiResult;
use crate::signature::ConstructorMeta;
use crate::token::RawToken;

/// Shared, type-erased service value. The container's caches all trade in
/// this currency; typed access happens by downcasting at the API boundary.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type SyncFactoryFn = Arc<dyn Fn(&Resolver) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type AsyncFactoryFn =
	Arc<dyn Fn(Resolver) -> BoxFuture<'static, DiResult<AnyArc>> + Send + Sync>;
pub(crate) type ConstructFn = Arc<dyn Fn(ResolvedArgs) -> DiResult<AnyArc> + Send + Sync>;

/// Instance reuse policy for a binding.
///
/// - `Singleton`: one instance per owning container, cached on first
///   resolution and reused until disposal.
/// - `Transient`: a fresh instance on every resolution, never cached.
/// - `PerRequest`: one instance per top-level resolve call tree; all branches
///   of that tree observe the same instance, separate trees do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
	Singleton,
	Transient,
	PerRequest,
}

/// Key for keyed registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingKey {
	Str(String),
	Int(i64),
}

impl fmt::Display for BindingKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(s) => write!(f, "{s}"),
			Self::Int(i) => write!(f, "{i}"),
		}
	}
}

impl From<&str> for BindingKey {
	fn from(value: &str) -> Self {
		Self::Str(value.to_string())
	}
}

impl From<String> for BindingKey {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

impl From<i64> for BindingKey {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for BindingKey {
	fn from(value: i32) -> Self {
		Self::Int(i64::from(value))
	}
}

/// How a class binding's constructor arguments are obtained.
pub(crate) enum DependencyPlan {
	/// Explicit dependency token list, resolved in declaration order.
	Explicit(Vec<RawToken>),
	/// Arguments produced by the autowire strategy dispatcher.
	Autowired(AutowireOptions),
}

pub(crate) struct ClassBinding {
	pub(crate) meta: ConstructorMeta,
	pub(crate) plan: DependencyPlan,
	pub(crate) construct: ConstructFn,
}

impl ClassBinding {
	/// True when construction needs no dependency resolution at all, which
	/// qualifies the binding for the transient fast path.
	pub(crate) fn is_zero_dependency(&self) -> bool {
		match &self.plan {
			DependencyPlan::Explicit(deps) => deps.is_empty() && self.meta.arity() == 0,
			DependencyPlan::Autowired(options) => {
				self.meta.arity() == 0
					&& options
						.map_resolvers
						.as_ref()
						.is_none_or(|resolvers| resolvers.is_empty())
			}
		}
	}
}

/// Production strategy payload, one variant per registration style.
pub(crate) enum BindingKind {
	Value(AnyArc),
	Factory(SyncFactoryFn),
	AsyncFactory(AsyncFactoryFn),
	Class(ClassBinding),
}

impl fmt::Debug for BindingKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(_) => f.write_str("Value"),
			Self::Factory(_) => f.write_str("Factory"),
			Self::AsyncFactory(_) => f.write_str("AsyncFactory"),
			Self::Class(class) => write!(f, "Class({})", class.meta.name()),
		}
	}
}

/// Immutable record describing how to produce a value for a token.
pub(crate) struct Binding {
	pub(crate) kind: BindingKind,
	pub(crate) lifetime: Lifetime,
	pub(crate) dispose: Option<DisposeHook>,
}

impl Binding {
	pub(crate) fn new(kind: BindingKind, lifetime: Lifetime) -> Self {
		Self {
			kind,
			lifetime,
			dispose: None,
		}
	}

	pub(crate) fn with_dispose(mut self, hook: Option<DisposeHook>) -> Self {
		self.dispose = hook;
		self
	}
}

/// Options accepted by the low-level `bind_*` operations.
#[derive(Default, Clone)]
pub struct BindOptions {
	/// Overrides the operation's default lifetime.
	pub lifetime: Option<Lifetime>,
	/// Teardown hook run for cached singleton instances during disposal.
	pub dispose: Option<DisposeHook>,
}

impl BindOptions {
	pub fn singleton() -> Self {
		Self {
			lifetime: Some(Lifetime::Singleton),
			..Self::default()
		}
	}

	pub fn transient() -> Self {
		Self {
			lifetime: Some(Lifetime::Transient),
			..Self::default()
		}
	}

	pub fn per_request() -> Self {
		Self {
			lifetime: Some(Lifetime::PerRequest),
			..Self::default()
		}
	}

	pub fn with_dispose(mut self, hook: DisposeHook) -> Self {
		self.dispose = Some(hook);
		self
	}
}
