//! Autowire strategy dispatcher
//!
//! Given a constructor's declared metadata and an [`AutowireOptions`]
//! configuration, produces the ordered argument list the constructor closure
//! is invoked with. Strategies are tried in a fixed priority order:
//!
//! 1. `map_resolvers`: position-indexed array of resolver entries, the
//!    fastest and most specific form (the shape a build-time generator
//!    emits).
//! 2. `positions`: `{parameter_name, index, type_name}` entries matched by
//!    declared parameter name first, falling back to the numeric index.
//! 3. Parameterless constructors short-circuit to an empty argument list.
//! 4. `map`: explicit entries keyed by parameter name.
//! 5. The `by` strategy: name-convention matching against the interface-name
//!    registry (default), or the unimplemented `class` placeholder.
//!
//! Unmatched parameters stay unwired unless `strict` is set, in which case
//! the error enumerates everything that was attempted.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::binding::AnyArc;
use crate::container::Resolver;
use crate::error::{DiError, DiResult};
use crate::signature::ConstructorMeta;
use crate::token::{RawToken, Token};

type ArgFn = Arc<dyn Fn(&Resolver) -> DiResult<AnyArc> + Send + Sync>;

/// One entry of a positional or name-keyed autowire configuration.
#[derive(Clone)]
pub enum ArgResolver {
	/// Resolve this token.
	Token(RawToken),
	/// Resolve the token registered under this interface name.
	Interface(String),
	/// Invoke this closure with the active resolver.
	Fn(ArgFn),
}

impl ArgResolver {
	pub fn token<T>(token: &Token<T>) -> Self {
		Self::Token(token.raw().clone())
	}

	pub fn interface(name: impl Into<String>) -> Self {
		Self::Interface(name.into())
	}

	/// Resolver computing the argument from the container, e.g. to supply a
	/// configuration value.
	pub fn with<T, F>(f: F) -> Self
	where
		T: Any + Send + Sync,
		F: Fn(&Resolver) -> DiResult<T> + Send + Sync + 'static,
	{
		Self::Fn(Arc::new(move |resolver| {
			f(resolver).map(|value| Arc::new(value) as AnyArc)
		}))
	}
}

impl fmt::Debug for ArgResolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Token(token) => write!(f, "Token({token})"),
			Self::Interface(name) => write!(f, "Interface({name})"),
			Self::Fn(_) => f.write_str("Fn"),
		}
	}
}

/// Position entry of the `positions` strategy.
///
/// Matched against the constructor's declared parameter name first, so a
/// reordered declaration keeps working; the numeric index is the fallback
/// for builds where names were not preserved.
#[derive(Debug, Clone)]
pub struct PositionSpec {
	pub parameter_name: String,
	pub index: usize,
	pub type_name: String,
}

impl PositionSpec {
	pub fn new(
		parameter_name: impl Into<String>,
		index: usize,
		type_name: impl Into<String>,
	) -> Self {
		Self {
			parameter_name: parameter_name.into(),
			index,
			type_name: type_name.into(),
		}
	}
}

/// Fallback strategy selector for when neither `map_resolvers` nor
/// `positions` nor `map` apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireStrategy {
	/// Match declared parameter names against the interface-name registry,
	/// trying the bare name, the capitalized name, and the `I`-prefixed
	/// capitalized name, in that order.
	#[default]
	ParamName,
	/// Use the `map` entries (empty when none were supplied).
	Map,
	/// Placeholder requiring build-time code generation; always fails.
	Class,
}

/// Autowire configuration attached to a class registration.
#[derive(Clone, Debug, Default)]
pub struct AutowireOptions {
	pub map_resolvers: Option<Vec<Option<ArgResolver>>>,
	pub positions: Option<Vec<PositionSpec>>,
	pub map: Option<HashMap<String, ArgResolver>>,
	pub by: AutowireStrategy,
	/// Fail instead of leaving unmatched parameters unwired.
	pub strict: bool,
}

impl AutowireOptions {
	pub fn map_resolvers(entries: Vec<Option<ArgResolver>>) -> Self {
		Self {
			map_resolvers: Some(entries),
			..Self::default()
		}
	}

	pub fn positions(entries: Vec<PositionSpec>) -> Self {
		Self {
			positions: Some(entries),
			..Self::default()
		}
	}

	pub fn map(entries: HashMap<String, ArgResolver>) -> Self {
		Self {
			map: Some(entries),
			..Self::default()
		}
	}

	pub fn by(strategy: AutowireStrategy) -> Self {
		Self {
			by: strategy,
			..Self::default()
		}
	}

	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}
}

/// Resolved constructor arguments, positionally indexed.
///
/// `None` slots are parameters no strategy wired; the constructor closure
/// decides what an unwired slot means (typically a default value).
pub struct ResolvedArgs {
	values: Vec<Option<AnyArc>>,
}

impl ResolvedArgs {
	pub(crate) fn new(values: Vec<Option<AnyArc>>) -> Self {
		Self { values }
	}

	pub fn empty() -> Self {
		Self { values: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Required argument at `index`, downcast to `T`.
	pub fn get<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
		let slot = self
			.values
			.get(index)
			.and_then(Option::as_ref)
			.ok_or(DiError::MissingArgument { index })?;
		slot.clone()
			.downcast::<T>()
			.map_err(|_| DiError::TypeMismatch {
				token: format!("argument {index}"),
				expected: type_name::<T>(),
			})
	}

	/// Optional argument at `index`; `None` when the slot was unwired or the
	/// type does not match.
	pub fn opt<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
		self.values
			.get(index)
			.and_then(Option::as_ref)
			.and_then(|slot| slot.clone().downcast::<T>().ok())
	}
}

/// Per-position resolution plan, shared between the sync and async
/// executors.
enum ArgPlan {
	Unwired,
	Resolve(RawToken),
	Call(ArgFn),
}

fn capitalize(name: &str) -> String {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}

fn plan_args(
	resolver: &Resolver,
	meta: &ConstructorMeta,
	options: &AutowireOptions,
) -> DiResult<Vec<ArgPlan>> {
	if let Some(entries) = &options.map_resolvers {
		return Ok(entries
			.iter()
			.map(|entry| match entry {
				None => ArgPlan::Unwired,
				Some(ArgResolver::Token(token)) => ArgPlan::Resolve(token.clone()),
				Some(ArgResolver::Interface(name)) => {
					ArgPlan::Resolve(resolver.container().interface_token(name))
				}
				Some(ArgResolver::Fn(f)) => ArgPlan::Call(f.clone()),
			})
			.collect());
	}

	if let Some(specs) = &options.positions {
		return plan_positions(resolver, meta, specs, options.strict);
	}

	if meta.arity() == 0 {
		return Ok(Vec::new());
	}

	if let Some(map) = &options.map {
		return plan_map(resolver, meta, map, options.strict);
	}

	match options.by {
		AutowireStrategy::ParamName => plan_param_names(resolver, meta, options.strict),
		AutowireStrategy::Map => plan_map(resolver, meta, &HashMap::new(), options.strict),
		AutowireStrategy::Class => Err(DiError::UnsupportedStrategy {
			strategy: "class",
			reason: "build-time code generation is required and was not run; supply \
			         `map_resolvers`, `positions` or `map` instead",
		}),
	}
}

fn plan_positions(
	resolver: &Resolver,
	meta: &ConstructorMeta,
	specs: &[PositionSpec],
	strict: bool,
) -> DiResult<Vec<ArgPlan>> {
	let mut plans = Vec::with_capacity(meta.arity());
	for (index, param) in meta.params().iter().enumerate() {
		let by_name = param
			.as_deref()
			.and_then(|name| specs.iter().find(|spec| spec.parameter_name == name));
		let spec = by_name.or_else(|| specs.iter().find(|spec| spec.index == index));
		match spec {
			Some(spec) => plans.push(ArgPlan::Resolve(
				resolver.container().interface_token(&spec.type_name),
			)),
			None if strict => {
				return Err(DiError::AutowireConfiguration {
					constructor: meta.name().to_string(),
					parameter: param.clone().unwrap_or_else(|| format!("#{index}")),
					attempted: vec![
						"position entry by parameter name".to_string(),
						format!("position entry for index {index}"),
					],
				});
			}
			None => plans.push(ArgPlan::Unwired),
		}
	}
	Ok(plans)
}

fn plan_map(
	resolver: &Resolver,
	meta: &ConstructorMeta,
	map: &HashMap<String, ArgResolver>,
	strict: bool,
) -> DiResult<Vec<ArgPlan>> {
	let mut plans = Vec::with_capacity(meta.arity());
	for (index, param) in meta.params().iter().enumerate() {
		let Some(name) = param.as_deref() else {
			if strict {
				return Err(DiError::AutowireConfiguration {
					constructor: meta.name().to_string(),
					parameter: format!("#{index}"),
					attempted: vec!["parameter name extraction".to_string()],
				});
			}
			plans.push(ArgPlan::Unwired);
			continue;
		};
		match map.get(name) {
			Some(ArgResolver::Token(token)) => plans.push(ArgPlan::Resolve(token.clone())),
			Some(ArgResolver::Interface(interface)) => plans.push(ArgPlan::Resolve(
				resolver.container().interface_token(interface),
			)),
			Some(ArgResolver::Fn(f)) => plans.push(ArgPlan::Call(f.clone())),
			None if strict => {
				return Err(DiError::AutowireConfiguration {
					constructor: meta.name().to_string(),
					parameter: name.to_string(),
					attempted: vec![format!("map key `{name}`")],
				});
			}
			None => plans.push(ArgPlan::Unwired),
		}
	}
	Ok(plans)
}

fn plan_param_names(
	resolver: &Resolver,
	meta: &ConstructorMeta,
	strict: bool,
) -> DiResult<Vec<ArgPlan>> {
	let mut plans = Vec::with_capacity(meta.arity());
	for (index, param) in meta.params().iter().enumerate() {
		let Some(name) = param.as_deref() else {
			if strict {
				return Err(DiError::AutowireConfiguration {
					constructor: meta.name().to_string(),
					parameter: format!("#{index}"),
					attempted: vec!["parameter name extraction".to_string()],
				});
			}
			plans.push(ArgPlan::Unwired);
			continue;
		};
		let capitalized = capitalize(name);
		let conventions = [name.to_string(), capitalized.clone(), format!("I{capitalized}")];
		let token = conventions
			.iter()
			.find_map(|candidate| resolver.container().lookup_interface_token(candidate));
		match token {
			Some(token) => plans.push(ArgPlan::Resolve(token)),
			None if strict => {
				return Err(DiError::AutowireConfiguration {
					constructor: meta.name().to_string(),
					parameter: name.to_string(),
					attempted: conventions.to_vec(),
				});
			}
			None => plans.push(ArgPlan::Unwired),
		}
	}
	Ok(plans)
}

/// Produces the constructor arguments synchronously.
pub(crate) fn resolve_args(
	resolver: &Resolver,
	meta: &ConstructorMeta,
	options: &AutowireOptions,
) -> DiResult<ResolvedArgs> {
	let plans = plan_args(resolver, meta, options)?;
	let mut values = Vec::with_capacity(plans.len());
	for plan in plans {
		values.push(match plan {
			ArgPlan::Unwired => None,
			ArgPlan::Resolve(token) => Some(resolver.resolve_raw(&token)?),
			ArgPlan::Call(f) => Some(f(resolver)?),
		});
	}
	Ok(ResolvedArgs::new(values))
}

/// Produces the constructor arguments, awaiting token resolution, in
/// declaration order.
pub(crate) fn resolve_args_async<'a>(
	resolver: &'a Resolver,
	meta: &'a ConstructorMeta,
	options: &'a AutowireOptions,
) -> BoxFuture<'a, DiResult<ResolvedArgs>> {
	Box::pin(async move {
		let plans = plan_args(resolver, meta, options)?;
		let mut values = Vec::with_capacity(plans.len());
		for plan in plans {
			values.push(match plan {
				ArgPlan::Unwired => None,
				ArgPlan::Resolve(token) => Some(resolver.resolve_raw_async(&token).await?),
				ArgPlan::Call(f) => Some(f(resolver)?),
			});
		}
		Ok(ResolvedArgs::new(values))
	})
}
