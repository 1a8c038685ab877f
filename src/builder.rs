//! Fluent registration builder
//!
//! A [`ContainerBuilder`] collects declarative registrations and compiles
//! them onto a freshly created container in one deterministic pass.
//! Precedence between colliding registrations is resolved by rule, never by
//! erroring: defaults lose to explicit registrations, `if_not_registered`
//! rows are skipped once the token is taken, and named/keyed/multi rows are
//! installed under internal indirection tokens so `resolve_named`,
//! `resolve_keyed` and `resolve_all` stay independent from plain `resolve`.

use std::any::{Any, type_name};
use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::autowire::{AutowireOptions, ResolvedArgs};
use crate::binding::{
	AnyArc, AsyncFactoryFn, Binding, BindingKey, BindingKind, ClassBinding, ConstructFn,
	DependencyPlan, Lifetime, SyncFactoryFn,
};
use crate::container::{Container, Resolver};
use crate::dispose::{Dispose, DisposeHook};
use crate::error::DiResult;
use crate::signature::ConstructorMeta;
use crate::token::{RawToken, Token, TokenId};

#[derive(Clone)]
enum RegistrationSource {
	Value(AnyArc),
	Factory(SyncFactoryFn),
	AsyncFactory(AsyncFactoryFn),
	Type {
		meta: ConstructorMeta,
		construct: ConstructFn,
	},
}

#[derive(Clone)]
enum PendingTarget {
	Token(RawToken),
	Interface(String),
}

struct RegistrationConfig {
	source: RegistrationSource,
	target: PendingTarget,
	lifetime: Lifetime,
	name: Option<String>,
	key: Option<BindingKey>,
	is_default: bool,
	if_not_registered: bool,
	also_interfaces: Vec<String>,
	autowire: Option<AutowireOptions>,
	dispose: Option<DisposeHook>,
}

struct TargetSpec {
	target: PendingTarget,
	is_default: bool,
	key: Option<BindingKey>,
}

/// Collects registrations and compiles them into a [`Container`].
///
/// # Examples
///
/// ```
/// use wirebox::{ConstructorMeta, ContainerBuilder, DiResult};
///
/// struct Logger;
///
/// struct EventBus {
/// 	logger: std::sync::Arc<Logger>,
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = ContainerBuilder::new();
/// builder.register_value(Logger).as_interface("ILogger");
/// builder.register_type(
/// 	ConstructorMeta::from_signature("EventBus", "logger: Logger"),
/// 	|args| {
/// 		Ok(EventBus {
/// 			logger: args.get::<Logger>(0)?,
/// 		})
/// 	},
/// );
///
/// let container = builder.build()?;
/// let bus = container.resolve_interface::<EventBus>("EventBus")?;
/// let logger = container.resolve_interface::<Logger>("ILogger")?;
/// assert!(std::sync::Arc::ptr_eq(&bus.logger, &logger));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
	configs: Vec<RegistrationConfig>,
}

impl ContainerBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a pre-built value. Singleton lifetime by default.
	pub fn register_value<T: Any + Send + Sync>(&mut self, value: T) -> Registration<'_, T> {
		Registration::start(
			self,
			RegistrationSource::Value(Arc::new(value)),
			short_type_name::<T>(),
			Lifetime::Singleton,
		)
	}

	/// Registers a factory closure. Transient lifetime by default.
	pub fn register_factory<T, F>(&mut self, factory: F) -> Registration<'_, T>
	where
		T: Any + Send + Sync,
		F: Fn(&Resolver) -> DiResult<T> + Send + Sync + 'static,
	{
		let erased: SyncFactoryFn =
			Arc::new(move |resolver| factory(resolver).map(|value| Arc::new(value) as AnyArc));
		Registration::start(
			self,
			RegistrationSource::Factory(erased),
			short_type_name::<T>(),
			Lifetime::Transient,
		)
	}

	/// Registers an async factory. Transient lifetime by default; values
	/// are only producible through `resolve_async`.
	pub fn register_async_factory<T, F, Fut>(&mut self, factory: F) -> Registration<'_, T>
	where
		T: Any + Send + Sync,
		F: Fn(Resolver) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		let erased: AsyncFactoryFn = Arc::new(move |resolver| {
			let fut = factory(resolver);
			Box::pin(async move { fut.await.map(|value| Arc::new(value) as AnyArc) })
		});
		Registration::start(
			self,
			RegistrationSource::AsyncFactory(erased),
			short_type_name::<T>(),
			Lifetime::Transient,
		)
	}

	/// Registers a class constructor whose arguments are produced by the
	/// autowire dispatcher (name-convention matching unless the chain
	/// supplies explicit options with [`Registration::autowire`]).
	///
	/// Without a chain terminal the registration binds to the interface
	/// name equal to the constructor's name, so the type is resolvable "by
	/// its own token".
	pub fn register_type<T, F>(
		&mut self,
		meta: ConstructorMeta,
		construct: F,
	) -> Registration<'_, T>
	where
		T: Any + Send + Sync,
		F: Fn(ResolvedArgs) -> DiResult<T> + Send + Sync + 'static,
	{
		let erased: ConstructFn =
			Arc::new(move |args| construct(args).map(|value| Arc::new(value) as AnyArc));
		let default_name = meta.name().to_string();
		Registration::start(
			self,
			RegistrationSource::Type {
				meta,
				construct: erased,
			},
			default_name,
			Lifetime::Transient,
		)
	}

	/// Compiles the registrations onto a fresh root container.
	pub fn build(self) -> DiResult<Container> {
		let container = Container::new();
		self.compile(&container)?;
		Ok(container)
	}

	/// Compiles the registrations onto a fresh child of `parent`, so the
	/// result inherits the parent's bindings and interface names while its
	/// own registrations shadow them.
	pub fn build_child(self, parent: &Container) -> DiResult<Container> {
		let container = parent.create_child();
		self.compile(&container)?;
		Ok(container)
	}

	fn compile(self, container: &Container) -> DiResult<()> {
		debug!(registrations = self.configs.len(), "building container");

		// Deferred interface names become concrete tokens first, so the
		// precedence rules below operate on token identity.
		let rows: Vec<(RawToken, RegistrationConfig)> = self
			.configs
			.into_iter()
			.map(|config| {
				let bare = match &config.target {
					PendingTarget::Token(token) => token.clone(),
					PendingTarget::Interface(name) => container.interface_token(name),
				};
				(bare, config)
			})
			.collect();

		// Defaults never compete with explicit plain registrations for the
		// same bare token.
		let explicit_plain: HashSet<TokenId> = rows
			.iter()
			.filter(|(_, config)| {
				!config.is_default && config.name.is_none() && config.key.is_none()
			})
			.map(|(token, _)| token.id())
			.collect();

		let mut registered: HashSet<TokenId> = HashSet::new();
		let mut plain_seen: HashSet<TokenId> = HashSet::new();

		for (bare, config) in rows {
			if config.is_default && explicit_plain.contains(&bare.id()) {
				continue;
			}
			let already = registered.contains(&bare.id());
			if config.if_not_registered && already {
				continue;
			}
			if config.is_default && already {
				continue;
			}

			let binding_token = if let Some(name) = &config.name {
				RawToken::mint(Some(&format!("{bare}@{name}")))
			} else if let Some(key) = &config.key {
				RawToken::mint(Some(&format!("{bare}#{key}")))
			} else if !plain_seen.contains(&bare.id()) {
				bare.clone()
			} else {
				RawToken::mint(Some(&format!("{bare}[multi]")))
			};

			install_row(container, &binding_token, &config);

			if let Some(name) = config.name.clone() {
				container.register_named(name, binding_token.clone());
			} else if let Some(key) = config.key.clone() {
				container.register_keyed(key, binding_token.clone());
			} else {
				container.push_group(&bare, binding_token.clone());
				plain_seen.insert(bare.id());
			}
			registered.insert(bare.id());

			// Additional interfaces re-resolve the primary binding token,
			// sharing its instance and lifetime.
			for extra in &config.also_interfaces {
				let extra_token = container.interface_token(extra);
				let primary = binding_token.clone();
				let indirection: SyncFactoryFn =
					Arc::new(move |resolver: &Resolver| resolver.resolve_raw(&primary));
				container.bind_factory_raw(&extra_token, indirection, Lifetime::Transient);
				registered.insert(extra_token.id());
			}
		}
		Ok(())
	}
}

fn install_row(container: &Container, token: &RawToken, config: &RegistrationConfig) {
	let kind = match &config.source {
		RegistrationSource::Value(value) => BindingKind::Value(value.clone()),
		RegistrationSource::Factory(factory) => BindingKind::Factory(factory.clone()),
		RegistrationSource::AsyncFactory(factory) => BindingKind::AsyncFactory(factory.clone()),
		RegistrationSource::Type { meta, construct } => BindingKind::Class(ClassBinding {
			meta: meta.clone(),
			plan: DependencyPlan::Autowired(config.autowire.clone().unwrap_or_default()),
			construct: construct.clone(),
		}),
	};
	container.install(
		token,
		Binding::new(kind, config.lifetime).with_dispose(config.dispose.clone()),
	);
}

fn short_type_name<T>() -> String {
	let full = type_name::<T>();
	let base = full.split('<').next().unwrap_or(full);
	base.rsplit("::").next().unwrap_or(base).to_string()
}

/// One fluent registration chain.
///
/// Modifiers may appear in any order; the chain materializes its
/// configuration rows when it goes out of scope. A chain without a terminal
/// (`as_token`, `as_interface`, ...) registers under the short type name of
/// its payload.
pub struct Registration<'b, T> {
	builder: &'b mut ContainerBuilder,
	source: RegistrationSource,
	default_name: String,
	lifetime: Lifetime,
	name: Option<String>,
	key: Option<BindingKey>,
	is_default: bool,
	if_not_registered: bool,
	also_interfaces: Vec<String>,
	autowire: Option<AutowireOptions>,
	dispose: Option<DisposeHook>,
	targets: Vec<TargetSpec>,
	_marker: PhantomData<fn() -> T>,
}

impl<'b, T: Any + Send + Sync> Registration<'b, T> {
	fn start(
		builder: &'b mut ContainerBuilder,
		source: RegistrationSource,
		default_name: String,
		lifetime: Lifetime,
	) -> Self {
		Self {
			builder,
			source,
			default_name,
			lifetime,
			name: None,
			key: None,
			is_default: false,
			if_not_registered: false,
			also_interfaces: Vec::new(),
			autowire: None,
			dispose: None,
			targets: Vec::new(),
			_marker: PhantomData,
		}
	}

	pub fn singleton(mut self) -> Self {
		self.lifetime = Lifetime::Singleton;
		self
	}

	pub fn transient(mut self) -> Self {
		self.lifetime = Lifetime::Transient;
		self
	}

	/// One instance per top-level resolve call tree.
	pub fn per_request(mut self) -> Self {
		self.lifetime = Lifetime::PerRequest;
		self
	}

	/// Registers under a name, resolvable only via `resolve_named`.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Registers under a key, resolvable only via `resolve_keyed`.
	pub fn keyed(mut self, key: impl Into<BindingKey>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Marks the registration as a default: it yields to any explicit plain
	/// registration for the same token.
	pub fn as_default(mut self) -> Self {
		self.is_default = true;
		self
	}

	/// Skips the registration if an earlier row already took the token.
	pub fn if_not_registered(mut self) -> Self {
		self.if_not_registered = true;
		self
	}

	/// Supplies explicit autowire configuration for a type registration.
	pub fn autowire(mut self, options: AutowireOptions) -> Self {
		self.autowire = Some(options);
		self
	}

	/// Runs the payload's [`Dispose`] implementation when the owning
	/// container is disposed.
	pub fn disposable(mut self) -> Self
	where
		T: Dispose,
	{
		self.dispose = Some(DisposeHook::of::<T>());
		self
	}

	/// Binds to an explicit token.
	pub fn as_token(mut self, token: &Token<T>) -> Self {
		self.targets.push(TargetSpec {
			target: PendingTarget::Token(token.raw().clone()),
			is_default: false,
			key: None,
		});
		self
	}

	/// Binds to the token registered under an interface name.
	pub fn as_interface(mut self, name: impl Into<String>) -> Self {
		self.targets.push(TargetSpec {
			target: PendingTarget::Interface(name.into()),
			is_default: false,
			key: None,
		});
		self
	}

	/// Binds to an interface name as a default registration.
	pub fn as_default_interface(mut self, name: impl Into<String>) -> Self {
		self.targets.push(TargetSpec {
			target: PendingTarget::Interface(name.into()),
			is_default: true,
			key: None,
		});
		self
	}

	/// Binds to an interface name under a key.
	pub fn as_keyed_interface(
		mut self,
		key: impl Into<BindingKey>,
		name: impl Into<String>,
	) -> Self {
		self.targets.push(TargetSpec {
			target: PendingTarget::Interface(name.into()),
			is_default: false,
			key: Some(key.into()),
		});
		self
	}

	/// Additionally exposes the registration under each interface name,
	/// re-resolving the primary binding so instance and lifetime are
	/// shared.
	pub fn as_implemented_interfaces(mut self, names: &[&str]) -> Self {
		self.also_interfaces
			.extend(names.iter().map(|n| (*n).to_string()));
		self
	}
}

impl<T> Drop for Registration<'_, T> {
	fn drop(&mut self) {
		let mut targets = std::mem::take(&mut self.targets);
		if targets.is_empty() {
			targets.push(TargetSpec {
				target: PendingTarget::Interface(self.default_name.clone()),
				is_default: false,
				key: None,
			});
		}
		let also_interfaces = std::mem::take(&mut self.also_interfaces);
		for (idx, spec) in targets.into_iter().enumerate() {
			self.builder.configs.push(RegistrationConfig {
				source: self.source.clone(),
				target: spec.target,
				lifetime: self.lifetime,
				name: self.name.clone(),
				key: spec.key.or_else(|| self.key.clone()),
				is_default: spec.is_default || self.is_default,
				if_not_registered: self.if_not_registered,
				also_interfaces: if idx == 0 {
					also_interfaces.clone()
				} else {
					Vec::new()
				},
				autowire: self.autowire.clone(),
				dispose: self.dispose.clone(),
			});
		}
	}
}
