//! Binding registry and resolution runtime
//!
//! A [`Container`] is a node in a tree of scopes. It owns its binding map,
//! its singleton cache (with a first-resolution order list for LIFO
//! disposal), the interface-name registry, and the side tables for
//! named/keyed/multi registrations. Lookup walks from the container through
//! its ancestors; the nearest binding wins, so child bindings shadow parent
//! bindings for the same token.
//!
//! Resolution fast paths, in the order they are consulted:
//! 1. the local fast-singleton memo (steady-state repeat lookups),
//! 2. the zero-dependency transient constructor map,
//! 3. the flattened parent-chain binding view, lazily rebuilt whenever any
//!    container in the chain has been mutated since it was materialized.
//!
//! Only after all of those miss does a resolution acquire a pooled
//! [`ResolutionContext`] and run the full cycle-tracked algorithm.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::autowire::{self, ResolvedArgs};
use crate::binding::{
	AnyArc, BindOptions, Binding, BindingKey, BindingKind, ClassBinding, ConstructFn,
	DependencyPlan, Lifetime, SyncFactoryFn,
};
use crate::context::{ContextPool, ResolutionContext};
use crate::error::{DiError, DiResult, ResolutionPath};
use crate::signature::ConstructorMeta;
use crate::token::{RawToken, Token, TokenId};

/// Materialized union of every binding visible from a container, tagged with
/// the chain version it was built against. `None` owner means the binding
/// lives on the container holding the view.
struct FlatView {
	map: HashMap<TokenId, (Arc<Binding>, Option<Container>)>,
	chain_version: u64,
}

struct ContainerInner {
	parent: Option<Container>,
	bindings: RwLock<HashMap<TokenId, Arc<Binding>>>,
	singletons: RwLock<HashMap<TokenId, AnyArc>>,
	singleton_order: Mutex<Vec<RawToken>>,
	fast_singletons: RwLock<HashMap<TokenId, (AnyArc, u64)>>,
	fast_transients: RwLock<HashMap<TokenId, ConstructFn>>,
	interface_tokens: RwLock<HashMap<String, RawToken>>,
	named: RwLock<HashMap<String, RawToken>>,
	keyed: RwLock<HashMap<BindingKey, RawToken>>,
	groups: RwLock<HashMap<TokenId, Vec<RawToken>>>,
	flat: RwLock<Option<FlatView>>,
	version: AtomicU64,
	disposed: AtomicBool,
	pool: ContextPool,
}

fn downcast<T: Any + Send + Sync>(value: AnyArc, token: &RawToken) -> DiResult<Arc<T>> {
	value.downcast::<T>().map_err(|_| DiError::TypeMismatch {
		token: token.to_string(),
		expected: type_name::<T>(),
	})
}

/// Dependency-injection container: binds tokens to producers and resolves
/// dependency graphs.
///
/// The handle is cheap to clone; clones share the same underlying scope.
///
/// # Examples
///
/// ```
/// use wirebox::{Container, Token};
///
/// struct Config {
/// 	url: String,
/// }
///
/// let container = Container::new();
/// let config_token = Token::<Config>::new("config");
/// container.bind_value(&config_token, Config {
/// 	url: "postgres://localhost".to_string(),
/// });
///
/// let config = container.resolve(&config_token).unwrap();
/// assert_eq!(config.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
	inner: Arc<ContainerInner>,
}

impl Container {
	/// Creates a root container with no parent.
	pub fn new() -> Self {
		Self::with_parent(None)
	}

	fn with_parent(parent: Option<Container>) -> Self {
		Self {
			inner: Arc::new(ContainerInner {
				parent,
				bindings: RwLock::new(HashMap::new()),
				singletons: RwLock::new(HashMap::new()),
				singleton_order: Mutex::new(Vec::new()),
				fast_singletons: RwLock::new(HashMap::new()),
				fast_transients: RwLock::new(HashMap::new()),
				interface_tokens: RwLock::new(HashMap::new()),
				named: RwLock::new(HashMap::new()),
				keyed: RwLock::new(HashMap::new()),
				groups: RwLock::new(HashMap::new()),
				flat: RwLock::new(None),
				version: AtomicU64::new(0),
				disposed: AtomicBool::new(false),
				pool: ContextPool::new(),
			}),
		}
	}

	/// Creates a child scope.
	///
	/// The child sees every ancestor binding but caches its own singletons
	/// for the bindings it declares itself, so sibling subtrees with their
	/// own registrations do not share instances.
	pub fn create_child(&self) -> Container {
		Self::with_parent(Some(self.clone()))
	}

	/// Returns the parent scope, if any.
	pub fn parent(&self) -> Option<&Container> {
		self.inner.parent.as_ref()
	}

	/// True once [`Container::dispose`] has run.
	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.load(Ordering::SeqCst)
	}

	fn ensure_active(&self) -> DiResult<()> {
		if self.is_disposed() {
			Err(DiError::ContainerDisposed)
		} else {
			Ok(())
		}
	}

	// ----- binding installation -----

	/// Binds a pre-built value under singleton lifetime. Overwrites any
	/// prior binding for the token in this container.
	pub fn bind_value<T: Any + Send + Sync>(&self, token: &Token<T>, value: T) {
		self.install(
			token.raw(),
			Binding::new(BindingKind::Value(Arc::new(value)), Lifetime::Singleton),
		);
	}

	/// Like [`Container::bind_value`], for values with a teardown hook.
	pub fn bind_value_disposable<T>(&self, token: &Token<T>, value: T)
	where
		T: Any + Send + Sync + crate::Dispose,
	{
		self.install(
			token.raw(),
			Binding::new(BindingKind::Value(Arc::new(value)), Lifetime::Singleton)
				.with_dispose(Some(crate::DisposeHook::of::<T>())),
		);
	}

	/// Binds a factory with transient lifetime.
	///
	/// The factory receives a [`Resolver`] whose nested resolutions share
	/// the calling resolve tree.
	pub fn bind_factory<T, F>(&self, token: &Token<T>, factory: F)
	where
		T: Any + Send + Sync,
		F: Fn(&Resolver) -> DiResult<T> + Send + Sync + 'static,
	{
		self.bind_factory_with(token, factory, BindOptions::default());
	}

	/// Binds a factory with explicit options (lifetime, dispose hook).
	pub fn bind_factory_with<T, F>(&self, token: &Token<T>, factory: F, options: BindOptions)
	where
		T: Any + Send + Sync,
		F: Fn(&Resolver) -> DiResult<T> + Send + Sync + 'static,
	{
		let erased: SyncFactoryFn =
			Arc::new(move |resolver| factory(resolver).map(|value| Arc::new(value) as AnyArc));
		let lifetime = options.lifetime.unwrap_or(Lifetime::Transient);
		self.install(
			token.raw(),
			Binding::new(BindingKind::Factory(erased), lifetime).with_dispose(options.dispose),
		);
	}

	/// Binds an async factory with transient lifetime. Only
	/// [`Container::resolve_async`] can produce values from it; the sync
	/// path reports [`DiError::SyncAsyncMismatch`].
	pub fn bind_async_factory<T, F, Fut>(&self, token: &Token<T>, factory: F)
	where
		T: Any + Send + Sync,
		F: Fn(Resolver) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		self.bind_async_factory_with(token, factory, BindOptions::default());
	}

	/// Binds an async factory with explicit options.
	pub fn bind_async_factory_with<T, F, Fut>(
		&self,
		token: &Token<T>,
		factory: F,
		options: BindOptions,
	) where
		T: Any + Send + Sync,
		F: Fn(Resolver) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		let erased: crate::binding::AsyncFactoryFn = Arc::new(move |resolver| {
			let fut = factory(resolver);
			Box::pin(async move { fut.await.map(|value| Arc::new(value) as AnyArc) })
		});
		let lifetime = options.lifetime.unwrap_or(Lifetime::Transient);
		self.install(
			token.raw(),
			Binding::new(BindingKind::AsyncFactory(erased), lifetime)
				.with_dispose(options.dispose),
		);
	}

	/// Binds a class constructor with an explicit dependency token list.
	///
	/// Dependencies resolve recursively, in declaration order, through the
	/// same resolution tree; the construct closure receives them as
	/// positional [`ResolvedArgs`].
	pub fn bind_class<T, F>(
		&self,
		token: &Token<T>,
		meta: ConstructorMeta,
		dependencies: Vec<RawToken>,
		construct: F,
		options: BindOptions,
	) where
		T: Any + Send + Sync,
		F: Fn(ResolvedArgs) -> DiResult<T> + Send + Sync + 'static,
	{
		let erased: ConstructFn =
			Arc::new(move |args| construct(args).map(|value| Arc::new(value) as AnyArc));
		let lifetime = options.lifetime.unwrap_or(Lifetime::Transient);
		self.install(
			token.raw(),
			Binding::new(
				BindingKind::Class(ClassBinding {
					meta,
					plan: DependencyPlan::Explicit(dependencies),
					construct: erased,
				}),
				lifetime,
			)
			.with_dispose(options.dispose),
		);
	}

	pub(crate) fn bind_factory_raw(
		&self,
		token: &RawToken,
		factory: SyncFactoryFn,
		lifetime: Lifetime,
	) {
		self.install(token, Binding::new(BindingKind::Factory(factory), lifetime));
	}

	pub(crate) fn install(&self, token: &RawToken, binding: Binding) {
		let id = token.id();
		debug!(token = %token, lifetime = ?binding.lifetime, kind = ?binding.kind, "binding installed");

		let fast_ctor = match (&binding.kind, binding.lifetime) {
			(BindingKind::Class(class), Lifetime::Transient) if class.is_zero_dependency() => {
				Some(class.construct.clone())
			}
			_ => None,
		};
		{
			let mut fast = self
				.inner
				.fast_transients
				.write()
				.unwrap_or_else(PoisonError::into_inner);
			match fast_ctor {
				Some(ctor) => {
					fast.insert(id, ctor);
				}
				None => {
					fast.remove(&id);
				}
			}
		}

		// Rebinding drops any instance cached for the old binding.
		self.inner
			.singletons
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&id);
		self.inner
			.fast_singletons
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&id);
		self.inner
			.singleton_order
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.retain(|t| t.id() != id);

		self.inner
			.bindings
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(id, Arc::new(binding));
		self.inner.version.fetch_add(1, Ordering::SeqCst);
		*self.inner.flat.write().unwrap_or_else(PoisonError::into_inner) = None;
	}

	// ----- chain bookkeeping -----

	fn chain(&self) -> Vec<Container> {
		let mut out = Vec::new();
		let mut cursor = Some(self.clone());
		while let Some(container) = cursor {
			cursor = container.inner.parent.clone();
			out.push(container);
		}
		out
	}

	fn root(&self) -> Container {
		let mut current = self.clone();
		while let Some(parent) = current.inner.parent.clone() {
			current = parent;
		}
		current
	}

	/// Sum of per-container mutation counters along the chain; any binding
	/// installed anywhere in the chain changes it.
	fn chain_version(&self) -> u64 {
		let mut version = 0u64;
		let mut cursor = Some(self.clone());
		while let Some(container) = cursor {
			version = version.wrapping_add(container.inner.version.load(Ordering::SeqCst));
			cursor = container.inner.parent.clone();
		}
		version
	}

	/// Nearest-binding lookup through the flattened view.
	fn lookup(&self, id: TokenId) -> Option<(Arc<Binding>, Container)> {
		let chain_version = self.chain_version();
		{
			let flat = self.inner.flat.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(view) = flat.as_ref() {
				if view.chain_version == chain_version {
					return view.map.get(&id).map(|(binding, owner)| {
						(binding.clone(), owner.clone().unwrap_or_else(|| self.clone()))
					});
				}
			}
		}

		trace!("rebuilding flattened binding view");
		let mut map = HashMap::new();
		let chain = self.chain();
		for container in chain.iter().rev() {
			// Root first; nearer containers overwrite, so shadowing falls
			// out of insertion order.
			let owner = if Arc::ptr_eq(&container.inner, &self.inner) {
				None
			} else {
				Some(container.clone())
			};
			let bindings = container
				.inner
				.bindings
				.read()
				.unwrap_or_else(PoisonError::into_inner);
			for (token_id, binding) in bindings.iter() {
				map.insert(*token_id, (binding.clone(), owner.clone()));
			}
		}
		let result = map.get(&id).map(|(binding, owner)| {
			(binding.clone(), owner.clone().unwrap_or_else(|| self.clone()))
		});
		*self.inner.flat.write().unwrap_or_else(PoisonError::into_inner) =
			Some(FlatView { map, chain_version });
		result
	}

	/// True when any container in the chain has a binding for the token.
	pub fn has_binding(&self, token: &RawToken) -> bool {
		self.lookup(token.id()).is_some()
	}

	// ----- caches -----

	fn fast_cached(&self, id: TokenId) -> Option<AnyArc> {
		let fast = self
			.inner
			.fast_singletons
			.read()
			.unwrap_or_else(PoisonError::into_inner);
		let (value, version) = fast.get(&id)?;
		(*version == self.chain_version()).then(|| value.clone())
	}

	fn remember_fast(&self, id: TokenId, value: &AnyArc) {
		let version = self.chain_version();
		self.inner
			.fast_singletons
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(id, (value.clone(), version));
	}

	fn fast_transient(&self, id: TokenId) -> Option<ConstructFn> {
		self.inner
			.fast_transients
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&id)
			.cloned()
	}

	fn cached_singleton(&self, id: TokenId) -> Option<AnyArc> {
		self.inner
			.singletons
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&id)
			.cloned()
	}

	/// First insert wins; a lost construction race observes the cached
	/// instance instead of its own.
	fn store_singleton(&self, token: &RawToken, value: AnyArc) -> AnyArc {
		{
			let mut cache = self
				.inner
				.singletons
				.write()
				.unwrap_or_else(PoisonError::into_inner);
			if let Some(existing) = cache.get(&token.id()) {
				return existing.clone();
			}
			cache.insert(token.id(), value.clone());
		}
		self.inner
			.singleton_order
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(token.clone());
		value
	}

	// ----- resolution -----

	/// Resolves the value bound to `token`.
	///
	/// # Examples
	///
	/// ```
	/// use wirebox::{Container, Token};
	///
	/// let container = Container::new();
	/// let token = Token::<u32>::new("answer");
	/// container.bind_value(&token, 42u32);
	/// assert_eq!(*container.resolve(&token).unwrap(), 42);
	/// ```
	pub fn resolve<T: Any + Send + Sync>(&self, token: &Token<T>) -> DiResult<Arc<T>> {
		self.resolve_raw(token.raw())
			.and_then(|value| downcast(value, token.raw()))
	}

	/// Type-erased resolve; the core the typed wrappers delegate to.
	pub fn resolve_raw(&self, token: &RawToken) -> DiResult<AnyArc> {
		self.ensure_active()?;
		let id = token.id();
		if let Some(value) = self.fast_cached(id) {
			return Ok(value);
		}
		if let Some(construct) = self.fast_transient(id) {
			return construct(ResolvedArgs::empty());
		}
		let ctx = self.inner.pool.acquire();
		let result = self.resolve_in(&ctx, token);
		self.inner.pool.release(ctx);
		result
	}

	/// Resolves the value bound to `token`, awaiting async factories and
	/// async dependency construction.
	pub async fn resolve_async<T: Any + Send + Sync>(&self, token: &Token<T>) -> DiResult<Arc<T>> {
		self.resolve_raw_async(token.raw())
			.await
			.and_then(|value| downcast(value, token.raw()))
	}

	/// Type-erased async resolve.
	pub async fn resolve_raw_async(&self, token: &RawToken) -> DiResult<AnyArc> {
		self.ensure_active()?;
		let id = token.id();
		if let Some(value) = self.fast_cached(id) {
			return Ok(value);
		}
		if let Some(construct) = self.fast_transient(id) {
			return construct(ResolvedArgs::empty());
		}
		let ctx = self.inner.pool.acquire();
		let result = self.resolve_in_async(&ctx, token).await;
		self.inner.pool.release(ctx);
		result
	}

	/// Resolves to `None` instead of failing when no binding exists.
	pub fn try_resolve<T: Any + Send + Sync>(&self, token: &Token<T>) -> DiResult<Option<Arc<T>>> {
		match self.resolve_raw(token.raw()) {
			Ok(value) => downcast(value, token.raw()).map(Some),
			Err(DiError::BindingNotFound { .. }) => Ok(None),
			Err(other) => Err(other),
		}
	}

	pub(crate) fn resolve_in(
		&self,
		ctx: &Arc<ResolutionContext>,
		token: &RawToken,
	) -> DiResult<AnyArc> {
		let id = token.id();
		ctx.check_cycle(token)?;
		let Some((binding, owner)) = self.lookup(id) else {
			return Err(DiError::BindingNotFound {
				token: token.to_string(),
				path: ctx.current_path(),
			});
		};
		match binding.lifetime {
			Lifetime::PerRequest => {
				if let Some(value) = ctx.per_request_get(id) {
					return Ok(value);
				}
			}
			Lifetime::Singleton => {
				if let Some(value) = owner.cached_singleton(id) {
					self.remember_fast(id, &value);
					return Ok(value);
				}
			}
			Lifetime::Transient => {}
		}

		let guard = ctx.guard(token)?;
		let produced = self.instantiate(ctx, token, &binding);
		drop(guard);
		let value = produced?;

		match binding.lifetime {
			Lifetime::Singleton => {
				let value = owner.store_singleton(token, value);
				self.remember_fast(id, &value);
				Ok(value)
			}
			Lifetime::PerRequest => {
				ctx.per_request_insert(id, value.clone());
				Ok(value)
			}
			Lifetime::Transient => Ok(value),
		}
	}

	fn instantiate(
		&self,
		ctx: &Arc<ResolutionContext>,
		token: &RawToken,
		binding: &Binding,
	) -> DiResult<AnyArc> {
		match &binding.kind {
			BindingKind::Value(value) => Ok(value.clone()),
			BindingKind::Factory(factory) => {
				let resolver = Resolver::new(self.clone(), ctx.clone());
				factory(&resolver)
			}
			BindingKind::AsyncFactory(_) => Err(DiError::SyncAsyncMismatch {
				token: token.to_string(),
			}),
			BindingKind::Class(class) => {
				let args = match &class.plan {
					DependencyPlan::Explicit(deps) => {
						let mut values = Vec::with_capacity(deps.len());
						for dep in deps {
							values.push(Some(self.resolve_in(ctx, dep)?));
						}
						ResolvedArgs::new(values)
					}
					DependencyPlan::Autowired(options) => {
						let resolver = Resolver::new(self.clone(), ctx.clone());
						autowire::resolve_args(&resolver, &class.meta, options)?
					}
				};
				(class.construct)(args)
			}
		}
	}

	pub(crate) fn resolve_in_async<'a>(
		&'a self,
		ctx: &'a Arc<ResolutionContext>,
		token: &'a RawToken,
	) -> BoxFuture<'a, DiResult<AnyArc>> {
		Box::pin(async move {
			let id = token.id();
			ctx.check_cycle(token)?;
			let Some((binding, owner)) = self.lookup(id) else {
				return Err(DiError::BindingNotFound {
					token: token.to_string(),
					path: ctx.current_path(),
				});
			};
			match binding.lifetime {
				Lifetime::PerRequest => {
					if let Some(value) = ctx.per_request_get(id) {
						return Ok(value);
					}
				}
				Lifetime::Singleton => {
					if let Some(value) = owner.cached_singleton(id) {
						self.remember_fast(id, &value);
						return Ok(value);
					}
				}
				Lifetime::Transient => {}
			}

			let guard = ctx.guard(token)?;
			let produced = self.instantiate_async(ctx, &binding).await;
			drop(guard);
			let value = produced?;

			match binding.lifetime {
				Lifetime::Singleton => {
					let value = owner.store_singleton(token, value);
					self.remember_fast(id, &value);
					Ok(value)
				}
				Lifetime::PerRequest => {
					ctx.per_request_insert(id, value.clone());
					Ok(value)
				}
				Lifetime::Transient => Ok(value),
			}
		})
	}

	async fn instantiate_async(
		&self,
		ctx: &Arc<ResolutionContext>,
		binding: &Binding,
	) -> DiResult<AnyArc> {
		match &binding.kind {
			BindingKind::Value(value) => Ok(value.clone()),
			BindingKind::Factory(factory) => {
				let resolver = Resolver::new(self.clone(), ctx.clone());
				factory(&resolver)
			}
			BindingKind::AsyncFactory(factory) => {
				let resolver = Resolver::new(self.clone(), ctx.clone());
				factory(resolver).await
			}
			BindingKind::Class(class) => {
				let args = match &class.plan {
					DependencyPlan::Explicit(deps) => {
						let mut values = Vec::with_capacity(deps.len());
						for dep in deps {
							values.push(Some(self.resolve_in_async(ctx, dep).await?));
						}
						ResolvedArgs::new(values)
					}
					DependencyPlan::Autowired(options) => {
						let resolver = Resolver::new(self.clone(), ctx.clone());
						autowire::resolve_args_async(&resolver, &class.meta, options).await?
					}
				};
				(class.construct)(args)
			}
		}
	}

	// ----- named / keyed / grouped lookups -----

	pub(crate) fn register_named(&self, name: String, token: RawToken) {
		self.inner
			.named
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(name, token);
	}

	pub(crate) fn register_keyed(&self, key: BindingKey, token: RawToken) {
		self.inner
			.keyed
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(key, token);
	}

	pub(crate) fn push_group(&self, bare: &RawToken, member: RawToken) {
		self.inner
			.groups
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(bare.id())
			.or_default()
			.push(member);
	}

	fn lookup_named(&self, name: &str) -> Option<RawToken> {
		self.chain().into_iter().find_map(|container| {
			container
				.inner
				.named
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.get(name)
				.cloned()
		})
	}

	fn lookup_keyed(&self, key: &BindingKey) -> Option<RawToken> {
		self.chain().into_iter().find_map(|container| {
			container
				.inner
				.keyed
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.get(key)
				.cloned()
		})
	}

	/// Resolves the registration made under `name`.
	pub fn resolve_named<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
		self.ensure_active()?;
		let Some(token) = self.lookup_named(name) else {
			return Err(DiError::BindingNotFound {
				token: format!("named registration `{name}`"),
				path: ResolutionPath::default(),
			});
		};
		self.resolve_raw(&token)
			.and_then(|value| downcast(value, &token))
	}

	/// Resolves the registration made under `key`.
	pub fn resolve_keyed<T: Any + Send + Sync>(
		&self,
		key: impl Into<BindingKey>,
	) -> DiResult<Arc<T>> {
		self.ensure_active()?;
		let key = key.into();
		let Some(token) = self.lookup_keyed(&key) else {
			return Err(DiError::BindingNotFound {
				token: format!("keyed registration `{key}`"),
				path: ResolutionPath::default(),
			});
		};
		self.resolve_raw(&token)
			.and_then(|value| downcast(value, &token))
	}

	/// Resolves every plain (unnamed, unkeyed) registration for the token.
	///
	/// Named and keyed siblings are never included. Without any builder
	/// group, falls back to the single plain binding, or an empty list when
	/// nothing is registered.
	pub fn resolve_all<T: Any + Send + Sync>(&self, token: &Token<T>) -> DiResult<Vec<Arc<T>>> {
		self.resolve_all_raw(token.raw())?
			.into_iter()
			.map(|value| downcast(value, token.raw()))
			.collect()
	}

	/// Type-erased [`Container::resolve_all`].
	pub fn resolve_all_raw(&self, token: &RawToken) -> DiResult<Vec<AnyArc>> {
		self.ensure_active()?;
		let group = self.chain().into_iter().find_map(|container| {
			container
				.inner
				.groups
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.get(&token.id())
				.cloned()
		});
		match group {
			Some(members) => {
				// One context for the whole batch, so per-request members
				// are shared across the group.
				let ctx = self.inner.pool.acquire();
				let mut out = Vec::with_capacity(members.len());
				let mut failure = None;
				for member in &members {
					match self.resolve_in(&ctx, member) {
						Ok(value) => out.push(value),
						Err(error) => {
							failure = Some(error);
							break;
						}
					}
				}
				self.inner.pool.release(ctx);
				match failure {
					Some(error) => Err(error),
					None => Ok(out),
				}
			}
			None => {
				if self.lookup(token.id()).is_some() {
					Ok(vec![self.resolve_raw(token)?])
				} else {
					Ok(Vec::new())
				}
			}
		}
	}

	// ----- interface-name registry -----

	/// Returns the token registered for `name` anywhere in the chain,
	/// minting it in the root ancestor on first use.
	///
	/// The same name always maps to the same token across an entire
	/// container tree.
	pub fn interface_token(&self, name: &str) -> RawToken {
		{
			let local = self
				.inner
				.interface_tokens
				.read()
				.unwrap_or_else(PoisonError::into_inner);
			if let Some(token) = local.get(name) {
				return token.clone();
			}
		}
		let mut cursor = self.inner.parent.clone();
		while let Some(ancestor) = cursor {
			let found = ancestor
				.inner
				.interface_tokens
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.get(name)
				.cloned();
			if let Some(token) = found {
				self.inner
					.interface_tokens
					.write()
					.unwrap_or_else(PoisonError::into_inner)
					.insert(name.to_string(), token.clone());
				return token;
			}
			cursor = ancestor.inner.parent.clone();
		}

		let root = self.root();
		let minted = {
			let mut registry = root
				.inner
				.interface_tokens
				.write()
				.unwrap_or_else(PoisonError::into_inner);
			registry
				.entry(name.to_string())
				.or_insert_with(|| RawToken::mint(Some(name)))
				.clone()
		};
		if !Arc::ptr_eq(&self.inner, &root.inner) {
			self.inner
				.interface_tokens
				.write()
				.unwrap_or_else(PoisonError::into_inner)
				.insert(name.to_string(), minted.clone());
		}
		minted
	}

	/// Non-minting probe of the interface-name registry.
	pub fn lookup_interface_token(&self, name: &str) -> Option<RawToken> {
		self.chain().into_iter().find_map(|container| {
			container
				.inner
				.interface_tokens
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.get(name)
				.cloned()
		})
	}

	/// String-keyed resolve through the interface-name registry.
	pub fn resolve_interface<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
		let token = self.interface_token(name);
		self.resolve_raw(&token)
			.and_then(|value| downcast(value, &token))
	}

	/// Async variant of [`Container::resolve_interface`].
	pub async fn resolve_interface_async<T: Any + Send + Sync>(
		&self,
		name: &str,
	) -> DiResult<Arc<T>> {
		let token = self.interface_token(name);
		self.resolve_raw_async(&token)
			.await
			.and_then(|value| downcast(value, &token))
	}

	/// String-keyed [`Container::resolve_all`].
	pub fn resolve_interface_all<T: Any + Send + Sync>(
		&self,
		name: &str,
	) -> DiResult<Vec<Arc<T>>> {
		match self.lookup_interface_token(name) {
			Some(token) => self
				.resolve_all_raw(&token)?
				.into_iter()
				.map(|value| downcast(value, &token))
				.collect(),
			None => Ok(Vec::new()),
		}
	}

	// ----- disposal -----

	/// Disposes every cached singleton with a teardown hook, in reverse
	/// order of first resolution, then marks the container permanently
	/// inert.
	///
	/// Every instance gets a disposal attempt even if an earlier hook
	/// fails; failures are collected into [`DiError::DisposeFailed`].
	/// Calling `dispose` again is a no-op.
	pub async fn dispose(&self) -> DiResult<()> {
		if self.inner.disposed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		debug!("disposing container");
		let order: Vec<RawToken> = {
			let mut order = self
				.inner
				.singleton_order
				.lock()
				.unwrap_or_else(PoisonError::into_inner);
			std::mem::take(&mut *order)
		};
		let mut failures = Vec::new();
		for token in order.into_iter().rev() {
			let instance = self
				.inner
				.singletons
				.write()
				.unwrap_or_else(PoisonError::into_inner)
				.remove(&token.id());
			let Some(instance) = instance else { continue };
			let hook = self
				.inner
				.bindings
				.read()
				.unwrap_or_else(PoisonError::into_inner)
				.get(&token.id())
				.and_then(|binding| binding.dispose.clone());
			let Some(hook) = hook else { continue };
			if let Err(error) = hook.invoke(instance).await {
				warn!(token = %token, %error, "dispose hook failed");
				failures.push((token.to_string(), error.to_string()));
			}
		}
		self.inner
			.singletons
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.clear();
		self.inner
			.fast_singletons
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.clear();
		if failures.is_empty() {
			Ok(())
		} else {
			Err(DiError::DisposeFailed { failures })
		}
	}
}

impl Default for Container {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let bindings = self
			.inner
			.bindings
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.len();
		f.debug_struct("Container")
			.field("bindings", &bindings)
			.field("has_parent", &self.inner.parent.is_some())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

/// Handle passed to factories and constructors during resolution.
///
/// Resolutions made through it join the calling resolve tree, so cycle
/// detection and per-request caching span nested factory calls.
#[derive(Clone)]
pub struct Resolver {
	container: Container,
	context: Arc<ResolutionContext>,
}

impl Resolver {
	pub(crate) fn new(container: Container, context: Arc<ResolutionContext>) -> Self {
		Self { container, context }
	}

	/// The container the resolution was invoked on.
	pub fn container(&self) -> &Container {
		&self.container
	}

	pub fn resolve<T: Any + Send + Sync>(&self, token: &Token<T>) -> DiResult<Arc<T>> {
		self.resolve_raw(token.raw())
			.and_then(|value| downcast(value, token.raw()))
	}

	pub fn resolve_raw(&self, token: &RawToken) -> DiResult<AnyArc> {
		self.container.resolve_in(&self.context, token)
	}

	pub async fn resolve_async<T: Any + Send + Sync>(&self, token: &Token<T>) -> DiResult<Arc<T>> {
		self.resolve_raw_async(token.raw())
			.await
			.and_then(|value| downcast(value, token.raw()))
	}

	pub async fn resolve_raw_async(&self, token: &RawToken) -> DiResult<AnyArc> {
		self.container.resolve_in_async(&self.context, token).await
	}

	pub fn resolve_interface<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
		let token = self.container.interface_token(name);
		self.resolve_raw(&token)
			.and_then(|value| downcast(value, &token))
	}
}
