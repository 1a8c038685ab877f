//! Per-call-tree resolution state: cycle detection and per-request caching
//!
//! One [`ResolutionContext`] spans one top-level `resolve`/`resolve_async`
//! call tree. It tracks the set of tokens currently being resolved (for
//! deterministic cycle detection with a displayable path) and memoizes
//! per-request instances so every branch of the tree observes the same one.
//! Contexts are pooled and reset between trees; they must never outlive the
//! tree they were acquired for.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::binding::AnyArc;
use crate::error::{DiError, DiResult, ResolutionPath};
use crate::token::{RawToken, TokenId};

/// Bound on the number of idle contexts retained for reuse. Overflow is
/// simply dropped; this is a free-list, not a concurrency limit.
const MAX_POOLED_CONTEXTS: usize = 8;

#[derive(Default)]
struct ContextState {
	resolving: HashSet<TokenId>,
	path: Vec<(TokenId, String)>,
	per_request: HashMap<TokenId, AnyArc>,
}

pub(crate) struct ResolutionContext {
	state: Mutex<ContextState>,
}

impl ResolutionContext {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(ContextState::default()),
		}
	}

	/// Fails with the full cycle path if `token` is already being resolved
	/// in this tree.
	pub(crate) fn check_cycle(&self, token: &RawToken) -> DiResult<()> {
		let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		if !state.resolving.contains(&token.id()) {
			return Ok(());
		}
		// Render the cycle with the repeated token at both ends.
		let start = state
			.path
			.iter()
			.position(|(id, _)| *id == token.id())
			.unwrap_or(0);
		let mut segments: Vec<String> =
			state.path[start..].iter().map(|(_, label)| label.clone()).collect();
		segments.push(token.to_string());
		Err(DiError::CircularDependency {
			path: ResolutionPath::new(segments),
		})
	}

	/// Marks `token` as resolving and returns a guard that unmarks it on
	/// drop, including on error and future cancellation.
	pub(crate) fn guard<'a>(&'a self, token: &RawToken) -> DiResult<ResolveGuard<'a>> {
		self.check_cycle(token)?;
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.resolving.insert(token.id());
		state.path.push((token.id(), token.to_string()));
		Ok(ResolveGuard {
			context: self,
			id: token.id(),
		})
	}

	fn end(&self, id: TokenId) {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.resolving.remove(&id);
		if let Some(pos) = state.path.iter().rposition(|(entry, _)| *entry == id) {
			state.path.remove(pos);
		}
	}

	/// Tokens visited so far, for diagnostics on lookup failures.
	pub(crate) fn current_path(&self) -> ResolutionPath {
		let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		ResolutionPath::new(state.path.iter().map(|(_, label)| label.clone()).collect())
	}

	pub(crate) fn per_request_get(&self, id: TokenId) -> Option<AnyArc> {
		let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.per_request.get(&id).cloned()
	}

	pub(crate) fn per_request_insert(&self, id: TokenId, value: AnyArc) {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.per_request.insert(id, value);
	}

	fn reset(&self) {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.resolving.clear();
		state.path.clear();
		state.per_request.clear();
	}
}

/// RAII guard keeping a token marked as resolving for its scope.
pub(crate) struct ResolveGuard<'a> {
	context: &'a ResolutionContext,
	id: TokenId,
}

impl Drop for ResolveGuard<'_> {
	fn drop(&mut self) {
		self.context.end(self.id);
	}
}

/// Bounded free-list of reusable contexts.
pub(crate) struct ContextPool {
	free: Mutex<Vec<Arc<ResolutionContext>>>,
}

impl ContextPool {
	pub(crate) fn new() -> Self {
		Self {
			free: Mutex::new(Vec::new()),
		}
	}

	pub(crate) fn acquire(&self) -> Arc<ResolutionContext> {
		let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
		free.pop().unwrap_or_else(|| Arc::new(ResolutionContext::new()))
	}

	/// Resets and retains the context for reuse. A context some factory kept
	/// a handle to is dropped instead of pooled, so a stale handle can never
	/// alias a later call tree's state.
	pub(crate) fn release(&self, context: Arc<ResolutionContext>) {
		context.reset();
		if Arc::strong_count(&context) != 1 {
			return;
		}
		let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
		if free.len() < MAX_POOLED_CONTEXTS {
			free.push(context);
		}
	}
}
