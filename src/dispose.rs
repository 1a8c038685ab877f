//! Structured teardown for cached singleton instances

use std::any::type_name;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::binding::AnyArc;
use crate::error::{DiError, DiResult};

/// Teardown hook for services that hold resources.
///
/// Implement this for singletons that need structured cleanup (flushing
/// buffers, closing connections). When the owning container is disposed,
/// hooks run in reverse order of first resolution, and every instance gets an
/// attempt even if an earlier one fails.
///
/// # Examples
///
/// ```
/// use wirebox::{Dispose, DiResult};
///
/// struct ConnectionPool {
/// 	name: String,
/// }
///
/// #[async_trait::async_trait]
/// impl Dispose for ConnectionPool {
/// 	async fn dispose(&self) -> DiResult<()> {
/// 		// drain and close connections
/// 		let _ = &self.name;
/// 		Ok(())
/// 	}
/// }
/// ```
#[async_trait::async_trait]
pub trait Dispose: Send + Sync + 'static {
	async fn dispose(&self) -> DiResult<()>;
}

type HookFn = Arc<dyn Fn(AnyArc) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;

/// Type-erased adapter invoking [`Dispose`] on a cached instance.
///
/// Bindings carry an optional hook; the container only stores erased values,
/// so the concrete type is captured here at registration time.
#[derive(Clone)]
pub struct DisposeHook(HookFn);

impl DisposeHook {
	/// Builds a hook that downcasts the cached instance to `T` and runs its
	/// [`Dispose`] implementation.
	pub fn of<T: Dispose>() -> Self {
		let hook: HookFn = Arc::new(|instance: AnyArc| {
			Box::pin(async move {
				match instance.downcast::<T>() {
					Ok(value) => value.dispose().await,
					Err(_) => Err(DiError::TypeMismatch {
						token: "<dispose hook>".to_string(),
						expected: type_name::<T>(),
					}),
				}
			})
		});
		Self(hook)
	}

	pub(crate) fn invoke(&self, instance: AnyArc) -> BoxFuture<'static, DiResult<()>> {
		(self.0)(instance)
	}
}
