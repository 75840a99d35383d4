//! Task-local ambient context, so async call chains can log with the
//! request's params without passing a [`Context`] through every signature.

use std::future::Future;

use crate::context::Context;

tokio::task_local! {
    static CURRENT: Context;
}

/// Runs `fut` with `ctx` as the current context. Nested scopes shadow the
/// outer one until they finish.
pub async fn scope<F: Future>(ctx: Context, fut: F) -> F::Output {
    CURRENT.scope(ctx, fut).await
}

pub fn sync_scope<R>(ctx: Context, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(ctx, f)
}

/// Current context, or an empty one outside any scope.
pub fn current() -> Context {
    CURRENT.try_with(Context::clone).unwrap_or_default()
}
