//! Panic recovery.
//!
//! Every request runs the rest of the chain inside a guarded scope. A panic
//! raised while the scope is being polled is caught, logged with its stack
//! and answered with a generic 500; it never reaches the connection task.
//!
//! The stack is gone by the time `catch_unwind` returns, so a process-wide
//! panic hook records it at the panic site. The hook only acts for panics
//! inside a guarded scope (tracked per thread) and defers to the previously
//! installed hook for everything else.
//!
//! Panics raised while a streaming body is being written happen after the
//! response head left this chain; hyper drops that connection instead.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use axum::{extract::Request, middleware::Next, response::Response};
use futures_util::FutureExt;

use crate::http::response::internal_error;

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Where a guarded panic happened.
#[derive(Debug, Default)]
struct PanicSite {
    location: String,
    backtrace: String,
}

/// Install the recording panic hook. Idempotent.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.try_with(Cell::get).unwrap_or(0) == 0 {
                previous(info);
                return;
            }

            let site = PanicSite {
                location: info.location().map(ToString::to_string).unwrap_or_default(),
                backtrace: Backtrace::force_capture().to_string(),
            };
            let _ = LAST_PANIC.try_with(|slot| *slot.borrow_mut() = Some(site));
        }));
    });
}

fn take_panic_site() -> PanicSite {
    LAST_PANIC
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Human-readable panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Marks the current thread as inside a guarded scope while alive.
struct GuardScope;

impl GuardScope {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        GuardScope
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        let _ = GUARD_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Future wrapper that polls its inner future inside a guarded scope.
struct Guarded<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Guarded<F> {
    fn new(inner: F) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<F: Future> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = GuardScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Middleware: turn a panic in any later stage into a 500.
pub async fn recover_panics(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    match AssertUnwindSafe(Guarded::new(next.run(request)))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(payload) => {
            let site = take_panic_site();
            tracing::error!(
                panic = %panic_message(payload.as_ref()),
                location = %site.location,
                stack = %site.backtrace,
                path = %path,
                method = %method,
                "panic_recovered"
            );
            internal_error()
        }
    }
}
