use std::future::Future;
use std::pin::Pin;
use std::task::{Context as StdContext, Poll};

use crate::{Context, ContextRef};

pin_project_lite::pin_project! {
    /// A future wrapped with a [`Context`], returned by [`ContextFutExt::with_context`].
    ///
    /// Resolves to `None` once the context is done, even if the inner future has not
    /// finished; resolves to `Some(output)` if the inner future finishes first.
    pub struct FutureWithContext<'a, F> {
        #[pin]
        fut: F,
        #[pin]
        ctx: ContextRef<'a>,
    }
}

impl<'a, F: Future> Future for FutureWithContext<'a, F> {
    type Output = Option<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut StdContext<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if this.ctx.poll(cx).is_ready() {
            return Poll::Ready(None);
        }

        this.fut.poll(cx).map(Some)
    }
}

/// Extends every [`Future`] with [`ContextFutExt::with_context`].
pub trait ContextFutExt: Future + Sized {
    /// Attaches a [`Context`] (or `&Context`) to this future, so it resolves early to
    /// `None` if the context is cancelled before the future completes.
    fn with_context<'a>(self, ctx: impl Into<ContextRef<'a>>) -> FutureWithContext<'a, Self> {
        FutureWithContext {
            fut: self,
            ctx: ctx.into(),
        }
    }
}

impl<F: Future> ContextFutExt for F {}
