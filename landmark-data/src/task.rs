//! Helpers for isolating spawned work.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

/// Drive `work`, turning a panic into its message.
pub(crate) async fn catch_panic<F>(work: F) -> Result<F::Output, String>
where
    F: Future,
{
    AssertUnwindSafe(work).catch_unwind().await.map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".to_owned())
}
