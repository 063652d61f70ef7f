//! Client-side synchronization of server-owned state: sequenced caches,
//! interval polling and guarded mutations.

pub mod invoker;
pub mod poller;
pub mod resource;
pub mod store;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api::ApiError;

pub use invoker::{ActionRequest, Confirmation, InvokeError, TransitionInvoker};
pub use poller::{spawn_poller, PollHandle, PollPolicy, PollStats};
pub use resource::LiveResource;
pub use store::{EntityCell, Ticket};

/// Boxed future returned by a fetch closure.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// Repeatable fetch of one server-owned value.
pub type FetchFn<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// Where an error surfaced. Decides whether the user sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// First fetch when a view mounts; returned to the caller.
    InitialLoad,
    /// User-requested refresh; returned to the caller.
    Manual,
    /// Interval poll; logged and counted only.
    BackgroundPoll,
    /// Action invocation; returned and kept as the view's banner.
    Mutation,
}
