//! Host-side contracts the lifecycle controller calls into.
//!
//! The controller never owns an executor or a render queue. It receives both
//! from the host through a [`HostBinding`](crate::HostBinding) at attach time
//! and routes every render-state mutation through the [`Dispatcher`].

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::error::{HostError, LifecycleError};
use crate::producer::RenderProducer;
use crate::ComponentId;

/// A unit of work executed on the dispatcher's execution context.
pub type DispatchWork = Box<dyn FnOnce() -> Result<(), LifecycleError> + 'static>;

/// Single logical execution context shared by a component tree.
///
/// Work handed to [`dispatch`](Dispatcher::dispatch) runs to completion before
/// the next unit starts. The returned future resolves once the work has run,
/// carrying its result.
pub trait Dispatcher {
    /// Returns true when the caller is currently running on this dispatcher's
    /// execution context.
    fn check_access(&self) -> bool;

    /// Schedule `work` on the execution context.
    ///
    /// Implementations run the work inline when [`check_access`] already
    /// holds, and queue it otherwise.
    ///
    /// [`check_access`]: Dispatcher::check_access
    fn dispatch(&self, work: DispatchWork) -> LocalBoxFuture<'static, Result<(), LifecycleError>>;
}

/// The rendering engine as seen by a single component.
pub trait RenderHost {
    fn dispatcher(&self) -> Rc<dyn Dispatcher>;

    /// Queue `producer` for execution against the live view of `component`.
    fn enqueue_render(
        &self,
        component: ComponentId,
        producer: RenderProducer,
    ) -> Result<(), HostError>;
}
