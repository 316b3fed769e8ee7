use std::rc::Weak;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::controller::ControllerInner;
use crate::error::{LifecycleError, TaskError};
use crate::event::{completed, EventArgs, EventCallback, Task};
use crate::{Component, ComponentId};

/// Handle given to hooks and `build`.
///
/// Holds the controller weakly. Once the controller is gone every operation
/// becomes a no-op.
pub struct Context<C: Component> {
    inner: Weak<ControllerInner<C>>,
}

impl<C: Component> Clone for Context<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Component> Context<C> {
    pub(crate) fn new(inner: Weak<ControllerInner<C>>) -> Self {
        Self { inner }
    }

    pub fn is_loading(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.loading.get())
            .unwrap_or(false)
    }

    pub fn component_id(&self) -> Option<ComponentId> {
        self.inner
            .upgrade()
            .and_then(|inner| inner.binding.get().map(|binding| binding.component_id()))
    }

    /// Ask for a render from outside the update and event paths.
    ///
    /// The request runs on the dispatcher and is coalesced with any render
    /// that is already pending.
    pub fn request_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        match self.inner.upgrade() {
            Some(inner) => inner.dispatch_render_request(),
            None => future::ready(Ok(())).boxed_local(),
        }
    }

    /// Mutate the component on the dispatcher context, then request a render.
    pub fn invoke(
        &self,
        f: impl FnOnce(&mut C) + 'static,
    ) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        let Some(inner) = self.inner.upgrade() else {
            return future::ready(Ok(())).boxed_local();
        };
        let binding = match inner.binding() {
            Ok(binding) => binding,
            Err(err) => return future::ready(Err(err)).boxed_local(),
        };
        let weak = self.inner.clone();
        binding.dispatch(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            {
                let mut component = inner
                    .component
                    .try_borrow_mut()
                    .map_err(|_| LifecycleError::ComponentBusy)?;
                f(&mut component);
            }
            inner.request_render_now()
        }))
    }

    /// Build an event callback bound to this component.
    ///
    /// The handler mutates the component synchronously and may return a task
    /// for work that continues after a suspension point.
    pub fn callback(&self, handler: impl Fn(&mut C, EventArgs) -> Task + 'static) -> EventCallback {
        let weak = self.inner.clone();
        EventCallback::from_fn(move |args| {
            let Some(inner) = weak.upgrade() else {
                return future::ready(Err(TaskError::Cancelled)).boxed_local();
            };
            let task = match inner.component.try_borrow_mut() {
                Ok(mut component) => handler(&mut component, args),
                Err(_) => {
                    future::ready(Err(TaskError::failed(LifecycleError::ComponentBusy)))
                        .boxed_local()
                }
            };
            task
        })
    }

    pub fn callback_sync(&self, handler: impl Fn(&mut C, EventArgs) + 'static) -> EventCallback {
        self.callback(move |component, args| {
            handler(component, args);
            completed()
        })
    }
}
