use std::cell::{Cell, OnceCell, Ref, RefCell};
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::binding::HostBinding;
use crate::context::Context;
use crate::error::{HookKind, LifecycleError, TaskError};
use crate::event::{start_work, EventArgs, EventCallback, EventCompletion, Task, WorkState};
use crate::producer::{RenderProducer, RenderSource};
use crate::render_tree::RenderBuilder;
use crate::{Component, ComponentId};

pub(crate) struct ControllerInner<C: Component> {
    pub(crate) component: RefCell<C>,
    pub(crate) binding: OnceCell<HostBinding>,
    pub(crate) loading: Cell<bool>,
    first_render_cycle: Cell<bool>,
    never_rendered: Cell<bool>,
    pending_render: Cell<bool>,
    after_render_called: Cell<bool>,
    this: Weak<ControllerInner<C>>,
}

impl<C: Component> ControllerInner<C> {
    fn context(&self) -> Context<C> {
        Context::new(self.this.clone())
    }

    pub(crate) fn binding(&self) -> Result<&HostBinding, LifecycleError> {
        self.binding.get().ok_or(LifecycleError::NotAttached)
    }

    fn component_id(&self) -> Option<ComponentId> {
        self.binding.get().map(HostBinding::component_id)
    }

    /// Route a render request through the dispatcher.
    pub(crate) fn dispatch_render_request(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        let binding = match self.binding() {
            Ok(binding) => binding,
            Err(err) => return future::ready(Err(err)).boxed_local(),
        };
        let weak = self.this.clone();
        binding.dispatch(Box::new(move || match weak.upgrade() {
            Some(inner) => inner.request_render_now(),
            None => Ok(()),
        }))
    }

    /// Coalescing core. Only ever runs as dispatcher work.
    pub(crate) fn request_render_now(self: &Rc<Self>) -> Result<(), LifecycleError> {
        let binding = self.binding()?;
        if !binding.dispatcher().check_access() {
            return Err(LifecycleError::WrongContext);
        }
        let component = binding.component_id();
        if self.pending_render.get() {
            log::trace!("component {component}: render already pending, request coalesced");
            return Ok(());
        }
        if !self.never_rendered.get() && !self.component_should_render() {
            log::trace!("component {component}: should_render declined");
            return Ok(());
        }
        self.pending_render.set(true);
        let owner: Rc<dyn RenderSource> = self.clone();
        if let Err(source) = binding.enqueue_render(RenderProducer::new(owner)) {
            self.pending_render.set(false);
            return Err(LifecycleError::Enqueue { component, source });
        }
        Ok(())
    }

    fn component_should_render(&self) -> bool {
        match self.component.try_borrow() {
            Ok(component) => component.should_render(),
            // Mid-mutation; the state about to land is worth a render.
            Err(_) => true,
        }
    }

    fn with_component_mut<R>(
        &self,
        f: impl FnOnce(&mut C, &Context<C>) -> R,
    ) -> Result<R, LifecycleError> {
        let ctx = self.context();
        let mut component = self
            .component
            .try_borrow_mut()
            .map_err(|_| LifecycleError::ComponentBusy)?;
        Ok(f(&mut component, &ctx))
    }

    /// Shared by `update` and `reset`: run `on_render`, then request a render.
    fn start_render_cycle(self: &Rc<Self>) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        self.loading.set(true);
        let first_render = self.first_render_cycle.get();
        log::debug!(
            "component {:?}: render cycle (first_render = {first_render})",
            self.component_id()
        );
        let task = match self.with_component_mut(|component, ctx| component.on_render(ctx, first_render)) {
            Ok(task) => task,
            Err(err) => return future::ready(Err(err)).boxed_local(),
        };
        // Cleared once the hook hands back its task, so an overlapping cycle
        // sees `false`. A failing hook gives the flag back.
        if first_render {
            self.first_render_cycle.set(false);
        }
        let inner = Rc::clone(self);
        async move {
            if let Err(source) = task.await {
                if first_render {
                    inner.first_render_cycle.set(true);
                }
                return Err(LifecycleError::hook(HookKind::OnRender, source));
            }
            inner.loading.set(false);
            inner.dispatch_render_request().await
        }
        .boxed_local()
    }

    fn continue_event(self: Rc<Self>, work: Task) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        async move {
            match work.await {
                Ok(()) => self.dispatch_render_request().await,
                Err(TaskError::Cancelled) => {
                    log::debug!(
                        "component {:?}: event work cancelled, skipping render",
                        self.component_id()
                    );
                    Ok(())
                }
                Err(TaskError::Failed(source)) => Err(LifecycleError::Callback { source }),
            }
        }
        .boxed_local()
    }
}

impl<C: Component> RenderSource for ControllerInner<C> {
    fn produce(&self, builder: &mut RenderBuilder) {
        self.pending_render.set(false);
        self.never_rendered.set(false);
        let ctx = self.context();
        match self.component.try_borrow() {
            Ok(component) => component.build(&ctx, builder),
            Err(_) => log::warn!(
                "component {:?}: borrowed during render, view left empty",
                self.component_id()
            ),
        }
    }

    fn abandon(&self) {
        log::trace!(
            "component {:?}: queued render dropped unrun",
            self.component_id()
        );
        self.pending_render.set(false);
    }
}

/// Point-in-time copy of a controller's lifecycle flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub attached: bool,
    pub loading: bool,
    pub first_render_cycle: bool,
    pub never_rendered: bool,
    pub pending_render: bool,
    pub after_render_called: bool,
}

/// Lifecycle controller for one component node.
///
/// Cloning yields another handle to the same controller.
pub struct Controller<C: Component> {
    inner: Rc<ControllerInner<C>>,
}

impl<C: Component> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C: Component> Controller<C> {
    pub fn new(component: C) -> Self {
        let inner = Rc::new_cyclic(|this| ControllerInner {
            component: RefCell::new(component),
            binding: OnceCell::new(),
            loading: Cell::new(true),
            first_render_cycle: Cell::new(false),
            never_rendered: Cell::new(true),
            pending_render: Cell::new(false),
            after_render_called: Cell::new(false),
            this: this.clone(),
        });
        Self { inner }
    }

    /// Bind the controller to its host. Valid exactly once per instance.
    pub fn attach(&self, binding: HostBinding) -> Result<(), LifecycleError> {
        let component = binding.component_id();
        if let Err(rejected) = self.inner.binding.set(binding) {
            let attached = self.component_id().unwrap_or(rejected.component_id());
            log::error!("component {attached}: attach called twice");
            return Err(LifecycleError::AlreadyAttached {
                component: attached,
            });
        }
        self.inner.first_render_cycle.set(true);
        log::debug!("component {component}: attached");
        Ok(())
    }

    /// Apply new inputs and run a render cycle.
    ///
    /// A failing `on_render` aborts the cycle and leaves `loading` set.
    pub fn update(&self, params: C::Params) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        if let Err(err) = self.inner.binding() {
            return future::ready(Err(err)).boxed_local();
        }
        if let Err(err) = self.inner.with_component_mut(|component, _| component.set_parameters(params)) {
            return future::ready(Err(err)).boxed_local();
        }
        self.inner.start_render_cycle()
    }

    /// Behave as if freshly attached: the next cycle is a first render and
    /// its render bypasses `should_render`.
    pub fn reset(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        if let Err(err) = self.inner.binding() {
            return future::ready(Err(err)).boxed_local();
        }
        log::debug!("component {:?}: reset", self.component_id());
        self.inner.first_render_cycle.set(true);
        self.inner.never_rendered.set(true);
        self.inner.start_render_cycle()
    }

    pub fn request_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        self.inner.dispatch_render_request()
    }

    /// See [`Context::invoke`].
    pub fn invoke(
        &self,
        f: impl FnOnce(&mut C) + 'static,
    ) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        self.inner.context().invoke(f)
    }

    /// Host notification that a producer from this controller has been applied.
    pub fn notify_after_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        let first_render = !self.inner.after_render_called.replace(true);
        let task = match self
            .inner
            .with_component_mut(|component, ctx| component.on_after_render(ctx, first_render))
        {
            Ok(task) => task,
            Err(err) => return future::ready(Err(err)).boxed_local(),
        };
        async move {
            task.await
                .map_err(|source| LifecycleError::hook(HookKind::OnAfterRender, source))
        }
        .boxed_local()
    }

    /// Invoke `callback` and render for it.
    ///
    /// One render request is dispatched whatever the callback's state. If the
    /// callback is still running, the returned [`EventCompletion::Deferred`]
    /// requests a second render once it succeeds; cancellation ends it quietly.
    /// If the immediate request is rejected, pending work is driven to its end
    /// before the rejection is returned.
    pub fn handle_event(
        &self,
        callback: &EventCallback,
        args: EventArgs,
    ) -> LocalBoxFuture<'static, Result<EventCompletion, LifecycleError>> {
        let state = start_work(callback.invoke(args));
        let immediate = self.inner.dispatch_render_request();
        let inner = Rc::clone(&self.inner);
        async move {
            if let Err(err) = immediate.await {
                // The work still runs to its end; its render is lost with the host.
                if let WorkState::Pending(work) = state {
                    if let Err(outcome) = work.await {
                        log::debug!(
                            "component {:?}: event work ended after rejected render: {outcome}",
                            inner.component_id()
                        );
                    }
                }
                return Err(err);
            }
            match state {
                WorkState::Completed => Ok(EventCompletion::Settled),
                WorkState::Cancelled => {
                    log::debug!(
                        "component {:?}: event work cancelled before suspending",
                        inner.component_id()
                    );
                    Ok(EventCompletion::Settled)
                }
                WorkState::Failed(source) => Err(LifecycleError::Callback { source }),
                WorkState::Pending(work) => Ok(EventCompletion::Deferred(inner.continue_event(work))),
            }
        }
        .boxed_local()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.get()
    }

    pub fn component_id(&self) -> Option<ComponentId> {
        self.inner.component_id()
    }

    pub fn context(&self) -> Context<C> {
        self.inner.context()
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        let inner = &self.inner;
        LifecycleSnapshot {
            attached: inner.binding.get().is_some(),
            loading: inner.loading.get(),
            first_render_cycle: inner.first_render_cycle.get(),
            never_rendered: inner.never_rendered.get(),
            pending_render: inner.pending_render.get(),
            after_render_called: inner.after_render_called.get(),
        }
    }

    /// Borrow the component. Panics if a lifecycle step holds it mutably.
    pub fn component(&self) -> Ref<'_, C> {
        self.inner.component.borrow()
    }

    pub fn with_component<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.component.borrow())
    }
}

/// Host capability: deliver the binding.
pub trait Attachable {
    fn attach(&self, binding: HostBinding) -> Result<(), LifecycleError>;
}

/// Host capability: route a UI event to a callback owned by this component.
pub trait EventHandleable {
    fn handle_event(
        &self,
        callback: &EventCallback,
        args: EventArgs,
    ) -> LocalBoxFuture<'static, Result<EventCompletion, LifecycleError>>;
}

/// Host capability: signal that a queued render was applied.
pub trait AfterRenderNotifiable {
    fn notify_after_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>>;
}

impl<C: Component> Attachable for Controller<C> {
    fn attach(&self, binding: HostBinding) -> Result<(), LifecycleError> {
        Controller::attach(self, binding)
    }
}

impl<C: Component> EventHandleable for Controller<C> {
    fn handle_event(
        &self,
        callback: &EventCallback,
        args: EventArgs,
    ) -> LocalBoxFuture<'static, Result<EventCompletion, LifecycleError>> {
        Controller::handle_event(self, callback, args)
    }
}

impl<C: Component> AfterRenderNotifiable for Controller<C> {
    fn notify_after_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        Controller::notify_after_render(self)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
