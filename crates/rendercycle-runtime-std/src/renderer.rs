use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use ahash::RandomState;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use hashbrown::HashMap;
use rendercycle_core::{
    AfterRenderNotifiable, Component, ComponentId, Controller, Dispatcher, EventArgs,
    EventCallback, EventCompletion, EventHandleable, HostBinding, HostError, LifecycleError,
    RenderBuilder, RenderHost, RenderProducer, RenderTree,
};

use crate::dispatcher::StdDispatcher;

/// Bounds applied by [`StdRenderer::flush`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererOptions {
    /// Upper bound on pump passes per flush.
    pub max_flush_passes: usize,
    /// Upper bound on producers executed per pass.
    pub max_renders_per_pass: usize,
}

impl RendererOptions {
    pub fn with_max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }

    pub fn with_max_renders_per_pass(mut self, renders: usize) -> Self {
        self.max_renders_per_pass = renders.max(1);
        self
    }
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            max_flush_passes: 64,
            max_renders_per_pass: 1024,
        }
    }
}

/// Capabilities the renderer needs from a mounted controller, type-erased.
trait HostedComponent {
    fn handle_event(
        &self,
        callback: &EventCallback,
        args: EventArgs,
    ) -> LocalBoxFuture<'static, Result<EventCompletion, LifecycleError>>;

    fn notify_after_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>>;
}

impl<T: EventHandleable + AfterRenderNotifiable> HostedComponent for T {
    fn handle_event(
        &self,
        callback: &EventCallback,
        args: EventArgs,
    ) -> LocalBoxFuture<'static, Result<EventCompletion, LifecycleError>> {
        EventHandleable::handle_event(self, callback, args)
    }

    fn notify_after_render(&self) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        AfterRenderNotifiable::notify_after_render(self)
    }
}

struct MountedComponent {
    component: Rc<dyn HostedComponent>,
    tree: Option<RenderTree>,
    renders: usize,
}

struct RendererState {
    components: RefCell<HashMap<ComponentId, MountedComponent, RandomState>>,
    render_queue: RefCell<VecDeque<(ComponentId, RenderProducer)>>,
    disposed: Cell<bool>,
}

impl RendererState {
    fn enqueue(&self, component: ComponentId, producer: RenderProducer) -> Result<(), HostError> {
        if self.disposed.get() {
            return Err(HostError::Disposed);
        }
        if !self.components.borrow().contains_key(&component) {
            return Err(HostError::UnknownComponent(component));
        }
        self.render_queue.borrow_mut().push_back((component, producer));
        Ok(())
    }
}

/// The [`RenderHost`] handed to controllers. Holds the renderer weakly so
/// mounted controllers do not keep it alive.
struct HostPort {
    dispatcher: Rc<StdDispatcher>,
    state: Weak<RendererState>,
}

impl RenderHost for HostPort {
    fn dispatcher(&self) -> Rc<dyn Dispatcher> {
        self.dispatcher.clone()
    }

    fn enqueue_render(
        &self,
        component: ComponentId,
        producer: RenderProducer,
    ) -> Result<(), HostError> {
        let state = self.state.upgrade().ok_or(HostError::Disposed)?;
        state.enqueue(component, producer)?;
        self.dispatcher.wake();
        Ok(())
    }
}

/// Single-threaded render host.
///
/// Runs lifecycle futures on a [`LocalPool`], executes queued producers on
/// its dispatcher context and notifies components after each applied render.
pub struct StdRenderer {
    dispatcher: Rc<StdDispatcher>,
    state: Rc<RendererState>,
    port: Rc<HostPort>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    next_id: Cell<ComponentId>,
    errors: Rc<RefCell<Vec<LifecycleError>>>,
    options: RendererOptions,
}

impl StdRenderer {
    pub fn new() -> Self {
        Self::with_options(RendererOptions::default())
    }

    pub fn with_options(options: RendererOptions) -> Self {
        let dispatcher = Rc::new(StdDispatcher::new());
        let state = Rc::new(RendererState {
            components: RefCell::new(HashMap::with_hasher(RandomState::new())),
            render_queue: RefCell::new(VecDeque::new()),
            disposed: Cell::new(false),
        });
        let port = Rc::new(HostPort {
            dispatcher: Rc::clone(&dispatcher),
            state: Rc::downgrade(&state),
        });
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            dispatcher,
            state,
            port,
            pool: RefCell::new(pool),
            spawner,
            next_id: Cell::new(1),
            errors: Rc::new(RefCell::new(Vec::new())),
            options,
        }
    }

    pub fn options(&self) -> RendererOptions {
        self.options
    }

    pub fn dispatcher(&self) -> Rc<StdDispatcher> {
        Rc::clone(&self.dispatcher)
    }

    /// Register `component` under a fresh id and attach its controller.
    pub fn mount<C: Component>(&self, component: C) -> Result<Controller<C>, LifecycleError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let controller = Controller::new(component);
        self.state.components.borrow_mut().insert(
            id,
            MountedComponent {
                component: Rc::new(controller.clone()),
                tree: None,
                renders: 0,
            },
        );
        let port: Rc<dyn RenderHost> = self.port.clone();
        controller.attach(HostBinding::new(id, port))?;
        log::debug!("renderer: mounted component {id}");
        Ok(controller)
    }

    /// Forget `component` and drop its queued renders. Further render
    /// requests fail with [`HostError::UnknownComponent`].
    pub fn remove(&self, component: ComponentId) -> bool {
        let removed = self.state.components.borrow_mut().remove(&component).is_some();
        if removed {
            self.state
                .render_queue
                .borrow_mut()
                .retain(|(id, _)| *id != component);
            log::debug!("renderer: removed component {component}");
        }
        removed
    }

    /// Reject every later render request with [`HostError::Disposed`].
    pub fn dispose(&self) {
        self.state.disposed.set(true);
        self.state.render_queue.borrow_mut().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }

    /// Run `future` on the renderer's pool. A failure is logged and kept for
    /// [`StdRenderer::take_errors`].
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = Result<(), LifecycleError>> + 'static,
    {
        let errors = Rc::clone(&self.errors);
        let spawned = self.spawner.spawn_local(async move {
            if let Err(err) = future.await {
                log::error!("renderer: lifecycle task failed: {err}");
                errors.borrow_mut().push(err);
            }
        });
        if let Err(err) = spawned {
            log::error!("renderer: unable to spawn lifecycle task: {err}");
        }
    }

    /// Drive `future` and everything it triggers until the renderer is idle.
    ///
    /// Returns `None` if the future is still waiting on something the
    /// renderer cannot make progress on.
    pub fn block_on<T, F>(&self, future: F) -> Option<T>
    where
        T: 'static,
        F: Future<Output = T> + 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let output = Rc::clone(&slot);
        let spawned = self.spawner.spawn_local(async move {
            *output.borrow_mut() = Some(future.await);
        });
        if let Err(err) = spawned {
            log::error!("renderer: unable to spawn future: {err}");
            return None;
        }
        self.flush();
        let result = slot.borrow_mut().take();
        result
    }

    /// Route `event` to the handler the component registered in its latest
    /// render and keep its deferred work running on the pool.
    pub fn dispatch_event(
        &self,
        component: ComponentId,
        event: &str,
        args: EventArgs,
    ) -> Result<(), HostError> {
        let (hosted, callback) = {
            let components = self.state.components.borrow();
            let mounted = components
                .get(&component)
                .ok_or(HostError::UnknownComponent(component))?;
            let callback = mounted
                .tree
                .as_ref()
                .and_then(|tree| tree.handler(event))
                .cloned()
                .ok_or_else(|| HostError::MissingHandler {
                    component,
                    event: event.to_owned(),
                })?;
            (Rc::clone(&mounted.component), callback)
        };
        log::trace!("renderer: `{event}` -> component {component}");
        let handling = self
            .dispatcher
            .enter(|| hosted.handle_event(&callback, args));
        self.spawn(async move { handling.await?.finish().await });
        Ok(())
    }

    /// Pump until no task, dispatched work or render makes progress.
    ///
    /// Returns the number of units processed.
    pub fn flush(&self) -> usize {
        let mut total = 0;
        for _ in 0..self.options.max_flush_passes {
            let progressed = self.pump();
            if progressed == 0 {
                return total;
            }
            total += progressed;
        }
        log::warn!(
            "renderer: flush stopped after {} passes with work outstanding",
            self.options.max_flush_passes
        );
        total
    }

    fn pump(&self) -> usize {
        let mut progressed = 0;
        {
            let mut pool = self.pool.borrow_mut();
            while pool.try_run_one() {
                progressed += 1;
            }
        }
        progressed += self.dispatcher.run_pending();
        progressed += self.run_renders();
        progressed
    }

    fn run_renders(&self) -> usize {
        let mut rendered = 0;
        while rendered < self.options.max_renders_per_pass {
            let next = self.state.render_queue.borrow_mut().pop_front();
            let Some((id, producer)) = next else {
                return rendered;
            };
            if !self.state.components.borrow().contains_key(&id) {
                log::debug!("renderer: dropping render for removed component {id}");
                continue;
            }
            let mut builder = RenderBuilder::new();
            self.dispatcher.enter(|| producer.render(&mut builder));
            let tree = builder.finish();
            rendered += 1;

            let hosted = {
                let mut components = self.state.components.borrow_mut();
                components.get_mut(&id).map(|mounted| {
                    mounted.tree = Some(tree);
                    mounted.renders += 1;
                    Rc::clone(&mounted.component)
                })
            };
            if let Some(hosted) = hosted {
                self.spawn(hosted.notify_after_render());
            }
        }
        if !self.state.render_queue.borrow().is_empty() {
            log::warn!(
                "renderer: {} renders deferred to the next pass",
                self.state.render_queue.borrow().len()
            );
        }
        rendered
    }

    /// Latest tree applied for `component`.
    pub fn rendered(&self, component: ComponentId) -> Option<RenderTree> {
        self.state
            .components
            .borrow()
            .get(&component)
            .and_then(|mounted| mounted.tree.clone())
    }

    /// Number of renders applied for `component`.
    pub fn render_count(&self, component: ComponentId) -> usize {
        self.state
            .components
            .borrow()
            .get(&component)
            .map(|mounted| mounted.renders)
            .unwrap_or(0)
    }

    pub fn queued_renders(&self) -> usize {
        self.state.render_queue.borrow().len()
    }

    pub fn is_mounted(&self, component: ComponentId) -> bool {
        self.state.components.borrow().contains_key(&component)
    }

    /// Failures reported by spawned lifecycle tasks since the last call.
    pub fn take_errors(&self) -> Vec<LifecycleError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }

    /// Registers a hook invoked whenever work is queued on this renderer.
    pub fn set_wake_hook(&self, hook: impl Fn() + 'static) {
        self.dispatcher.set_wake_hook(hook);
    }

    pub fn clear_wake_hook(&self) {
        self.dispatcher.clear_wake_hook();
    }
}

impl Default for StdRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRenderer")
            .field("dispatcher", &self.dispatcher)
            .field("mounted", &self.state.components.borrow().len())
            .field("queued_renders", &self.queued_renders())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
