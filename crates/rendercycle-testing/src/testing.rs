use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt};
use rendercycle_core::{
    completed, Component, ComponentId, Context, Controller, EventArgs, HostError, LifecycleError,
    RenderBuilder, RenderTree, Task, TaskError,
};
use rendercycle_runtime_std::{RendererOptions, StdRenderer};

/// Headless harness for driving component lifecycles in tests.
///
/// Owns a [`StdRenderer`] and pumps it to idle after every entry point, so
/// assertions see the state once all dispatched work, renders and
/// after-render notifications have settled. Failures from spawned entry
/// points are kept for [`LifecycleTestRule::take_errors`].
pub struct LifecycleTestRule {
    renderer: StdRenderer,
}

impl LifecycleTestRule {
    pub fn new() -> Self {
        Self::with_options(RendererOptions::default())
    }

    pub fn with_options(options: RendererOptions) -> Self {
        Self {
            renderer: StdRenderer::with_options(options),
        }
    }

    /// Mount and attach `component`. No render happens until the first update.
    pub fn mount<C: Component>(&self, component: C) -> Result<Controller<C>, LifecycleError> {
        self.renderer.mount(component)
    }

    pub fn update<C: Component>(&self, controller: &Controller<C>, params: C::Params) {
        self.renderer.spawn(controller.update(params));
        self.pump_until_idle();
    }

    pub fn reset<C: Component>(&self, controller: &Controller<C>) {
        self.renderer.spawn(controller.reset());
        self.pump_until_idle();
    }

    pub fn request_render<C: Component>(&self, controller: &Controller<C>) {
        self.renderer.spawn(controller.request_render());
        self.pump_until_idle();
    }

    /// Deliver `event` to the handler from the component's latest render.
    pub fn dispatch_event(
        &self,
        component: ComponentId,
        event: &str,
        args: EventArgs,
    ) -> Result<(), HostError> {
        self.renderer.dispatch_event(component, event, args)?;
        self.pump_until_idle();
        Ok(())
    }

    pub fn click(&self, component: ComponentId) -> Result<(), HostError> {
        self.dispatch_event(component, "click", EventArgs::Empty)
    }

    /// Drive `future` to completion and return its output, or `None` if it
    /// stalls on something outside the renderer.
    pub fn run<T, F>(&self, future: F) -> Option<T>
    where
        T: 'static,
        F: Future<Output = T> + 'static,
    {
        self.renderer.block_on(future)
    }

    /// Drive the renderer until no task, dispatched work or render is left to
    /// make progress, within the renderer's flush bounds. Returns the units
    /// of work processed.
    pub fn pump_until_idle(&self) -> usize {
        self.renderer.flush()
    }

    pub fn render_count(&self, component: ComponentId) -> usize {
        self.renderer.render_count(component)
    }

    pub fn rendered(&self, component: ComponentId) -> Option<RenderTree> {
        self.renderer.rendered(component)
    }

    /// Text content of the latest render, empty if none was applied.
    pub fn text(&self, component: ComponentId) -> String {
        self.rendered(component)
            .map(|tree| tree.text_content())
            .unwrap_or_default()
    }

    pub fn take_errors(&self) -> Vec<LifecycleError> {
        self.renderer.take_errors()
    }

    /// Panics listing every failure reported since the last check.
    pub fn assert_no_errors(&self) {
        let errors = self.take_errors();
        assert!(
            errors.is_empty(),
            "lifecycle failures: {:?}",
            errors.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }

    pub fn renderer(&self) -> &StdRenderer {
        &self.renderer
    }
}

impl Default for LifecycleTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `LifecycleTestRule`.
pub fn run_test_lifecycle<R>(f: impl FnOnce(&LifecycleTestRule) -> R) -> R {
    let rule = LifecycleTestRule::new();
    f(&rule)
}

/// One observed lifecycle call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookCall {
    SetParameters(String),
    OnRender { first_render: bool },
    Build,
    OnAfterRender { first_render: bool },
}

/// Shared, ordered record of lifecycle calls.
#[derive(Clone, Debug, Default)]
pub struct HookLog {
    calls: Rc<RefCell<Vec<HookCall>>>,
}

impl HookLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: HookCall) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&HookCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| matches(call)).count()
    }

    pub fn builds(&self) -> usize {
        self.count(|call| *call == HookCall::Build)
    }

    /// `first_render` flags passed to `on_render`, in call order.
    pub fn on_render_flags(&self) -> Vec<bool> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                HookCall::OnRender { first_render } => Some(*first_render),
                _ => None,
            })
            .collect()
    }

    /// `first_render` flags passed to `on_after_render`, in call order.
    pub fn after_render_flags(&self) -> Vec<bool> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                HookCall::OnAfterRender { first_render } => Some(*first_render),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

#[derive(Default)]
struct ProbeShared {
    log: HookLog,
    decline_renders: Cell<bool>,
    fail_next_on_render: Cell<bool>,
    render_gate: RefCell<Option<oneshot::Receiver<()>>>,
    event_gate: RefCell<Option<oneshot::Receiver<()>>>,
}

/// Configurable component that records every lifecycle call it receives.
///
/// Renders `"{label}:{clicks}"` and registers `click` and `fail` handlers.
/// Behaviour is steered through the [`ProbeHandle`] returned alongside it.
pub struct ProbeComponent {
    label: String,
    clicks: u32,
    shared: Rc<ProbeShared>,
}

impl ProbeComponent {
    pub fn new() -> (Self, ProbeHandle) {
        let shared = Rc::new(ProbeShared::default());
        let probe = Self {
            label: String::new(),
            clicks: 0,
            shared: Rc::clone(&shared),
        };
        (probe, ProbeHandle { shared })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    fn gated(gate: Option<oneshot::Receiver<()>>) -> Task {
        match gate {
            Some(gate) => async move { gate.await.map_err(|_| TaskError::Cancelled) }.boxed_local(),
            None => completed(),
        }
    }
}

impl Component for ProbeComponent {
    type Params = String;

    fn set_parameters(&mut self, label: String) {
        self.shared.log.record(HookCall::SetParameters(label.clone()));
        self.label = label;
    }

    fn build(&self, ctx: &Context<Self>, builder: &mut RenderBuilder) {
        self.shared.log.record(HookCall::Build);
        builder
            .open("probe")
            .text(format!("{}:{}", self.label, self.clicks))
            .on(
                "click",
                ctx.callback(|probe, _| {
                    probe.clicks += 1;
                    let gate = probe.shared.event_gate.borrow_mut().take();
                    Self::gated(gate)
                }),
            )
            .on(
                "fail",
                ctx.callback(|_, _| {
                    future::ready(Err(TaskError::failed("probe handler failed"))).boxed_local()
                }),
            )
            .close();
    }

    fn on_render(&mut self, _ctx: &Context<Self>, first_render: bool) -> Task {
        self.shared.log.record(HookCall::OnRender { first_render });
        if self.shared.fail_next_on_render.replace(false) {
            return future::ready(Err(TaskError::failed("probe on_render failed"))).boxed_local();
        }
        let gate = self.shared.render_gate.borrow_mut().take();
        Self::gated(gate)
    }

    fn on_after_render(&mut self, _ctx: &Context<Self>, first_render: bool) -> Task {
        self.shared.log.record(HookCall::OnAfterRender { first_render });
        completed()
    }

    fn should_render(&self) -> bool {
        !self.shared.decline_renders.get()
    }
}

/// Steers a [`ProbeComponent`] after it has been mounted.
#[derive(Clone)]
pub struct ProbeHandle {
    shared: Rc<ProbeShared>,
}

impl ProbeHandle {
    pub fn log(&self) -> &HookLog {
        &self.shared.log
    }

    pub fn decline_renders(&self, decline: bool) {
        self.shared.decline_renders.set(decline);
    }

    pub fn fail_next_on_render(&self) {
        self.shared.fail_next_on_render.set(true);
    }

    /// Suspend the next `on_render` until the returned sender fires. Dropping
    /// the sender cancels it.
    pub fn gate_next_on_render(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.shared.render_gate.borrow_mut() = Some(gate);
        release
    }

    /// Suspend the next `click` handler the same way.
    pub fn gate_next_click(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.shared.event_gate.borrow_mut() = Some(gate);
        release
    }
}

#[cfg(test)]
#[path = "tests/harness_tests.rs"]
mod tests;
