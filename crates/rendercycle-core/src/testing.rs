//! In-crate host used by the controller unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::{
    ComponentId, DispatchWork, Dispatcher, HostBinding, HostError, LifecycleError, RenderBuilder,
    RenderHost, RenderProducer, RenderTree,
};

/// Runs every unit of work inline and counts it.
#[derive(Default)]
pub(crate) struct TestDispatcher {
    active: Cell<bool>,
    deny_access: Cell<bool>,
    dispatched: Cell<usize>,
}

impl TestDispatcher {
    pub(crate) fn dispatched(&self) -> usize {
        self.dispatched.get()
    }

    pub(crate) fn deny_access(&self, deny: bool) {
        self.deny_access.set(deny);
    }

    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.active.replace(true);
        let result = f();
        self.active.set(previous);
        result
    }
}

impl Dispatcher for TestDispatcher {
    fn check_access(&self) -> bool {
        self.active.get() && !self.deny_access.get()
    }

    fn dispatch(&self, work: DispatchWork) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        self.dispatched.set(self.dispatched.get() + 1);
        let result = self.enter(work);
        future::ready(result).boxed_local()
    }
}

#[derive(Default)]
pub(crate) struct TestHost {
    dispatcher: Rc<TestDispatcher>,
    queue: RefCell<Vec<(ComponentId, RenderProducer)>>,
    enqueued: Cell<usize>,
    fail_next: RefCell<Option<HostError>>,
    rendered: RefCell<Vec<RenderTree>>,
}

impl TestHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn bind(self: &Rc<Self>, component: ComponentId) -> HostBinding {
        HostBinding::new(component, self.clone())
    }

    pub(crate) fn test_dispatcher(&self) -> &TestDispatcher {
        &self.dispatcher
    }

    pub(crate) fn fail_next_enqueue(&self, error: HostError) {
        *self.fail_next.borrow_mut() = Some(error);
    }

    /// Number of producers accepted so far.
    pub(crate) fn enqueued(&self) -> usize {
        self.enqueued.get()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Execute queued producers in order; returns how many ran.
    pub(crate) fn run_renders(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            };
            let Some((_, producer)) = next else {
                break;
            };
            let mut builder = RenderBuilder::new();
            self.dispatcher.enter(|| producer.render(&mut builder));
            self.rendered.borrow_mut().push(builder.finish());
            ran += 1;
        }
        ran
    }

    /// Drop queued producers without running them.
    pub(crate) fn discard_queued(&self) -> usize {
        let discarded: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        discarded.len()
    }

    pub(crate) fn rendered(&self) -> Vec<RenderTree> {
        self.rendered.borrow().clone()
    }

    pub(crate) fn last_rendered(&self) -> Option<RenderTree> {
        self.rendered.borrow().last().cloned()
    }
}

impl RenderHost for TestHost {
    fn dispatcher(&self) -> Rc<dyn Dispatcher> {
        self.dispatcher.clone()
    }

    fn enqueue_render(
        &self,
        component: ComponentId,
        producer: RenderProducer,
    ) -> Result<(), HostError> {
        if let Some(error) = self.fail_next.borrow_mut().take() {
            return Err(error);
        }
        self.enqueued.set(self.enqueued.get() + 1);
        self.queue.borrow_mut().push((component, producer));
        Ok(())
    }
}
