use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use rendercycle_core::{DispatchWork, Dispatcher, LifecycleError};

struct QueuedWork {
    work: DispatchWork,
    done: oneshot::Sender<Result<(), LifecycleError>>,
}

/// Gives back one level of access on drop, unwinding included.
struct AccessGuard<'a>(&'a Cell<usize>);

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// FIFO dispatcher owning the render context of one renderer.
///
/// Access is held only while [`StdDispatcher::enter`] runs. Work dispatched
/// from inside that window executes inline; anything else is queued and
/// drained by [`StdDispatcher::run_pending`].
pub struct StdDispatcher {
    queue: RefCell<VecDeque<QueuedWork>>,
    active: Cell<usize>,
    executed: Cell<u64>,
    wake_hook: RefCell<Option<Rc<dyn Fn()>>>,
}

impl StdDispatcher {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            active: Cell::new(0),
            executed: Cell::new(0),
            wake_hook: RefCell::new(None),
        }
    }

    /// Run `f` with access to the render context.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        self.active.set(self.active.get() + 1);
        let _access = AccessGuard(&self.active);
        f()
    }

    /// Drain queued work in submission order, including work queued while
    /// draining. Returns the number of units executed.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(QueuedWork { work, done }) = next else {
                break;
            };
            let result = self.enter(work);
            self.executed.set(self.executed.get() + 1);
            ran += 1;
            if let Err(Err(err)) = done.send(result) {
                log::warn!("dispatched work failed with nobody awaiting it: {err}");
            }
        }
        ran
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Total units of work executed, inline or queued.
    pub fn executed(&self) -> u64 {
        self.executed.get()
    }

    /// Registers a hook invoked whenever work is queued for later.
    pub fn set_wake_hook(&self, hook: impl Fn() + 'static) {
        *self.wake_hook.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn clear_wake_hook(&self) {
        *self.wake_hook.borrow_mut() = None;
    }

    pub(crate) fn wake(&self) {
        let hook = self.wake_hook.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl Default for StdDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdDispatcher")
            .field("pending", &self.pending_len())
            .field("active", &(self.active.get() > 0))
            .field("executed", &self.executed.get())
            .finish()
    }
}

impl Dispatcher for StdDispatcher {
    fn check_access(&self) -> bool {
        self.active.get() > 0
    }

    fn dispatch(&self, work: DispatchWork) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        if self.check_access() {
            let result = work();
            self.executed.set(self.executed.get() + 1);
            return future::ready(result).boxed_local();
        }
        let (done, completion) = oneshot::channel();
        self.queue.borrow_mut().push_back(QueuedWork { work, done });
        self.wake();
        async move {
            completion
                .await
                .unwrap_or(Err(LifecycleError::DispatchDropped))
        }
        .boxed_local()
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
