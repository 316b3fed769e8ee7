use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};

use futures::future::LocalBoxFuture;
use futures_task::noop_waker_ref;

use crate::error::{BoxError, LifecycleError, TaskError};

/// User-authored asynchronous work: hook remainders and event callbacks.
pub type Task = LocalBoxFuture<'static, Result<(), TaskError>>;

/// A task that has already completed successfully.
pub fn completed() -> Task {
    Box::pin(futures::future::ready(Ok(())))
}

/// Payload delivered by the host when a UI event fires.
#[derive(Clone, Debug, PartialEq)]
pub enum EventArgs {
    Empty,
    Pointer { x: f32, y: f32 },
    Text(String),
    Key(String),
}

/// Type-erased event handler registered in a rendered tree.
#[derive(Clone)]
pub struct EventCallback {
    handler: Rc<dyn Fn(EventArgs) -> Task>,
}

impl EventCallback {
    pub fn from_fn(handler: impl Fn(EventArgs) -> Task + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
        }
    }

    pub fn invoke(&self, args: EventArgs) -> Task {
        (self.handler)(args)
    }

    pub fn ptr_eq(&self, other: &EventCallback) -> bool {
        Rc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCallback")
            .field("handler", &Rc::as_ptr(&self.handler))
            .finish()
    }
}

/// What remains of an event after its immediate render was dispatched.
pub enum EventCompletion {
    /// The callback finished synchronously (or was cancelled); nothing is left.
    Settled,
    /// The callback is still running. The continuation awaits it and requests
    /// one more render on success.
    Deferred(LocalBoxFuture<'static, Result<(), LifecycleError>>),
}

impl EventCompletion {
    pub fn is_deferred(&self) -> bool {
        matches!(self, EventCompletion::Deferred(_))
    }

    pub async fn finish(self) -> Result<(), LifecycleError> {
        match self {
            EventCompletion::Settled => Ok(()),
            EventCompletion::Deferred(continuation) => continuation.await,
        }
    }
}

impl fmt::Debug for EventCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCompletion::Settled => f.write_str("Settled"),
            EventCompletion::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

pub(crate) enum WorkState {
    Completed,
    Cancelled,
    Failed(BoxError),
    Pending(Task),
}

/// Run `work` up to its first suspension point.
///
/// Wakers must be re-registered on every poll, so a pending task keeps working
/// once its real owner polls it again.
pub(crate) fn start_work(mut work: Task) -> WorkState {
    let mut cx = TaskContext::from_waker(noop_waker_ref());
    match work.as_mut().poll(&mut cx) {
        Poll::Ready(Ok(())) => WorkState::Completed,
        Poll::Ready(Err(TaskError::Cancelled)) => WorkState::Cancelled,
        Poll::Ready(Err(TaskError::Failed(source))) => WorkState::Failed(source),
        Poll::Pending => WorkState::Pending(work),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;

    #[test]
    fn ready_work_is_classified_without_pending_state() {
        assert!(matches!(start_work(completed()), WorkState::Completed));
        let cancelled: Task = Box::pin(async { Err::<(), _>(TaskError::Cancelled) });
        assert!(matches!(start_work(cancelled), WorkState::Cancelled));
        let failed: Task = Box::pin(async { Err::<(), _>(TaskError::failed("boom")) });
        match start_work(failed) {
            WorkState::Failed(source) => assert_eq!(source.to_string(), "boom"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn pending_work_resumes_after_first_poll() {
        let (tx, rx) = oneshot::channel::<()>();
        let work: Task = Box::pin(async move {
            rx.await.map_err(|_| TaskError::Cancelled)?;
            Ok(())
        });
        let WorkState::Pending(work) = start_work(work) else {
            panic!("work should be pending");
        };
        tx.send(()).expect("receiver alive");
        futures::executor::block_on(work).expect("work completes");
    }

    #[test]
    fn callback_forwards_arguments() {
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let callback = {
            let seen = seen.clone();
            EventCallback::from_fn(move |args| {
                seen.borrow_mut().push(args);
                completed()
            })
        };
        let _ = callback.invoke(EventArgs::Text("hi".into()));
        let _ = callback.invoke(EventArgs::Pointer { x: 1.0, y: 2.0 });
        assert_eq!(
            seen.borrow().as_slice(),
            &[
                EventArgs::Text("hi".into()),
                EventArgs::Pointer { x: 1.0, y: 2.0 }
            ]
        );
    }
}
