use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::error::HostError;
use crate::platform::{DispatchWork, Dispatcher, RenderHost};
use crate::producer::RenderProducer;
use crate::{ComponentId, LifecycleError};

/// Capability handle a controller receives exactly once, at attach time.
///
/// Deliberately not `Clone`: the controller owns its binding.
pub struct HostBinding {
    component: ComponentId,
    host: Rc<dyn RenderHost>,
    dispatcher: Rc<dyn Dispatcher>,
}

impl HostBinding {
    pub fn new(component: ComponentId, host: Rc<dyn RenderHost>) -> Self {
        let dispatcher = host.dispatcher();
        Self {
            component,
            host,
            dispatcher,
        }
    }

    pub fn component_id(&self) -> ComponentId {
        self.component
    }

    pub fn dispatcher(&self) -> &Rc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn dispatch(&self, work: DispatchWork) -> LocalBoxFuture<'static, Result<(), LifecycleError>> {
        self.dispatcher.dispatch(work)
    }

    pub fn enqueue_render(&self, producer: RenderProducer) -> Result<(), HostError> {
        self.host.enqueue_render(self.component, producer)
    }
}

impl fmt::Debug for HostBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBinding")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}
