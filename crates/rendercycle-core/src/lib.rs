#![doc = r"Render lifecycle controller: attach, render cycles and coalesced render requests."]

pub mod binding;
pub mod component;
pub mod context;
pub mod controller;
pub mod error;
pub mod event;
pub mod platform;
pub mod producer;
pub mod render_tree;

#[cfg(test)]
pub(crate) mod testing;

pub use binding::HostBinding;
pub use component::Component;
pub use context::Context;
pub use controller::{
    AfterRenderNotifiable, Attachable, Controller, EventHandleable, LifecycleSnapshot,
};
pub use error::{BoxError, HookKind, HostError, LifecycleError, TaskError};
pub use event::{completed, EventArgs, EventCallback, EventCompletion, Task};
pub use platform::{DispatchWork, Dispatcher, RenderHost};
pub use producer::RenderProducer;
pub use render_tree::{RenderBuilder, RenderFrame, RenderTree};

pub type ComponentId = usize;
