//! Standard runtime services for rendercycle.
//!
//! [`StdDispatcher`] owns the render context and [`StdRenderer`] hosts mounted
//! controllers on a single-threaded [`futures::executor::LocalPool`]: it
//! executes queued render producers, stores each component's latest
//! [`RenderTree`](rendercycle_core::RenderTree) and delivers after-render
//! notifications and UI events.

mod dispatcher;
mod renderer;

pub use dispatcher::StdDispatcher;
pub use renderer::{RendererOptions, StdRenderer};
