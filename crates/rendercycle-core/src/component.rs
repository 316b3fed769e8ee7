use crate::context::Context;
use crate::event::{completed, Task};
use crate::render_tree::RenderBuilder;

/// User-authored view logic driven by a [`Controller`](crate::Controller).
///
/// Hooks receive `&mut self` for their synchronous part and return a
/// `'static` [`Task`] for whatever runs after a suspension point. State the
/// task touches later has to be shared explicitly (an `Rc<Cell<_>>`, a
/// [`Context::invoke`] call), never borrowed from `self`.
pub trait Component: Sized + 'static {
    /// Externally supplied inputs delivered through
    /// [`Controller::update`](crate::Controller::update).
    type Params: 'static;

    fn set_parameters(&mut self, params: Self::Params);

    /// Emit the current view description.
    fn build(&self, ctx: &Context<Self>, builder: &mut RenderBuilder);

    /// Runs once per update or reset cycle. `first_render` is true only for
    /// the cycle following attach or reset.
    fn on_render(&mut self, _ctx: &Context<Self>, _first_render: bool) -> Task {
        completed()
    }

    /// Runs after the host applied a render. `first_render` is true for the
    /// first notification this instance ever receives.
    fn on_after_render(&mut self, _ctx: &Context<Self>, _first_render: bool) -> Task {
        completed()
    }

    /// Consulted for every render request except the very first after attach
    /// or reset, which is always honoured.
    fn should_render(&self) -> bool {
        true
    }
}
