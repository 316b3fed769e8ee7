use std::fmt;
use std::rc::Rc;

use crate::render_tree::RenderBuilder;

/// Implemented by controllers; the producer calls back into its owner.
pub(crate) trait RenderSource {
    fn produce(&self, builder: &mut RenderBuilder);

    /// The producer was dropped without rendering.
    fn abandon(&self);
}

/// The render-request producer handed to the host's render queue.
///
/// It is bound to the controller that created it. Running it clears the
/// controller's pending-render flag before the view is built, so a render
/// requested while building is queued again rather than dropped. A producer
/// dropped unrun releases the flag as well, so the controller can request
/// again.
pub struct RenderProducer {
    source: Option<Rc<dyn RenderSource>>,
}

impl RenderProducer {
    pub(crate) fn new(source: Rc<dyn RenderSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn render(mut self, builder: &mut RenderBuilder) {
        if let Some(source) = self.source.take() {
            source.produce(builder);
        }
    }
}

impl Drop for RenderProducer {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            source.abandon();
        }
    }
}

impl fmt::Debug for RenderProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderProducer")
            .field("rendered", &self.source.is_none())
            .finish()
    }
}
