//! Minimal view description emitted by render producers.
//!
//! The controller never inspects these frames; they only travel from a
//! component's `build` to the host.

use smallvec::SmallVec;

use crate::event::EventCallback;

#[derive(Clone, Debug)]
pub enum RenderFrame {
    Open(String),
    Close,
    Text(String),
    Attribute { name: String, value: String },
    Handler { event: String, callback: EventCallback },
}

#[derive(Default)]
pub struct RenderBuilder {
    frames: Vec<RenderFrame>,
    open: SmallVec<[usize; 8]>,
}

impl RenderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, tag: impl Into<String>) -> &mut Self {
        self.open.push(self.frames.len());
        self.frames.push(RenderFrame::Open(tag.into()));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        if self.open.pop().is_some() {
            self.frames.push(RenderFrame::Close);
        } else {
            log::warn!("render builder: close() without a matching open()");
        }
        self
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.frames.push(RenderFrame::Text(text.into()));
        self
    }

    pub fn attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.frames.push(RenderFrame::Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Register `callback` for the named event on the innermost open element.
    pub fn on(&mut self, event: impl Into<String>, callback: EventCallback) -> &mut Self {
        self.frames.push(RenderFrame::Handler {
            event: event.into(),
            callback,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Close any elements left open and return the finished tree.
    pub fn finish(mut self) -> RenderTree {
        while self.open.pop().is_some() {
            self.frames.push(RenderFrame::Close);
        }
        RenderTree {
            frames: self.frames,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RenderTree {
    frames: Vec<RenderFrame>,
}

impl RenderTree {
    pub fn frames(&self) -> &[RenderFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Concatenation of every text frame, in emission order.
    pub fn text_content(&self) -> String {
        self.frames
            .iter()
            .filter_map(|frame| match frame {
                RenderFrame::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The most recently registered callback for `event`.
    pub fn handler(&self, event: &str) -> Option<&EventCallback> {
        self.frames.iter().rev().find_map(|frame| match frame {
            RenderFrame::Handler {
                event: name,
                callback,
            } if name == event => Some(callback),
            _ => None,
        })
    }

    pub fn handlers(&self) -> impl Iterator<Item = (&str, &EventCallback)> {
        self.frames.iter().filter_map(|frame| match frame {
            RenderFrame::Handler { event, callback } => Some((event.as_str(), callback)),
            _ => None,
        })
    }
}
