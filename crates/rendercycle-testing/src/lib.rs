//! Testing utilities and harness for rendercycle

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use rendercycle_core::{Component, Context, EventArgs, RenderBuilder};
}
