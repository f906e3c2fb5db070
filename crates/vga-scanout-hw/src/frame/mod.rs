//! Frame store module.
//!
//! Holds the two logical frames the producer draws into and the converter
//! reads from.

mod store;
mod view;

pub use store::{FrameStore, BUFFER_COUNT};
pub use view::{Frame, FrameMut};
