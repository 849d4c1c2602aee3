//! Line-oriented reading
//!
//! Turns a raw byte stream (the serial device, or a client socket) into a
//! sequence of immutable [`Line`]s.

pub mod line;
pub mod reader;

pub use line::Line;
pub use reader::{LineSource, SourceState, DEFAULT_MAX_LINE_LENGTH};
