//! Core types for palaver.

mod message;

pub use message::*;
