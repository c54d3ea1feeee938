//! Stream registries and per-stream byte queues.

pub mod arena;
pub mod live;
pub mod stream;

pub use arena::{StreamArena, StreamKey};
pub use live::LiveQueue;
pub use stream::StreamQueue;
