//! Generation lifecycle events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`GenerationEvent`]: what happened to one generation request.
//! - [`NotificationLog`]: background subscriber that turns events into
//!   structured log lines, the default user-facing notification sink.

pub mod bus;
pub mod notify;

pub use bus::{EventBus, GenerationEvent, GenerationEventKind};
pub use notify::NotificationLog;
