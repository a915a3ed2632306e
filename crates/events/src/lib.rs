//! `aangan-events` — event trait, pub/sub abstraction and the engine's
//! outbound notification events.
//!
//! The engine emits notifications as **facts**; whether a dispatcher delivers
//! them to connected clients is an external concern and never feeds back into
//! engine state.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod notification;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notification::Notification;
