//! Connection Lifecycle Manager.

pub mod manager;

pub use manager::{LifecycleHandle, LifecycleManager, DEFAULT_RECONNECT_DELAY};
