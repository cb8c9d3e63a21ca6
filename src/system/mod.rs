//! Cross-thread plumbing.

pub mod bus;

pub use bus::EngineBus;
