//! Session state.
//!
//! `GameSession` is the only stateful entry point; everything it owns lives
//! under `game`.

pub mod game;

pub use game::GameSession;
