//! Types shared between the session and its collaborators.

pub mod presenter;
pub mod snapshot;
