//! Request handlers.

pub mod ai;
