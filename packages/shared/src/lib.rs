//! Utilities shared by the Hiroba binaries and libraries.

pub mod logger;
pub mod time;
