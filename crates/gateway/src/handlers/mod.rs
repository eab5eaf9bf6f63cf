//! API handlers module

pub mod attendance;
pub mod debug;
pub mod health;
