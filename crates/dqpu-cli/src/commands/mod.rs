//! CLI command implementations.

pub mod common;
pub mod devnet;
pub mod sample;
pub mod samplers;
pub mod trap;
pub mod untrap;
pub mod verify;
pub mod version;
