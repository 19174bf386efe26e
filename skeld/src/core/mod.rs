//! Deterministic, pure logic of the game.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod defaults;
pub mod events;
pub mod immutability;
pub mod invariants;
pub mod normalize;
pub mod phase;
pub mod resolve;
pub mod setup;
pub mod situation;
pub mod state;
pub mod types;
pub mod win;
pub mod world;
