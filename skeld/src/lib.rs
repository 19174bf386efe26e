//! Social deduction engine for oracle-driven players.
//!
//! A game is a phase state machine (action, discovery, discussion, voting,
//! results) over a small spaceship map. Every decision a player makes comes
//! from an external oracle; the engine resolves those decisions, keeps the
//! event log and decides the winner. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic rules (resolution, win evaluation,
//!   invariants). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, prompt rendering,
//!   oracle processes). Isolated behind the [`io::oracle::Oracle`] trait.
//!
//! [`engine`] couples the two into a single game handle, [`sessions`] hosts
//! many games side by side, and [`looping`] plays one game to the end.

pub mod core;
pub mod engine;
pub mod io;
pub mod logging;
pub mod looping;
pub mod sessions;
pub mod snapshot;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
