//! Structured edit protocol between a script and a text-generation backend.
//!
//! A run sends the script to an analyzer agent, sends the script plus the
//! analysis to an editor agent, extracts file actions from the editor's
//! response, and applies them with one git commit per action. The crate
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure logic (envelopes, contracts, normalization, parsing).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, git, processes,
//!   config, audit log).
//! - **[`backend`]**: Generation backends behind the [`backend::Generator`]
//!   trait, resolved by name.
//!
//! [`agents`] and [`run`] coordinate the three to implement the CLI.

pub mod agents;
pub mod backend;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
