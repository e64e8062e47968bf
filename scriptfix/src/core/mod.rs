//! Deterministic, pure logic of the edit protocol.
//!
//! Core modules must be free of filesystem, git and network side effects.
//! They turn strings into typed values and back, and are tested in isolation.

pub mod action;
pub mod contract;
pub mod envelope;
pub mod normalize;
pub mod parse;
