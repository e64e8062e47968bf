//! Side-effecting collaborators: filesystem, git, subprocesses, config.

pub mod apply;
pub mod atomic;
pub mod audit;
pub mod config;
pub mod git;
pub mod process;
pub mod prompt;
