//! Multi-repository orchestration that doesn't belong in a single handler.

pub mod assembler;
