//! Request handlers.
//!
//! Handlers delegate to the repositories in `formdiff_db` (and the
//! assembler in [`crate::engine`]) and map errors via
//! [`crate::error::AppError`].

pub mod comparison;
