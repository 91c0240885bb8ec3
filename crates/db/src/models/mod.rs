//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//!
//! JSONB columns (field positions, value options, position-change
//! breakdowns) are mapped through `sqlx::types::Json`, so payload shape is
//! validated when rows cross the application boundary.

pub mod comparison;
pub mod template;
pub mod template_version;
pub mod user;
