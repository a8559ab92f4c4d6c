//! Data Transfer Objects for REST response serialization.
//!
//! Identifiers are flattened to plain strings and integers so the JSON shape
//! does not depend on the domain newtypes.

pub mod game_dto;
pub mod machine_dto;
pub mod score_dto;

pub use game_dto::*;
pub use machine_dto::*;
pub use score_dto::*;
