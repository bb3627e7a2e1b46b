//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` row struct matching the table
//! - A conversion into the matching `wordloop_core` domain type
//! - `Deserialize` DTOs for inserts and patches

pub mod srs_card;
pub mod srs_folder;
pub mod sync_setting;
