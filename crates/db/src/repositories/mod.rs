//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod srs_card_repo;
pub mod srs_folder_repo;
pub mod sync_setting_repo;

pub use srs_card_repo::SrsCardRepo;
pub use srs_folder_repo::SrsFolderRepo;
pub use sync_setting_repo::SyncSettingRepo;
