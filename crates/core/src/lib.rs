//! Pure domain logic for Inkwell.
//!
//! Nothing in this crate touches the network, the filesystem, or the
//! database. Everything here is deterministic so the publishing pipeline can
//! rely on the same title always producing the same slug, file path, and
//! image names.

pub mod error;
pub mod image;
pub mod render;
pub mod slug;
pub mod status;
pub mod types;
