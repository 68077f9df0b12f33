//! Random content endpoints.

mod blue_archive;

pub use blue_archive::{pick_link, BlueArchive, LINKS_URL};
