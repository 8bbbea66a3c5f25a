//! Artifact persistence
//!
//! [`FileArtifactStore`] implements the
//! [`ArtifactStore`](chartscout_application::ArtifactStore) port on the local
//! filesystem; [`load_chart_image`] reads rendered charts for vision requests.

mod file_store;
mod image;

pub use file_store::FileArtifactStore;
pub use image::load_chart_image;
