//! Utility endpoints.

mod remini;

pub use remini::{validate, Remini, UpscaleRequest, RESOLUTIONS, UPSCALE_URL};
