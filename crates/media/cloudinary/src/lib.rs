//! [Cloudinary](https://cloudinary.com) media host.
//!
//! Uploads and deletions use signed requests against the Upload API.

pub mod config;
pub mod host;

pub use config::CloudinaryConfig;
pub use host::CloudinaryMediaHost;
