//! Canonicalization Module
//!
//! Turns an uploaded image into the identity used by the artifact cache.
//!
//! ## Workflow
//! 1. **Bound**: Rejects uploads above the configured ceiling before decoding.
//! 2. **Decode**: Sniffs the format and decodes with allocation limits.
//! 3. **Re-encode**: Writes RGBA8 pixels as PNG with fixed compression and filter
//!    settings. No metadata chunks are carried over.
//! 4. **Fingerprint**: SHA-256 over the canonical bytes, hex encoded.
//!
//! ## Submodules
//! - **`image`**: Decode and deterministic re-encode.
//! - **`fingerprint`**: Content digest newtype.

pub mod fingerprint;
pub mod image;

pub use fingerprint::Fingerprint;
pub use self::image::{canonicalize, CanonicalImage};
