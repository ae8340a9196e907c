//! Storage Module
//!
//! Durable state for the generation pipeline.
//!
//! ## Core Concepts
//! - **Records**: `DurableMap` keeps every record in a `DashMap` for reads and mirrors it to
//!   one JSON file per key. Writes are temp-file + fsync + rename, so records are never torn.
//! - **Cache**: `ArtifactCache` maps a content fingerprint to the artifact produced for it.
//! - **Artifacts**: `ArtifactStore` owns the model files and upload audit copies. Callers only
//!   hold names.

pub mod artifacts;
pub mod cache;
pub mod memory;
