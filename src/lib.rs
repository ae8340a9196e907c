//! Meshforge Library
//!
//! This library crate defines the core modules of the model service.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`canonical`**: Image normalization and content fingerprinting. Two uploads of the same
//!   pixels share a fingerprint regardless of their file encoding.
//! - **`catalog`**: Static model catalog with keyword matching of text prompts.
//! - **`config`**: Command-line and environment configuration.
//! - **`error`**: Error taxonomy and its HTTP mapping.
//! - **`jobs`**: The asynchronous generation pipeline: job state machine, worker pool,
//!   status streams and restart recovery.
//! - **`routes`**: The HTTP router with its body limit and CORS layers.
//! - **`storage`**: Durable record tables, the fingerprint -> artifact cache and model files.

pub mod canonical;
pub mod catalog;
pub mod config;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod storage;
