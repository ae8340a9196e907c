//! Model Catalog Module
//!
//! Synchronous prompt -> model resolution against a fixed set of static models.
//!
//! ## Overview
//! The catalog is loaded once at startup and never changes afterwards, so lookups need
//! no locking. A prompt is scored against every entry: the score is the number of the
//! entry's keywords found as substrings of the lowercased prompt. The highest score wins;
//! on a tie the entry listed first is kept.
//!
//! ## Submodules
//! - **`engine`**: Loading (manifest or directory scan) and scoring.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`tokenizer`**: Derives keywords from model file names.
//! - **`types`**: Data Transfer Objects (DTOs) for API communication.

pub mod engine;
pub mod handlers;
pub mod tokenizer;
pub mod types;

#[cfg(test)]
mod tests;
