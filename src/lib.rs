//! shortpool - key lifecycle and resolution engine for URL shortening
//!
//! Short keys are generated ahead of time into a persistent key pool; creating
//! a mapping atomically claims one. Resolution is cache-first with the mapping
//! store as the source of truth.
//!
//! # Features
//! - **cli**: Operator command-line interface (default)
//!
//! # Architecture
//! - `keys`: Random key generation over a configured alphabet
//! - `storage`: Key pool and mapping store (SeaORM)
//! - `cache`: Resolution cache (moka / Redis / none)
//! - `engine`: Claim, create and resolve with deadlines and a circuit breaker
//! - `workers`: Population and cleanup background workers
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle
//! - `system`: Logging

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod interfaces;
pub mod keys;
pub mod runtime;
pub mod storage;
pub mod system;
pub mod utils;
pub mod workers;
