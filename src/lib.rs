#![cfg_attr(not(test), warn(unused_must_use))]

//! Semantic router and lifecycle manager for a fleet of external
//! tool-providing subprocesses ("tool servers").
//!
//! [`engine::Engine`] is the facade: it owns the indexing pipeline
//! ([`indexer`]), the per-server supervised subprocess ([`supervisor`]), the
//! prioritized background execution queue ([`queue`]), and coordinated
//! shutdown. The LLM descriptor/enhancer ([`descriptor::Describer`]), the
//! embedding provider ([`embedding::Embedder`]), and the vector index
//! ([`index::VectorIndex`]) are external collaborators, reached only through
//! traits.

pub mod barrier;
pub mod config;
pub mod descriptor;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fabric;
pub mod fingerprint;
pub mod index;
pub mod indexer;
pub mod process;
pub mod queue;
pub mod retry;
pub mod router;
pub mod settings;
pub mod supervisor;
pub mod transport;

pub use engine::Engine;
pub use error::{exit_code, EngineError, Result};
