//! Multi-turn conversation memory for retrieval-augmented question answering.
//!
//! The [`services::conversation`] module is the core: a concurrent session
//! store, bounded exchange logs, follow-up detection and query enhancement.
//! The HTTP layer in [`handlers`] and the LLM client in [`services`] sit on
//! top of it.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
