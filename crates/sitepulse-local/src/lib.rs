//! Local implementations of the sitepulse traits: a node + Playwright renderer, a reqwest
//! fetcher, an Ollama extractor, and the text/sentiment stages that run in-process.

pub mod config;
pub mod fetch;
pub mod lexicon;
pub mod normalize;
pub mod ollama;
pub mod pipeline;
pub mod render;
pub mod retrieve;
pub mod sentiment;

pub use sitepulse_core::*;
