//! Core library for crossdoc
//!
//! This crate implements the **Functional Core** of the crossdoc application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! - **`crossdoc_core`** (this crate): Pure transformation functions with zero I/O
//! - **`crossdoc`**: I/O operations and orchestration (the Imperative Shell)
//!
//! All functions in this crate are deterministic, side-effect free, and
//! testable with fixture data alone. The shell crate owns every service call
//! and file operation; this crate owns the data model, the response-decoding
//! contracts, and the state machine's reducer.
//!
//! # Module Organization
//!
//! - [`types`]: Document identity, headings, selections, relevant sections
//! - [`decode`]: Bracket-delimited JSON extraction for AI responses
//! - [`corpus`]: Cross-document heading corpus assembly for ranking
//! - [`prompt`]: Prompt builders for the AI services
//! - [`state`]: The application state machine (events + reducer)

pub mod corpus;
pub mod decode;
pub mod prompt;
pub mod state;
pub mod types;
