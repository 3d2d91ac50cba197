//! # File Search Store
//!
//! Manage hosted file-search stores, ingest documents into them, and ask
//! grounded questions that come back with citations. Usable as a library,
//! from the `gfss` CLI, or through a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐
//! │   CLI    │   │   HTTP   │
//! │  (gfss)  │   │ (serve)  │
//! └────┬─────┘   └────┬─────┘
//!      └──────┬───────┘
//!             ▼
//!   ┌────────────────────┐     ┌─────────────────┐
//!   │ FileSearchStore-   │────▶│ RestApi         │──▶ hosted API
//!   │ Client (core)      │     │ (FileSearchApi) │
//!   └────────────────────┘     └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! gfss store create --name "Handbook"
//! gfss doc upload fileSearchStores/handbook-123 ./guide.pdf --meta team=infra
//! gfss query --store fileSearchStores/handbook-123 "How do I deploy?" --show-citations
//! gfss serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`rest`] | REST transport implementing the core API trait |
//! | [`commands`] | CLI command implementations |
//! | [`output`] | Table and citation rendering |
//! | [`server`] | JSON HTTP API |
//! | [`cache`] | TTL response cache used by the server |

pub mod cache;
pub mod commands;
pub mod config;
pub mod output;
pub mod rest;
pub mod server;
