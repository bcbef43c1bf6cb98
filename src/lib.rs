//! # Saloonkeep - write-back economy store
//!
//! Saloonkeep backs a multiplayer game economy: many concurrent command handlers read
//! and change per-user currencies and items. Balances must never be corrupted by
//! concurrent access, must survive restarts, and callers must never wait on disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use saloonkeep::app::App;
//! use saloonkeep::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::open(Config::load("config.toml").await?).await?;
//!     app.start();
//!
//!     app.economy.add_user_gold("alice", 5).await?;
//!     app.store.transfer_item("alice", "bob", "whiskey", 1).await.ok();
//!
//!     app.shutdown().await; // flushes every dirty record
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`lock`] - per-key async mutual exclusion with ordered multi-key acquisition
//! - [`cache`] - named write-back caches, the write queue and the background flusher
//! - [`storage`] - persistence backends (JSON files, sled, memory)
//! - [`economy`] - item catalog, inventories, the item store and currency facade
//! - [`config`] - TOML configuration
//! - [`app`] - service wiring used by the binary
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Economy facade  │ ← gold / silver helpers
//! └─────────────────┘
//!          │
//! ┌─────────────────┐      ┌──────────┐
//! │   ItemStore     │ ───► │ KeyLock  │
//! └─────────────────┘      └──────────┘
//!          │
//! ┌─────────────────┐
//! │  RecordCache    │ ← set() marks dirty, flusher writes back
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │    Backend      │
//! └─────────────────┘
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod economy;
pub mod errors;
pub mod lock;
pub mod storage;
