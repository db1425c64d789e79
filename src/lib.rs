//! # Mallpoints - Customer Engagement Backend for Shopping Malls
//!
//! Mallpoints is a gamified loyalty backend: members submit purchase
//! receipts and earn coins and XP, multiplied by store category, VIP tier,
//! login streak, time of day, and any running promotional event.
//!
//! ## Features
//!
//! - **Receipt Rewards**: Deterministic multiplier pipeline with a full
//!   per-factor breakdown persisted on every receipt, plus an admin void
//!   path that reverses grants.
//! - **VIP Tiers**: Bronze through Diamond, derived from lifetime spend and
//!   receipt volume.
//! - **Missions**: Template-driven procedural generation, weighted by level
//!   and recent shopping habits, with expiry and a claim flow.
//! - **Companions**: A per-account virtual pet that levels from account
//!   activity and acts as a coin sink.
//! - **Achievements & Events**: A seeded achievement catalog and scheduled
//!   reward-boost windows.
//! - **Security**: Argon2id password hashing, JWT bearer tokens with
//!   revocation, and per-username login rate limiting.
//! - **Caching**: In-memory LRU in front of a persistent sled tier, with an
//!   optional Redis tier behind the `redis-cache` feature.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mallpoints::config::Config;
//! use mallpoints::engine::GamificationEngine;
//! use mallpoints::economy::StoreCategory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let engine = GamificationEngine::open(config)?;
//!
//!     engine.register("alice", "Alice", "a-strong-password")?;
//!     let summary = engine.process_receipt(
//!         "alice",
//!         "Thread Theory",
//!         StoreCategory::Fashion,
//!         500,
//!         chrono::Utc::now(),
//!     )?;
//!     println!("earned {} coins", summary.breakdown.total_coins);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The service facade: receipts, missions, rankings, upkeep
//! - [`economy`] - Domain core: accounts, rewards, missions, companions,
//!   achievements, and the sled store
//! - [`auth`] - Registration, login, tokens, and rate limiting
//! - [`cache`] - Tiered LRU cache
//! - [`config`] - Configuration management and validation
//! - [`backup`] - Archive, verify, and restore the data directory
//! - [`validation`] - Input validation and sanitization utilities

pub mod auth;
pub mod backup;
pub mod cache;
pub mod config;
pub mod economy;
pub mod engine;
pub mod logutil;
pub mod validation;

pub use config::Config;
pub use engine::GamificationEngine;
