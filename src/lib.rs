//! # mapkv - A Concurrent In-Memory Key-Value Storage Engine
//!
//! mapkv is the storage layer of a key-value service. It keeps three shapes of
//! value (scalar, list, dictionary) behind a single reader-writer lock, tracks
//! per-key deadlines, and runs a background janitor that reclaims expired keys.
//! Request parsing and networking live in the service built on top of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Request layer (external)                 │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ get / put / remove / set_expiry
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Storage                          │
//! │   ┌──────────────────────────────────────────────────┐   │
//! │   │  RwLock                                          │   │
//! │   │    entries:   String -> Value                    │   │
//! │   │    deadlines: String -> Instant                  │   │
//! │   └──────────────────────────────────────────────────┘   │
//! └────────────────────────────▲─────────────────────────────┘
//!                              │ sweep_expired()
//!                 ┌────────────┴────────────┐
//!                 │         Janitor         │
//!                 │ (Background Tokio Task) │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use mapkv::storage::Storage;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create the store and start its janitor (20ms sweeps)
//!     let (storage, janitor) = Storage::open();
//!
//!     storage.put_scalar("session", "token123");
//!     storage.set_expiry("session", 3_600_000);
//!
//!     janitor.shutdown().await;
//! }
//! ```
//!
//! ## Expiry
//!
//! Keys with a deadline are expired in two ways:
//! 1. **Lazy**: Reads treat a key whose deadline has passed as absent
//! 2. **Active**: The janitor periodically removes such keys for real
//!
//! A TTL of zero means "never expires".

pub mod storage;

// Re-export commonly used types for convenience
pub use storage::{
    start_janitor, Janitor, JanitorConfig, PutOutcome, Storage, StorageError, StorageResult,
    Value, ValueType,
};

/// Version of mapkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
