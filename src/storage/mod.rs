//! Storage Engine Module
//!
//! This module provides the core storage functionality for mapkv.
//! It includes a thread-safe key-value store holding typed values, TTL
//! bookkeeping, and a background janitor that reclaims expired keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Storage                    │
//! │      RwLock { entries, deadlines }          │
//! └─────────────────────────────────────────────┘
//!                        ▲
//!                        │ sweep_expired()
//!          ┌─────────────┴─────────────┐
//!          │         Janitor           │
//!          │  (Background Tokio Task)  │
//!          └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use mapkv::storage::{Storage, ValueType};
//! use std::collections::HashMap;
//!
//! let storage = Storage::new();
//!
//! storage.put_dictionary(
//!     "user:1",
//!     HashMap::from([("name".to_string(), "Ariz".to_string())]),
//! );
//! assert_eq!(storage.get_type("user:1"), Ok(ValueType::Dictionary));
//! assert_eq!(
//!     storage.get_dictionary_element("user:1", "name"),
//!     Ok("Ariz".to_string())
//! );
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod janitor;
pub mod value;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::{Storage, StorageStats};
pub use error::{StorageError, StorageResult};
pub use janitor::{start_janitor, Janitor, JanitorConfig};
pub use value::{Dictionary, PutOutcome, Shape, Value, ValueType};
