//! Inventory store client
//!
//! The resource store seam used by the inventory-sync orchestration code:
//! list/get/create/patch for inventory records and secrets, plus namespace
//! creation. Failures come back as a structured `StoreError` carrying the
//! store's HTTP-style status code.
//!
//! # Example
//!
//! ```no_run
//! use inventory_client::{InventoryStoreTrait, KubeInventoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = KubeInventoryStore::try_default().await?;
//!
//! // List every inventory record the caller can see
//! let assets = store.list_assets(None).await?;
//!
//! // An existing namespace is reported as a conflict
//! if let Err(e) = store.create_namespace("lab").await {
//!     assert!(e.is_conflict());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **test-util**: exposes `MockInventoryStore`, an in-memory store with
//!   failure injection and call recording

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeInventoryStore;
pub use error::StoreError;
pub use store_trait::InventoryStoreTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockInventoryStore, Operation, StoreCall};
