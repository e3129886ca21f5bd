//! Inventory sync
//!
//! Reconciles a desired set of bare-metal hosts against the BareMetalAsset
//! inventory and provisions what is missing:
//! - Codec: base64 credentials and the embedded install-config document
//! - CSV import: host lists from delimited text
//! - Reconciler: identity matching and credential recovery
//! - Provisioner: namespaces, credential entries and records
//! - Attacher: role and owner links to a workload
//!
//! [`sync::sync_hosts`] and [`sync::attach_hosts`] are the entry points.

pub mod attacher;
pub mod codec;
pub mod config;
pub mod csv_import;
pub mod error;
pub mod hosts;
pub mod provisioner;
pub mod reconciler;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use error::{ErrorItem, ItemError, SyncError};
pub use hosts::{BmcCredentials, BmcDetails, HostRequest};
pub use sync::{SyncOutcome, attach_hosts, sync_hosts};
