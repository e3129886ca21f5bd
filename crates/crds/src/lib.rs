//! Inventory CRD Definitions
//!
//! Kubernetes Custom Resource Definitions and record types shared by the
//! inventory client and the inventory-sync controller.

pub mod bare_metal_asset;
pub mod opaque_secret;
pub mod references;

pub use bare_metal_asset::*;
pub use opaque_secret::*;
pub use references::*;
