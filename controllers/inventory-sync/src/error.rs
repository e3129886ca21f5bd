//! Error types for the inventory sync pipeline.
//!
//! Per-host failures never surface here; they are collected into the
//! outcome of [`crate::sync::sync_hosts`]. These are the fatal ones.

use crate::codec::CodecError;
use crate::csv_import::ParseError;
use crate::hosts::HostRequest;
use crds::BareMetalAsset;
use inventory_client::StoreError;
use thiserror::Error;

/// Errors that abort an inventory sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Inventory store error outside of the per-host fan-out
    #[error("Inventory store error: {0}")]
    Store(#[from] StoreError),

    /// Credential or document encoding error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Host import payload could not be parsed
    #[error("Import error: {0}")]
    Parse(#[from] ParseError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading the import payload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run finished but some hosts were not provisioned
    #[error("{failed} host(s) failed to provision")]
    Incomplete { failed: usize },
}

/// What a per-item failure refers to
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorItem {
    /// A host that could not be provisioned
    Host(HostRequest),
    /// An existing record whose credentials could not be recovered
    Asset(BareMetalAsset),
    /// A namespace that could not be created
    Namespace(String),
}

/// A recovered per-item failure, reported instead of raised
#[derive(Debug, Clone, PartialEq)]
pub struct ItemError {
    pub message: String,
    /// Store status code, when the failure came from the store
    pub code: Option<u16>,
    pub item: ErrorItem,
}

impl ItemError {
    pub fn new(message: impl Into<String>, item: ErrorItem) -> Self {
        Self {
            message: message.into(),
            code: None,
            item,
        }
    }

    pub fn from_store(err: &StoreError, item: ErrorItem) -> Self {
        Self {
            message: err.to_string(),
            code: err.code(),
            item,
        }
    }

    /// True when the failure belongs to a single host
    pub fn is_host(&self) -> bool {
        matches!(self.item, ErrorItem::Host(_))
    }

    /// Identity key of the failed item (the bare name for namespaces)
    pub fn key(&self) -> String {
        match &self.item {
            ErrorItem::Host(host) => host.identity_key(),
            ErrorItem::Asset(asset) => asset.identity_key(),
            ErrorItem::Namespace(name) => name.clone(),
        }
    }
}
