//! Comma-separated host import
//!
//! The first non-blank line is the header. Columns are matched by name,
//! case-insensitively, so their order does not matter; unknown columns are
//! ignored. Fields follow RFC 4180, so a quoted value may contain commas.

use crate::hosts::HostRequest;
use crds::HostRole;
use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Minimum number of header columns for a payload to be considered a grid
pub const MIN_HEADER_COLUMNS: usize = 5;

/// Errors that reject the whole payload
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("import payload is empty")]
    Empty,

    #[error("header has {found} columns, at least {MIN_HEADER_COLUMNS} are required")]
    TooFewColumns { found: usize },

    #[error("header is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("header column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("malformed import payload: {0}")]
    Malformed(String),
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        ParseError::Malformed(err.to_string())
    }
}

/// Source of the transient ids attached to imported candidates
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// A parsed row, tagged with a transient id for the caller's bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHost {
    pub id: String,
    pub host: HostRequest,
}

/// Result of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvImport {
    pub candidates: Vec<CandidateHost>,
    /// Rows dropped for a field count that disagrees with the header, or
    /// an empty name or namespace
    pub skipped_rows: usize,
}

impl CsvImport {
    pub fn into_hosts(self) -> Vec<HostRequest> {
        self.candidates.into_iter().map(|c| c.host).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Namespace,
    Address,
    Mac,
    Role,
    Username,
    Password,
    HardwareProfile,
    DisableCertificateVerification,
}

impl Column {
    fn from_header(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" | "hostname" => Some(Column::Name),
            "namespace" => Some(Column::Namespace),
            "bmcaddress" | "address" => Some(Column::Address),
            "macaddress" | "bootmacaddress" => Some(Column::Mac),
            "role" => Some(Column::Role),
            "username" => Some(Column::Username),
            "password" => Some(Column::Password),
            "hardwareprofile" => Some(Column::HardwareProfile),
            "disablecertificateverification" => Some(Column::DisableCertificateVerification),
            _ => None,
        }
    }
}

/// Parse a comma-separated host list into candidate host requests
pub fn import_from_text(raw: &str, ids: &mut dyn IdGenerator) -> Result<CsvImport, ParseError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(raw.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.len() < MIN_HEADER_COLUMNS {
        return Err(ParseError::TooFewColumns { found: headers.len() });
    }

    let mut columns: Vec<Option<Column>> = Vec::with_capacity(headers.len());
    for name in &headers {
        let column = Column::from_header(name);
        if column.is_some() && columns.contains(&column) {
            return Err(ParseError::DuplicateColumn(name.to_string()));
        }
        columns.push(column);
    }
    if !columns.contains(&Some(Column::Name)) {
        return Err(ParseError::MissingColumn("name"));
    }
    if !columns.contains(&Some(Column::Namespace)) {
        return Err(ParseError::MissingColumn("namespace"));
    }

    let mut import = CsvImport::default();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != headers.len() {
            debug!(
                "Skipping row {}: {} fields, header has {}",
                row + 1,
                record.len(),
                headers.len()
            );
            import.skipped_rows += 1;
            continue;
        }

        let host = host_from_record(&columns, &record);
        if host.name.is_empty() || host.namespace.is_empty() {
            debug!("Skipping row {}: empty name or namespace", row + 1);
            import.skipped_rows += 1;
            continue;
        }

        import.candidates.push(CandidateHost { id: ids.next_id(), host });
    }
    Ok(import)
}

fn host_from_record(columns: &[Option<Column>], record: &StringRecord) -> HostRequest {
    let mut host = HostRequest::default();
    for (column, value) in columns.iter().zip(record) {
        let Some(column) = column else {
            continue;
        };
        match column {
            Column::Name => host.name = value.to_string(),
            Column::Namespace => host.namespace = value.to_string(),
            Column::Address => host.bmc.address = value.to_string(),
            Column::Mac => host.boot_mac_address = value.to_string(),
            Column::Role => host.role = HostRole::parse(value),
            Column::Username => host.bmc.username = non_empty(value),
            Column::Password => host.bmc.password = non_empty(value),
            Column::HardwareProfile => host.hardware_profile = non_empty(value),
            Column::DisableCertificateVerification => {
                host.bmc.disable_certificate_verification =
                    matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
            }
        }
    }
    host
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
