//! Error types for schema validation and document export.

use thiserror::Error;

use crate::spec::SpecSchemaViolation;
use crate::writer::EnumDocumentState;

/// Schema consistency failure carrying every violation found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid export schema ({} violation(s)): {}", .violations.len(), join_violations(.violations))]
pub struct SchemaError {
    /// All violations, in discovery order.
    pub violations: Vec<SpecSchemaViolation>,
}

impl SchemaError {
    pub fn new(violations: Vec<SpecSchemaViolation>) -> Self {
        Self { violations }
    }

    /// Return the violation messages without scope prefixes.
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }
}

fn join_violations(violations: &[SpecSchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of one export call.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("XLSX write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Row index overflow: {0}")]
    RowOverflow(usize),

    #[error("Column index overflow: {0}")]
    ColumnOverflow(usize),

    #[error("Unknown style handle: {0}")]
    UnknownStyle(usize),

    #[error("Cannot write after the document was finalized.")]
    DocumentClosed,

    #[error("Invalid document transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: EnumDocumentState,
        to: EnumDocumentState,
    },

    #[error("Record source failed: {0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),
}

impl ExportError {
    /// Whether the failure came from the backing writer (header, body or formula writes).
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            Self::Write(_)
                | Self::Io(_)
                | Self::RowOverflow(_)
                | Self::ColumnOverflow(_)
                | Self::UnknownStyle(_)
        )
    }
}
