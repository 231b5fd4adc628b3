//! Export entry points: a validated schema compiled against one record type.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::{ExportError, SchemaError};
use crate::record::{FieldAccessPlan, Record};
use crate::schema::ValidatedSchema;
use crate::sink::{MemorySheetSink, SheetSink, XlsxSheetSink};
use crate::spec::{SpecExportOptions, SpecSchemaViolation};
use crate::writer::{Document, DocumentBuilder};

/// Schema, compiled field accessors, final sheet name and writer options.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub(crate) schema: ValidatedSchema,
    pub(crate) l_access_plans: Vec<FieldAccessPlan>,
    pub(crate) sheet_name: String,
    pub(crate) options: SpecExportOptions,
}

impl ExportPlan {
    pub fn schema(&self) -> &ValidatedSchema {
        &self.schema
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn options(&self) -> &SpecExportOptions {
        &self.options
    }
}

/// Reusable exporter of `R` values; every export call owns its own builder.
pub struct Exporter<R: Record> {
    plan: ExportPlan,
    _record: PhantomData<fn(&R)>,
}

impl<R: Record> Clone for Exporter<R> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> fmt::Debug for Exporter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter").field("plan", &self.plan).finish()
    }
}

impl<R: Record> Exporter<R> {
    /// Compile every column's field path against `R`'s shape.
    ///
    /// Unknown accessors are reported together as one [`SchemaError`].
    pub fn new(schema: &ValidatedSchema) -> Result<Self, SchemaError> {
        let shape = R::shape();

        let mut l_violations = Vec::new();
        let mut l_access_plans = Vec::with_capacity(schema.columns().len());
        for col in schema.columns() {
            match FieldAccessPlan::compile(&shape, &col.column.field_path) {
                Ok(access) => l_access_plans.push(access),
                Err(msg) => {
                    let mut violation = SpecSchemaViolation::column_level(col.idx_declared, msg);
                    if !schema.name().is_empty() {
                        violation.schema = Some(schema.name().to_string());
                    }
                    l_violations.push(violation);
                }
            }
        }
        if !l_violations.is_empty() {
            return Err(SchemaError::new(l_violations));
        }

        let sheet_name = schema.derive_sheet_name(shape.name());
        debug!(sheet = %sheet_name, columns = l_access_plans.len(), "compiled export plan");

        Ok(Self {
            plan: ExportPlan {
                schema: schema.clone(),
                l_access_plans,
                sheet_name,
                options: SpecExportOptions::default(),
            },
            _record: PhantomData,
        })
    }

    /// Replace the writer-wide options.
    pub fn with_options(mut self, options: SpecExportOptions) -> Self {
        self.plan.options = options;
        self
    }

    pub fn plan(&self) -> &ExportPlan {
        &self.plan
    }

    /// Start a document over `sink`; drive it stage by stage.
    pub fn builder<S: SheetSink>(&self, sink: S) -> DocumentBuilder<'_, R, S> {
        DocumentBuilder::new(&self.plan, sink)
    }

    /// Export a finite collection or a lazy sequence to an XLSX document.
    pub fn export<I>(&self, records: I) -> Result<Document, ExportError>
    where
        I: IntoIterator,
        I::Item: Borrow<R>,
    {
        let sink = XlsxSheetSink::new(&self.plan.options)?;
        self.export_into(sink, records)
    }

    /// Export a fallible lazy source to an XLSX document.
    pub fn try_export<I, T, E>(&self, records: I) -> Result<Document, ExportError>
    where
        I: IntoIterator<Item = Result<T, E>>,
        T: Borrow<R>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let sink = XlsxSheetSink::new(&self.plan.options)?;
        let mut builder = self.builder(sink);
        builder.try_write_records(records)?;
        builder.into_document()
    }

    /// Export into a caller-provided sink.
    pub fn export_into<S, I>(&self, sink: S, records: I) -> Result<Document<S>, ExportError>
    where
        S: SheetSink,
        I: IntoIterator,
        I::Item: Borrow<R>,
    {
        let mut builder = self.builder(sink);
        builder.write_header()?;
        builder.write_records(records)?;
        builder.into_document()
    }

    /// Export into an in-memory sheet for inspection.
    pub fn preview<I>(&self, records: I) -> Result<Document<MemorySheetSink>, ExportError>
    where
        I: IntoIterator,
        I::Item: Borrow<R>,
    {
        self.export_into(MemorySheetSink::new(), records)
    }
}
