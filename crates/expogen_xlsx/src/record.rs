//! Record access: static field layouts, leaf values and compiled access plans.
//!
//! A [`Record`] publishes its field layout once through [`Record::shape`].
//! Field paths are compiled against that layout into a [`FieldAccessPlan`]
//! holding positional [`FieldId`]s, so per-record resolution never looks
//! names up again.

use std::borrow::Cow;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Positional identifier of a field inside its record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub usize);

/// Static field layout of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    name: String,
    fields: Vec<FieldShape>,
}

/// One named field, optionally holding a nested record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    name: String,
    nested: Option<RecordShape>,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a scalar field; its [`FieldId`] is its position.
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            nested: None,
        });
        self
    }

    /// Append a field holding a nested record of the given shape.
    pub fn with_nested(mut self, name: impl Into<String>, shape: RecordShape) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            nested: Some(shape),
        });
        self
    }

    /// Record type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find a field by name.
    pub fn lookup(&self, name: &str) -> Option<(FieldId, Option<&RecordShape>)> {
        self.fields
            .iter()
            .position(|field| field.name == name)
            .map(|n_idx| (FieldId(n_idx), self.fields[n_idx].nested.as_ref()))
    }
}

/// Value returned by a field accessor.
#[derive(Clone)]
pub enum FieldValue<'a> {
    /// Missing value; stops resolution.
    Null,
    Text(Cow<'a, str>),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Nested record, navigated by the next path segment.
    Record(&'a dyn Record),
}

impl FieldValue<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Text(val) => f.debug_tuple("Text").field(val).finish(),
            Self::Integer(val) => f.debug_tuple("Integer").field(val).finish(),
            Self::Number(val) => f.debug_tuple("Number").field(val).finish(),
            Self::Boolean(val) => f.debug_tuple("Boolean").field(val).finish(),
            Self::Date(val) => f.debug_tuple("Date").field(val).finish(),
            Self::DateTime(val) => f.debug_tuple("DateTime").field(val).finish(),
            Self::Record(_) => write!(f, "Record(..)"),
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(val: &'a str) -> Self {
        Self::Text(Cow::Borrowed(val))
    }
}

impl From<String> for FieldValue<'_> {
    fn from(val: String) -> Self {
        Self::Text(Cow::Owned(val))
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(val: &'a String) -> Self {
        Self::Text(Cow::Borrowed(val.as_str()))
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(val: i64) -> Self {
        Self::Integer(val)
    }
}

impl From<i32> for FieldValue<'_> {
    fn from(val: i32) -> Self {
        Self::Integer(i64::from(val))
    }
}

impl From<u32> for FieldValue<'_> {
    fn from(val: u32) -> Self {
        Self::Integer(i64::from(val))
    }
}

impl From<f64> for FieldValue<'_> {
    fn from(val: f64) -> Self {
        Self::Number(val)
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(val: bool) -> Self {
        Self::Boolean(val)
    }
}

impl From<NaiveDate> for FieldValue<'_> {
    fn from(val: NaiveDate) -> Self {
        Self::Date(val)
    }
}

impl From<NaiveDateTime> for FieldValue<'_> {
    fn from(val: NaiveDateTime) -> Self {
        Self::DateTime(val)
    }
}

impl<'a, T> From<Option<T>> for FieldValue<'a>
where
    T: Into<FieldValue<'a>>,
{
    fn from(val: Option<T>) -> Self {
        val.map_or(Self::Null, Into::into)
    }
}

/// A value exportable through named field access.
///
/// `field` receives ids produced from [`Record::shape`]; an id the record does
/// not know should yield [`FieldValue::Null`].
pub trait Record {
    /// Field layout shared by every value of this type.
    fn shape() -> RecordShape
    where
        Self: Sized;

    /// Read one field.
    fn field(&self, id: FieldId) -> FieldValue<'_>;
}

/// Wrap a nested record, mapping `None` to [`FieldValue::Null`].
pub fn nested<R: Record>(record: Option<&R>) -> FieldValue<'_> {
    match record {
        Some(val) => FieldValue::Record(val),
        None => FieldValue::Null,
    }
}

/// Field path compiled into positional accessor ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessPlan {
    l_field_ids: Vec<FieldId>,
}

impl FieldAccessPlan {
    /// Compile `field_path` against `shape`.
    ///
    /// Every segment but the last must name a nested record; the last must
    /// name a scalar field.
    pub fn compile(shape: &RecordShape, field_path: &[String]) -> Result<Self, String> {
        if field_path.is_empty() {
            return Err("Field path must have at least one segment.".to_string());
        }

        let c_path = field_path.join(".");
        let mut shape_current = shape;
        let mut l_field_ids = Vec::with_capacity(field_path.len());

        for (n_idx, c_segment) in field_path.iter().enumerate() {
            let if_is_leaf = n_idx + 1 == field_path.len();
            let Some((field_id, shape_nested)) = shape_current.lookup(c_segment) else {
                return Err(format!(
                    "No valid accessor for field {c_path:?}: {:?} has no field {c_segment:?}.",
                    shape_current.name()
                ));
            };
            l_field_ids.push(field_id);

            match (if_is_leaf, shape_nested) {
                (true, None) => {}
                (true, Some(_)) => {
                    return Err(format!(
                        "Field {c_path:?} ends on nested record {c_segment:?}; a scalar field is required."
                    ));
                }
                (false, Some(val)) => shape_current = val,
                (false, None) => {
                    return Err(format!(
                        "Field {c_path:?} descends into scalar field {c_segment:?}."
                    ));
                }
            }
        }

        Ok(Self { l_field_ids })
    }

    /// Compiled accessor ids, outermost first.
    pub fn field_ids(&self) -> &[FieldId] {
        &self.l_field_ids
    }

    /// Walk the plan; a missing value at any depth yields [`FieldValue::Null`].
    pub fn resolve<'r>(&self, record: &'r dyn Record) -> FieldValue<'r> {
        let Some((field_id_leaf, l_field_ids_parent)) = self.l_field_ids.split_last() else {
            return FieldValue::Null;
        };

        let mut record_current = record;
        for field_id in l_field_ids_parent {
            match record_current.field(*field_id) {
                FieldValue::Record(val) => record_current = val,
                _ => return FieldValue::Null,
            }
        }

        match record_current.field(*field_id_leaf) {
            FieldValue::Record(_) => FieldValue::Null,
            value => value,
        }
    }
}
