//! Per-document style interning.
//!
//! Spreadsheet formats cap the number of distinct style records, so every
//! structurally equal style maps to one handle for the lifetime of a document.

use std::collections::HashMap;

use crate::spec::EnumStyleAlign;

/// Handle of an interned style; the index into the document's style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleHandle(usize);

impl StyleHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Validated, normalized style: the interning key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecStyleKey {
    /// Font family name.
    pub font_name: String,
    /// Font size in points.
    pub font_size: u16,
    /// Bold font.
    pub bold: bool,
    /// Solid fill as `0xRRGGBB`.
    pub background_color: Option<u32>,
    /// Horizontal alignment.
    pub alignment: EnumStyleAlign,
    /// Number format implied by the column type.
    pub num_format: Option<&'static str>,
}

impl SpecStyleKey {
    /// Same style with a number format.
    pub fn with_num_format(mut self, num_format: Option<&'static str>) -> Self {
        self.num_format = num_format;
        self
    }
}

/// Maps structurally equal style keys to one handle.
#[derive(Debug, Default)]
pub struct StyleInterner {
    dict_handles: HashMap<SpecStyleKey, StyleHandle>,
    l_keys: Vec<SpecStyleKey>,
}

impl StyleInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `key`, creating one on first sight.
    ///
    /// The flag is `true` when the handle was created by this call.
    pub fn intern(&mut self, key: &SpecStyleKey) -> (StyleHandle, bool) {
        if let Some(handle) = self.dict_handles.get(key) {
            return (*handle, false);
        }

        let handle = StyleHandle(self.l_keys.len());
        self.l_keys.push(key.clone());
        self.dict_handles.insert(key.clone(), handle);
        (handle, true)
    }

    /// Look up the key behind a handle.
    pub fn get(&self, handle: StyleHandle) -> Option<&SpecStyleKey> {
        self.l_keys.get(handle.0)
    }

    /// Number of distinct styles.
    pub fn len(&self) -> usize {
        self.l_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_keys.is_empty()
    }
}
