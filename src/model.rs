//! Data tokens flowing through the operation graph.
//!
//! A [`FileUnit`] is one named binary document snapshot. A [`Payload`] is the
//! value travelling along a single branch of the graph: either one unit or an
//! ordered branch set produced by a fan-out operation.
//!
//! Buffers are [`Bytes`], so handing a payload to several sibling branches
//! clones reference-counted handles and small name strings, never the
//! document bytes themselves.

use bytes::Bytes;

/// One named document snapshot.
///
/// `original_file_name` is fixed at upload time and never mutated.
/// `file_name` carries no extension and accumulates a textual suffix per
/// applied operation (`_turned`, `_split0`, ...), preserving traceability
/// through the graph. The `.pdf` extension is appended only when a result
/// leaves the process.
///
/// # Examples
///
/// ```
/// use paperflow::model::FileUnit;
/// use bytes::Bytes;
///
/// let unit = FileUnit::new("doc.pdf", Bytes::from_static(b"%PDF-1.7"));
/// assert_eq!(unit.file_name, "doc");
/// assert_eq!(unit.original_file_name, "doc.pdf");
///
/// let turned = unit.renamed("doc_turned", Bytes::from_static(b"%PDF-1.7"));
/// assert_eq!(turned.original_file_name, "doc.pdf");
/// assert_eq!(turned.download_name(), "doc_turned.pdf");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUnit {
    /// The filename the client uploaded, untouched.
    pub original_file_name: String,
    /// Working name without extension; grows one suffix per operation.
    pub file_name: String,
    /// Opaque document snapshot. Shared, immutable.
    pub buffer: Bytes,
}

impl FileUnit {
    /// Create a unit from an uploaded filename, stripping a trailing
    /// `.pdf`/`.PDF` extension from the working name.
    pub fn new(uploaded_name: impl Into<String>, buffer: Bytes) -> Self {
        let original_file_name = uploaded_name.into();
        let file_name = original_file_name
            .strip_suffix(".pdf")
            .or_else(|| original_file_name.strip_suffix(".PDF"))
            .unwrap_or(&original_file_name)
            .to_string();
        Self {
            original_file_name,
            file_name,
            buffer,
        }
    }

    /// Derive a unit with a new working name and snapshot, keeping the
    /// original filename for traceability.
    #[must_use]
    pub fn renamed(&self, file_name: impl Into<String>, buffer: Bytes) -> Self {
        Self {
            original_file_name: self.original_file_name.clone(),
            file_name: file_name.into(),
            buffer,
        }
    }

    /// Derive a unit whose working name is this unit's name plus `suffix`.
    #[must_use]
    pub fn suffixed(&self, suffix: &str, buffer: Bytes) -> Self {
        self.renamed(format!("{}{suffix}", self.file_name), buffer)
    }

    /// Filename served on download.
    #[must_use]
    pub fn download_name(&self) -> String {
        format!("{}.pdf", self.file_name)
    }
}

/// The value flowing along one branch of the graph.
///
/// Fan-out operations produce a [`Batch`](Payload::Batch); shape is
/// preserved downstream so children observe the fan-out. A batch of length
/// one is still a batch.
#[derive(Clone, Debug)]
pub enum Payload {
    /// A single document travelling alone.
    Unit(FileUnit),
    /// An ordered branch set produced by a fan-out.
    Batch(Vec<FileUnit>),
}

impl Payload {
    /// Wrap uploaded inputs: one file travels as a unit, several as a batch.
    pub fn from_inputs(mut units: Vec<FileUnit>) -> Self {
        if units.len() == 1 {
            Payload::Unit(units.remove(0))
        } else {
            Payload::Batch(units)
        }
    }

    /// Flatten into the underlying units, preserving order.
    pub fn into_units(self) -> Vec<FileUnit> {
        match self {
            Payload::Unit(unit) => vec![unit],
            Payload::Batch(units) => units,
        }
    }

    /// Borrow the underlying units in order.
    pub fn units(&self) -> &[FileUnit] {
        match self {
            Payload::Unit(unit) => std::slice::from_ref(unit),
            Payload::Batch(units) => units,
        }
    }

    /// Number of units currently in this branch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Payload::Unit(_) => 1,
            Payload::Batch(units) => units.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_stripped_once() {
        let unit = FileUnit::new("scan.pdf", Bytes::new());
        assert_eq!(unit.file_name, "scan");
        let unit = FileUnit::new("archive.pdf.pdf", Bytes::new());
        assert_eq!(unit.file_name, "archive.pdf");
        let unit = FileUnit::new("plain", Bytes::new());
        assert_eq!(unit.file_name, "plain");
    }

    #[test]
    fn suffix_accumulates() {
        let unit = FileUnit::new("doc.pdf", Bytes::new());
        let turned = unit.suffixed("_turned", Bytes::new());
        let extracted = turned.suffixed("_extractedPages", Bytes::new());
        assert_eq!(extracted.download_name(), "doc_turned_extractedPages.pdf");
        assert_eq!(extracted.original_file_name, "doc.pdf");
    }

    #[test]
    fn single_input_travels_as_unit() {
        let p = Payload::from_inputs(vec![FileUnit::new("a.pdf", Bytes::new())]);
        assert!(matches!(p, Payload::Unit(_)));
        let p = Payload::from_inputs(vec![
            FileUnit::new("a.pdf", Bytes::new()),
            FileUnit::new("b.pdf", Bytes::new()),
        ]);
        assert!(matches!(p, Payload::Batch(_)));
        assert_eq!(p.len(), 2);
    }
}
