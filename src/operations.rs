//! The declarative operation graph submitted by clients.
//!
//! On the wire every node is `{"type": ..., "values": {...}, "operations": [...]}`.
//! [`OpKind`] models the `type`/`values` pair as an adjacently tagged enum, so
//! an unknown operation type or malformed parameters is rejected while the
//! graph is parsed, before any barrier compilation or data flow. Adding an
//! operation type is a compiler-enforced decision: every `match` over
//! [`OpKind`] is exhaustive.
//!
//! # Examples
//!
//! ```
//! use paperflow::operations::{Operation, OpKind};
//!
//! let graph: Vec<Operation> = serde_json::from_str(
//!     r#"[{"type":"rotate","values":{"rotation":90},
//!          "operations":[{"type":"extract",
//!                         "values":{"pagesToExtractArray":[0,2]},
//!                         "operations":[]}]}]"#,
//! ).unwrap();
//! assert!(matches!(graph[0].kind, OpKind::Rotate { rotation: 90 }));
//! assert_eq!(graph[0].operations.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One node of the operation graph.
///
/// An empty `operations` list marks a terminal node: whatever value reaches
/// it becomes part of the final result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    #[serde(flatten)]
    pub kind: OpKind,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Operation {
    /// Leaf node constructor, mostly useful in tests and embedding code.
    pub fn leaf(kind: OpKind) -> Self {
        Self {
            kind,
            operations: Vec::new(),
        }
    }

    /// Node with children.
    pub fn with_children(kind: OpKind, operations: Vec<Operation>) -> Self {
        Self { kind, operations }
    }
}

/// Operation type plus its parameters, tagged exactly like the wire format.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "camelCase")]
pub enum OpKind {
    /// Keep only the given zero-based pages.
    #[serde(rename_all = "camelCase")]
    Extract { pages_to_extract_array: Vec<usize> },

    /// Cut the document after each given zero-based page index.
    #[serde(rename_all = "camelCase")]
    Split { split_after_page_array: Vec<usize> },

    /// Cut the document wherever a detector fires.
    #[serde(rename_all = "camelCase")]
    SplitOn {
        mode: SplitOnMode,
        #[serde(default = "default_threshold")]
        threshold: f32,
    },

    /// Combine every unit of the current branch set into one document.
    Merge,

    /// Rotate every page by the given degrees.
    Rotate { rotation: i32 },

    /// N-up imposition onto the given page format.
    Impose { nup: u32, format: String },

    /// Overwrite document information entries.
    EditMetadata { metadata: BTreeMap<String, String> },

    /// Reorder pages by a named scheme, optionally with an explicit order.
    #[serde(rename_all = "camelCase")]
    Organize {
        operation: String,
        #[serde(default)]
        custom_order: Option<String>,
    },

    /// Drop pages whiter than the threshold.
    #[serde(rename_all = "camelCase")]
    RemoveBlankPages {
        #[serde(default = "default_threshold")]
        white_threshold: f32,
    },

    /// Join-barrier arrival point; branches carrying the same id reconverge.
    Wait { id: String },
}

fn default_threshold() -> f32 {
    10.0
}

/// Detector driving a [`OpKind::SplitOn`] cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SplitOnMode {
    BlankPage,
    QrCode,
}

impl OpKind {
    /// Wire-format label, used in progress events and error messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            OpKind::Extract { .. } => "extract",
            OpKind::Split { .. } => "split",
            OpKind::SplitOn { .. } => "splitOn",
            OpKind::Merge => "merge",
            OpKind::Rotate { .. } => "rotate",
            OpKind::Impose { .. } => "impose",
            OpKind::EditMetadata { .. } => "editMetadata",
            OpKind::Organize { .. } => "organize",
            OpKind::RemoveBlankPages { .. } => "removeBlankPages",
            OpKind::Wait { .. } => "wait",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
