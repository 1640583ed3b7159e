//! The collaborator boundary: concrete PDF transformation primitives.
//!
//! The traversal engine treats transformations as opaque async functions
//! over binary snapshots. [`Transformer`] is that seam; the engine routes
//! data to it and never inspects document bytes itself. The bundled
//! [`OpaqueTransformer`] implements the seam structurally (no PDF parsing),
//! which is enough to drive every engine path in development and tests.
//! Production embedders bind this trait to a real PDF toolkit.

pub mod opaque;

pub use opaque::OpaqueTransformer;

use async_trait::async_trait;
use bytes::Bytes;
use miette::Diagnostic;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::operations::SplitOnMode;

/// Error raised by a transformation collaborator.
///
/// Any collaborator failure aborts the whole run; there are no
/// partial-failure semantics.
#[derive(Debug, Error, Diagnostic)]
pub enum TransformError {
    #[error("{operation} failed: {message}")]
    #[diagnostic(code(paperflow::transform::failed))]
    Failed {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} received no input documents")]
    #[diagnostic(
        code(paperflow::transform::empty_input),
        help("Check that the branch feeding this operation still carries documents.")
    )]
    EmptyInput { operation: &'static str },
}

/// One or more binary snapshots in, new snapshot(s) out.
///
/// Implementations must be `Send + Sync`; one transformer instance is shared
/// by every workflow the process runs.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Keep only the given zero-based pages.
    async fn extract(&self, snapshot: Bytes, pages: &[usize]) -> Result<Bytes, TransformError>;

    /// Cut after each given zero-based page index, returning the fragments
    /// in document order.
    async fn split(
        &self,
        snapshot: Bytes,
        split_after: &[usize],
    ) -> Result<Vec<Bytes>, TransformError>;

    /// Cut wherever the detector fires.
    async fn split_on(
        &self,
        snapshot: Bytes,
        mode: SplitOnMode,
        threshold: f32,
    ) -> Result<Vec<Bytes>, TransformError>;

    /// Combine the snapshots, in order, into one document.
    async fn merge(&self, snapshots: Vec<Bytes>) -> Result<Bytes, TransformError>;

    /// Rotate every page by the given degrees.
    async fn rotate(&self, snapshot: Bytes, degrees: i32) -> Result<Bytes, TransformError>;

    /// N-up imposition onto the given page format.
    async fn impose(
        &self,
        snapshot: Bytes,
        nup: u32,
        format: &str,
    ) -> Result<Bytes, TransformError>;

    /// Overwrite document information entries.
    async fn edit_metadata(
        &self,
        snapshot: Bytes,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Bytes, TransformError>;

    /// Reorder pages by a named scheme, optionally with an explicit order.
    async fn organize(
        &self,
        snapshot: Bytes,
        operation: &str,
        custom_order: Option<&str>,
    ) -> Result<Bytes, TransformError>;

    /// Drop pages whiter than the threshold.
    async fn remove_blank_pages(
        &self,
        snapshot: Bytes,
        white_threshold: f32,
    ) -> Result<Bytes, TransformError>;
}
