//! Structural transformer that never parses document bytes.
//!
//! Fan-out operations clone the snapshot per fragment, `merge` concatenates
//! buffers, and unary operations pass the snapshot through unchanged. Arity
//! and routing (the engine's whole concern) behave exactly as they would
//! against a real PDF backend, which makes this the default collaborator for
//! development, demos, and tests.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;

use super::{TransformError, Transformer};
use crate::operations::SplitOnMode;

/// Default in-process collaborator. Stateless and freely shareable.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpaqueTransformer;

impl OpaqueTransformer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transformer for OpaqueTransformer {
    async fn extract(&self, snapshot: Bytes, _pages: &[usize]) -> Result<Bytes, TransformError> {
        Ok(snapshot)
    }

    async fn split(
        &self,
        snapshot: Bytes,
        split_after: &[usize],
    ) -> Result<Vec<Bytes>, TransformError> {
        // n cut points yield n + 1 fragments, all sharing the snapshot.
        Ok(vec![snapshot; split_after.len() + 1])
    }

    async fn split_on(
        &self,
        snapshot: Bytes,
        _mode: SplitOnMode,
        _threshold: f32,
    ) -> Result<Vec<Bytes>, TransformError> {
        // Without page inspection there is nothing to detect on.
        Ok(vec![snapshot])
    }

    async fn merge(&self, snapshots: Vec<Bytes>) -> Result<Bytes, TransformError> {
        if snapshots.is_empty() {
            return Err(TransformError::EmptyInput { operation: "merge" });
        }
        let mut combined = BytesMut::with_capacity(snapshots.iter().map(Bytes::len).sum());
        for snapshot in snapshots {
            combined.extend_from_slice(&snapshot);
        }
        Ok(combined.freeze())
    }

    async fn rotate(&self, snapshot: Bytes, _degrees: i32) -> Result<Bytes, TransformError> {
        Ok(snapshot)
    }

    async fn impose(
        &self,
        snapshot: Bytes,
        _nup: u32,
        _format: &str,
    ) -> Result<Bytes, TransformError> {
        Ok(snapshot)
    }

    async fn edit_metadata(
        &self,
        snapshot: Bytes,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<Bytes, TransformError> {
        Ok(snapshot)
    }

    async fn organize(
        &self,
        snapshot: Bytes,
        _operation: &str,
        _custom_order: Option<&str>,
    ) -> Result<Bytes, TransformError> {
        Ok(snapshot)
    }

    async fn remove_blank_pages(
        &self,
        snapshot: Bytes,
        _white_threshold: f32,
    ) -> Result<Bytes, TransformError> {
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn split_yields_one_more_fragment_than_cuts() {
        let parts = OpaqueTransformer
            .split(Bytes::from_static(b"doc"), &[1, 3])
            .await
            .unwrap();
        assert_eq!(parts.len(), 3);
    }

    #[tokio::test]
    async fn merge_concatenates_in_order() {
        let merged = OpaqueTransformer
            .merge(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")])
            .await
            .unwrap();
        assert_eq!(&merged[..], b"abcd");
    }

    #[tokio::test]
    async fn merge_of_nothing_is_an_error() {
        let err = OpaqueTransformer.merge(vec![]).await.unwrap_err();
        assert!(matches!(err, TransformError::EmptyInput { operation: "merge" }));
    }
}
