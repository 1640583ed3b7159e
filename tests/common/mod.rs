//! Shared test fixtures: a recording stub collaborator and graph builders.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use paperflow::model::FileUnit;
use paperflow::operations::{OpKind, Operation, SplitOnMode};
use paperflow::transform::{TransformError, Transformer};

/// Stub collaborator that records every call and applies observable,
/// deterministic pseudo-transformations:
///
/// - `rotate` stores the cumulative angle (mod 360) in the snapshot text,
///   so rotation composition is testable through the collaborator contract;
/// - `split` returns `cuts + 1` fragments (or a fixed count configured via
///   [`StubTransformer::with_split_fanout`]);
/// - `merge` concatenates snapshots with `+` separators;
/// - everything else passes the snapshot through.
#[derive(Debug, Default)]
pub struct StubTransformer {
    pub calls: Mutex<Vec<String>>,
    pub merge_input_sizes: Mutex<Vec<usize>>,
    pub merge_calls: AtomicUsize,
    split_fanout: Option<usize>,
    fail_on: Option<&'static str>,
    gate: Option<std::sync::Arc<tokio::sync::Semaphore>>,
}

impl StubTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `split` return a fixed number of fragments regardless of cuts.
    pub fn with_split_fanout(mut self, fanout: usize) -> Self {
        self.split_fanout = Some(fanout);
        self
    }

    /// Make the named operation fail.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Park `rotate` on a semaphore permit, letting tests hold a run
    /// in-flight deterministically.
    pub fn gated(mut self, gate: std::sync::Arc<tokio::sync::Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), TransformError> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.fail_on == Some(operation) {
            return Err(TransformError::Failed {
                operation,
                message: "stub failure".into(),
            });
        }
        Ok(())
    }
}

/// Cumulative rotation angle recorded in a snapshot by the stub.
pub fn recorded_angle(snapshot: &Bytes) -> i64 {
    let text = std::str::from_utf8(snapshot).unwrap_or("");
    text.rsplit_once("@rot=")
        .and_then(|(_, angle)| angle.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl Transformer for StubTransformer {
    async fn extract(&self, snapshot: Bytes, _pages: &[usize]) -> Result<Bytes, TransformError> {
        self.record("extract")?;
        Ok(snapshot)
    }

    async fn split(
        &self,
        snapshot: Bytes,
        split_after: &[usize],
    ) -> Result<Vec<Bytes>, TransformError> {
        self.record("split")?;
        let count = self.split_fanout.unwrap_or(split_after.len() + 1);
        Ok(vec![snapshot; count])
    }

    async fn split_on(
        &self,
        snapshot: Bytes,
        _mode: SplitOnMode,
        _threshold: f32,
    ) -> Result<Vec<Bytes>, TransformError> {
        self.record("splitOn")?;
        let count = self.split_fanout.unwrap_or(2);
        Ok(vec![snapshot; count])
    }

    async fn merge(&self, snapshots: Vec<Bytes>) -> Result<Bytes, TransformError> {
        self.record("merge")?;
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        self.merge_input_sizes.lock().unwrap().push(snapshots.len());
        let combined = snapshots
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect::<Vec<_>>()
            .join("+");
        Ok(Bytes::from(combined))
    }

    async fn rotate(&self, snapshot: Bytes, degrees: i32) -> Result<Bytes, TransformError> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| TransformError::Failed {
                operation: "rotate",
                message: "gate closed".into(),
            })?;
            permit.forget();
        }
        self.record("rotate")?;
        let previous = recorded_angle(&snapshot);
        let base = match std::str::from_utf8(&snapshot) {
            Ok(text) => text.split("@rot=").next().unwrap_or("").to_string(),
            Err(_) => String::new(),
        };
        let angle = (previous + i64::from(degrees)).rem_euclid(360);
        Ok(Bytes::from(format!("{base}@rot={angle}")))
    }

    async fn impose(
        &self,
        snapshot: Bytes,
        _nup: u32,
        _format: &str,
    ) -> Result<Bytes, TransformError> {
        self.record("impose")?;
        Ok(snapshot)
    }

    async fn edit_metadata(
        &self,
        snapshot: Bytes,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<Bytes, TransformError> {
        self.record("editMetadata")?;
        Ok(snapshot)
    }

    async fn organize(
        &self,
        snapshot: Bytes,
        _operation: &str,
        _custom_order: Option<&str>,
    ) -> Result<Bytes, TransformError> {
        self.record("organize")?;
        Ok(snapshot)
    }

    async fn remove_blank_pages(
        &self,
        snapshot: Bytes,
        _white_threshold: f32,
    ) -> Result<Bytes, TransformError> {
        self.record("removeBlankPages")?;
        Ok(snapshot)
    }
}

pub fn unit(name: &str, content: &str) -> FileUnit {
    FileUnit::new(name, Bytes::from(content.to_string()))
}

pub fn rotate(degrees: i32, children: Vec<Operation>) -> Operation {
    Operation::with_children(OpKind::Rotate { rotation: degrees }, children)
}

pub fn extract(pages: Vec<usize>, children: Vec<Operation>) -> Operation {
    Operation::with_children(
        OpKind::Extract {
            pages_to_extract_array: pages,
        },
        children,
    )
}

pub fn split(cuts: Vec<usize>, children: Vec<Operation>) -> Operation {
    Operation::with_children(
        OpKind::Split {
            split_after_page_array: cuts,
        },
        children,
    )
}

pub fn merge(children: Vec<Operation>) -> Operation {
    Operation::with_children(OpKind::Merge, children)
}

pub fn wait(id: &str, children: Vec<Operation>) -> Operation {
    Operation::with_children(OpKind::Wait { id: id.into() }, children)
}
