//! The traversal engine: walks an operation graph, routes document payloads
//! through arity combinators, and reports progress before every step.
//!
//! One [`Traversal`] executes one run. It borrows the collaborator, the
//! run's compiled [`BarrierTable`], and an event emitter for exactly that
//! run and retains nothing afterwards. Branches are processed sequentially
//! in graph order, so progress events are strictly ordered and barrier
//! decrements need no synchronization.
//!
//! # Routing rules
//!
//! - Terminal node (empty child list): the current payload flattens into
//!   the run's output.
//! - Sibling operations each receive their own clone of the current payload
//!   (clones share document buffers; only name metadata is copied).
//! - one→one (`rotate`, `impose`, `extract`, `editMetadata`, `organize`,
//!   `removeBlankPages`): every unit is mapped in place, shape preserved.
//! - one→many (`split`, `splitOn`): each unit yields an ordered fragment
//!   list; all fragments continue downstream as a single branch set.
//! - many→one (`merge`): the payload is flattened and combined into one
//!   unit named after its inputs.
//! - `wait`: the payload parks at its join barrier; the last expected
//!   arrival resumes the barrier's continuation with everything collected.
//!
//! Any failure aborts the whole run; no partial output is salvaged.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use miette::Diagnostic;
use thiserror::Error;

use crate::compiler::{Arrival, BarrierTable};
use crate::events::{EmitterError, Event, EventEmitter};
use crate::model::{FileUnit, Payload};
use crate::operations::{OpKind, Operation};
use crate::transform::{TransformError, Transformer};

/// Fatal traversal failures.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    /// A `wait` node referenced an id the compiler produced no barrier for.
    #[error("no join barrier compiled for wait id {id:?}")]
    #[diagnostic(
        code(paperflow::engine::unknown_barrier),
        help("Compile the barrier table from the same operation graph the engine traverses.")
    )]
    UnknownBarrier { id: String },

    /// More branches arrived at a barrier than the compiler counted.
    #[error("join barrier {id:?} received an arrival after firing")]
    #[diagnostic(
        code(paperflow::engine::barrier_refire),
        help("The static wait count under-counted arrivals; a continuation must fire exactly once.")
    )]
    BarrierRefire { id: String },

    /// A transformation collaborator failed.
    #[error(transparent)]
    #[diagnostic(code(paperflow::engine::transform))]
    Transform(#[from] TransformError),

    /// A progress event could not be delivered.
    #[error("progress event could not be delivered")]
    #[diagnostic(code(paperflow::engine::emit))]
    Emit(#[from] EmitterError),
}

/// One execution of one operation graph.
pub struct Traversal<'a> {
    transformer: &'a dyn Transformer,
    barriers: &'a mut BarrierTable,
    emitter: &'a dyn EventEmitter,
    output: Vec<FileUnit>,
}

impl<'a> Traversal<'a> {
    pub fn new(
        transformer: &'a dyn Transformer,
        barriers: &'a mut BarrierTable,
        emitter: &'a dyn EventEmitter,
    ) -> Self {
        Self {
            transformer,
            barriers,
            emitter,
            output: Vec::new(),
        }
    }

    /// Walk the graph with the given initial payload and return the flat
    /// output list. Consumes the traversal: each run is fresh.
    #[tracing::instrument(skip_all, fields(roots = operations.len(), inputs = input.len()), err)]
    pub async fn run(
        mut self,
        operations: &[Operation],
        input: Payload,
    ) -> Result<Vec<FileUnit>, EngineError> {
        self.walk(operations, input).await?;
        tracing::debug!(outputs = self.output.len(), "traversal complete");
        Ok(self.output)
    }

    fn walk<'b>(
        &'b mut self,
        operations: &'b [Operation],
        value: Payload,
    ) -> BoxFuture<'b, Result<(), EngineError>> {
        async move {
            if operations.is_empty() {
                // Base case: whatever reaches a terminal node is a result.
                self.output.extend(value.into_units());
                return Ok(());
            }
            for operation in operations {
                self.step(operation, value.clone()).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn step(&mut self, operation: &Operation, value: Payload) -> Result<(), EngineError> {
        let label = operation.kind.label();
        self.emitter
            .emit(Event::progress(label, format!("Starting: {label}")))?;
        tracing::debug!(operation = label, units = value.len(), "applying operation");

        match &operation.kind {
            OpKind::Rotate { rotation } => {
                let rotation = *rotation;
                let next = self
                    .unary(value, "_turned", |buf| {
                        self.transformer.rotate(buf, rotation)
                    })
                    .await?;
                self.walk(&operation.operations, next).await
            }

            OpKind::Extract {
                pages_to_extract_array,
            } => {
                let next = self
                    .unary(value, "_extractedPages", |buf| {
                        self.transformer.extract(buf, pages_to_extract_array)
                    })
                    .await?;
                self.walk(&operation.operations, next).await
            }

            OpKind::Impose { nup, format } => {
                let nup = *nup;
                let next = self
                    .unary(value, "_imposed", |buf| {
                        self.transformer.impose(buf, nup, format)
                    })
                    .await?;
                self.walk(&operation.operations, next).await
            }

            OpKind::EditMetadata { metadata } => {
                let next = self
                    .unary(value, "_editedMetadata", |buf| {
                        self.transformer.edit_metadata(buf, metadata)
                    })
                    .await?;
                self.walk(&operation.operations, next).await
            }

            OpKind::Organize {
                operation: scheme,
                custom_order,
            } => {
                let next = self
                    .unary(value, "_organized", |buf| {
                        self.transformer
                            .organize(buf, scheme, custom_order.as_deref())
                    })
                    .await?;
                self.walk(&operation.operations, next).await
            }

            OpKind::RemoveBlankPages { white_threshold } => {
                let white_threshold = *white_threshold;
                let next = self
                    .unary(value, "_blanksRemoved", |buf| {
                        self.transformer.remove_blank_pages(buf, white_threshold)
                    })
                    .await?;
                self.walk(&operation.operations, next).await
            }

            OpKind::Split {
                split_after_page_array,
            } => {
                let mut fragments = Vec::new();
                for unit in value.into_units() {
                    let parts = self
                        .transformer
                        .split(unit.buffer.clone(), split_after_page_array)
                        .await?;
                    for (index, buffer) in parts.into_iter().enumerate() {
                        fragments.push(unit.suffixed(&format!("_split{index}"), buffer));
                    }
                }
                self.walk(&operation.operations, Payload::Batch(fragments))
                    .await
            }

            OpKind::SplitOn { mode, threshold } => {
                let (mode, threshold) = (*mode, *threshold);
                let mut fragments = Vec::new();
                for unit in value.into_units() {
                    let parts = self
                        .transformer
                        .split_on(unit.buffer.clone(), mode, threshold)
                        .await?;
                    for (index, buffer) in parts.into_iter().enumerate() {
                        fragments.push(unit.suffixed(&format!("_split{index}"), buffer));
                    }
                }
                self.walk(&operation.operations, Payload::Batch(fragments))
                    .await
            }

            OpKind::Merge => {
                // Already-batched inputs are flattened and merged in order.
                let units = value.into_units();
                let file_name = units
                    .iter()
                    .map(|u| u.file_name.as_str())
                    .collect::<Vec<_>>()
                    .join("_")
                    + "_merged";
                let original_file_name = units
                    .first()
                    .map(|u| u.original_file_name.clone())
                    .unwrap_or_default();
                let buffers = units.iter().map(|u| u.buffer.clone()).collect();
                let buffer = self.transformer.merge(buffers).await?;
                let merged = FileUnit {
                    original_file_name,
                    file_name,
                    buffer,
                };
                self.walk(&operation.operations, Payload::Unit(merged))
                    .await
            }

            OpKind::Wait { id } => {
                let barrier =
                    self.barriers
                        .get_mut(id)
                        .ok_or_else(|| EngineError::UnknownBarrier {
                            id: id.clone(),
                        })?;
                match barrier.arrive(value.into_units()) {
                    Arrival::Pending => Ok(()),
                    Arrival::Refired => Err(EngineError::BarrierRefire { id: id.clone() }),
                    Arrival::Fire {
                        continuation,
                        inputs,
                    } => {
                        tracing::debug!(id = %id, inputs = inputs.len(), "join barrier fired");
                        self.walk(&continuation, Payload::Batch(inputs)).await
                    }
                }
            }
        }
    }

    /// Map every unit of a one→one operation, preserving payload shape.
    async fn unary<F, Fut>(
        &self,
        value: Payload,
        suffix: &str,
        apply: F,
    ) -> Result<Payload, EngineError>
    where
        F: Fn(Bytes) -> Fut,
        Fut: Future<Output = Result<Bytes, TransformError>>,
    {
        match value {
            Payload::Unit(unit) => {
                let buffer = apply(unit.buffer.clone()).await?;
                Ok(Payload::Unit(unit.suffixed(suffix, buffer)))
            }
            Payload::Batch(units) => {
                let mut mapped = Vec::with_capacity(units.len());
                for unit in units {
                    let buffer = apply(unit.buffer.clone()).await?;
                    mapped.push(unit.suffixed(suffix, buffer));
                }
                Ok(Payload::Batch(mapped))
            }
        }
    }
}
