//! Join-barrier compilation.
//!
//! Before any data flows, one static walk over the operation graph builds a
//! [`BarrierTable`]: for every `wait` id, how many branches will arrive and
//! which child list resumes once they all have. Each `wait` node present in
//! the tree is one arrival path; fan-out produced at runtime by `split`
//! does not multiply arrivals, because the engine routes a fragment list
//! downstream as a single branch set.
//!
//! The table is owned by exactly one run. Arrivals decrement a floor-clamped
//! counter; the continuation fires exactly once, and any arrival after the
//! barrier has fired is reported to the engine as a fatal error rather than
//! silently re-firing.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::model::FileUnit;
use crate::operations::{OpKind, Operation};

/// Errors detected while compiling the barrier table.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// Two `wait` nodes with the same id both carry children, so the barrier
    /// has no single continuation to resume.
    #[error("wait id {id:?} has more than one continuation")]
    #[diagnostic(
        code(paperflow::compiler::ambiguous_continuation),
        help("Give the continuation to exactly one wait node per id; leave the others childless.")
    )]
    AmbiguousContinuation { id: String },
}

/// Synchronization point where branches carrying one `wait` id reconverge.
#[derive(Debug)]
pub struct JoinBarrier {
    id: String,
    wait_count: usize,
    accumulated: Vec<FileUnit>,
    continuation: Vec<Operation>,
    fired: bool,
}

/// Outcome of one arrival at a barrier.
#[derive(Debug)]
pub enum Arrival {
    /// More branches are still expected; this branch terminates silently.
    Pending,
    /// Last expected branch arrived: resume the continuation with every
    /// accumulated unit, in arrival order.
    Fire {
        continuation: Vec<Operation>,
        inputs: Vec<FileUnit>,
    },
    /// The barrier already fired; the compiled count under-counted arrivals.
    Refired,
}

impl JoinBarrier {
    fn new(id: String) -> Self {
        Self {
            id,
            wait_count: 0,
            accumulated: Vec::new(),
            continuation: Vec::new(),
            fired: false,
        }
    }

    /// Construct a barrier with explicit state. Intended for tests and
    /// embedders that build tables by hand.
    pub fn with_state(
        id: impl Into<String>,
        wait_count: usize,
        continuation: Vec<Operation>,
    ) -> Self {
        Self {
            id: id.into(),
            wait_count,
            accumulated: Vec::new(),
            continuation,
            fired: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn wait_count(&self) -> usize {
        self.wait_count
    }

    pub fn continuation(&self) -> &[Operation] {
        &self.continuation
    }

    /// Record one branch arriving with its units.
    ///
    /// Decrements the counter (floored at zero) and fires the continuation
    /// exactly once, when the count reaches zero. Firing consumes the
    /// accumulated units and takes the continuation out of the barrier.
    pub fn arrive(&mut self, units: Vec<FileUnit>) -> Arrival {
        if self.fired {
            return Arrival::Refired;
        }
        self.accumulated.extend(units);
        self.wait_count = self.wait_count.saturating_sub(1);
        if self.wait_count == 0 {
            self.fired = true;
            Arrival::Fire {
                continuation: std::mem::take(&mut self.continuation),
                inputs: std::mem::take(&mut self.accumulated),
            }
        } else {
            Arrival::Pending
        }
    }
}

/// Map of `wait` id to its compiled barrier, owned by one run.
#[derive(Debug, Default)]
pub struct BarrierTable {
    barriers: FxHashMap<String, JoinBarrier>,
}

impl BarrierTable {
    /// Compile the barrier table for a full root operation list.
    pub fn compile(operations: &[Operation]) -> Result<Self, CompileError> {
        let mut table = Self::default();
        table.visit(operations)?;
        for barrier in table.barriers.values() {
            tracing::debug!(
                id = %barrier.id,
                wait_count = barrier.wait_count,
                continuation_len = barrier.continuation.len(),
                "compiled join barrier"
            );
        }
        Ok(table)
    }

    fn visit(&mut self, operations: &[Operation]) -> Result<(), CompileError> {
        for operation in operations {
            if let OpKind::Wait { id } = &operation.kind {
                let barrier = self
                    .barriers
                    .entry(id.clone())
                    .or_insert_with(|| JoinBarrier::new(id.clone()));
                barrier.wait_count += 1;
                if !operation.operations.is_empty() {
                    if !barrier.continuation.is_empty() {
                        return Err(CompileError::AmbiguousContinuation { id: id.clone() });
                    }
                    barrier.continuation = operation.operations.clone();
                }
            }
            self.visit(&operation.operations)?;
        }
        Ok(())
    }

    /// Insert a hand-built barrier, replacing any previous one with that id.
    pub fn insert(&mut self, barrier: JoinBarrier) {
        self.barriers.insert(barrier.id.clone(), barrier);
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut JoinBarrier> {
        self.barriers.get_mut(id)
    }

    pub fn get(&self, id: &str) -> Option<&JoinBarrier> {
        self.barriers.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }
}
