//! # Paperflow: Graph-driven PDF Transformation Workflows
//!
//! Paperflow executes declarative **operation graphs** over binary document
//! snapshots: a client submits a tree of transformation steps plus input
//! files and receives the transformed output. Fan-out (`split`), fan-in
//! (`merge`), and branch reconvergence (`wait` join barriers) are routed by
//! arity-aware combinators, and every run can be observed live through a
//! broadcast progress stream.
//!
//! ## Core Concepts
//!
//! - **FileUnit / Payload**: the named document tokens flowing through a
//!   graph; buffers are shared and immutable.
//! - **Operation graph**: a tree of typed operations, parsed from the wire
//!   as an exhaustive sum type.
//! - **Barrier compiler**: one static pre-pass counting how many branches
//!   will reach each `wait` id, before any data flows.
//! - **Traversal engine**: the recursive executor applying per-operation
//!   arity combinators and emitting progress events.
//! - **Workflow sessions**: background runs registered by id, queried,
//!   streamed over SSE, and consumed single-shot over HTTP.
//!
//! ## Running a graph in-process
//!
//! ```
//! use paperflow::compiler::BarrierTable;
//! use paperflow::engine::Traversal;
//! use paperflow::events::NullEmitter;
//! use paperflow::model::{FileUnit, Payload};
//! use paperflow::operations::Operation;
//! use paperflow::transform::OpaqueTransformer;
//! use bytes::Bytes;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph: Vec<Operation> = serde_json::from_str(
//!     r#"[{"type":"rotate","values":{"rotation":90},
//!          "operations":[{"type":"extract",
//!                         "values":{"pagesToExtractArray":[0,2]},
//!                         "operations":[]}]}]"#,
//! )?;
//!
//! let transformer = OpaqueTransformer::new();
//! let mut barriers = BarrierTable::compile(&graph)?;
//! let traversal = Traversal::new(&transformer, &mut barriers, &NullEmitter);
//!
//! let input = Payload::Unit(FileUnit::new("doc.pdf", Bytes::from_static(b"%PDF-1.7")));
//! let outputs = traversal.run(&graph, input).await?;
//!
//! assert_eq!(outputs.len(), 1);
//! assert_eq!(outputs[0].download_name(), "doc_turned_extractedPages.pdf");
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving workflows over HTTP
//!
//! ```no_run
//! use std::sync::Arc;
//! use paperflow::server::{router, ServerConfig};
//! use paperflow::sessions::SessionManager;
//! use paperflow::transform::OpaqueTransformer;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = SessionManager::new(Arc::new(OpaqueTransformer::new()));
//! let app = router(manager);
//!
//! let listener = tokio::net::TcpListener::bind(ServerConfig::from_env().socket_addr()).await?;
//! axum::serve(listener, app.into_make_service()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`model`] - FileUnit and Payload data tokens
//! - [`operations`] - the operation graph wire model
//! - [`compiler`] - join-barrier compilation
//! - [`engine`] - the traversal engine and arity combinators
//! - [`transform`] - the collaborator trait and the opaque default backend
//! - [`events`] - progress events, broadcast hub, emitters
//! - [`sessions`] - workflow session registry and lifecycle
//! - [`server`] - axum router, multipart intake, SSE progress
//! - [`telemetry`] - tracing setup

pub mod compiler;
pub mod engine;
pub mod events;
pub mod model;
pub mod operations;
pub mod server;
pub mod sessions;
pub mod telemetry;
pub mod transform;
