//! sf-graph: process flow graph for sanflow.
//!
//! Provides:
//! - Core graph data structures (Unit, Stream, FlowGraph)
//! - Incremental graph builder with validation
//! - Evaluation order with recycle-loop detection
//!
//! # Example
//!
//! ```
//! use sf_graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! let pump = builder.add_unit("P1");
//! let feed = builder.add_stream("influent");
//! let effluent = builder.add_stream("effluent");
//! builder.add_consumer(feed, pump);
//! builder.set_producer(effluent, pump);
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.units().len(), 1);
//! assert_eq!(graph.feeds(), vec![feed]);
//! assert_eq!(graph.products(), vec![effluent]);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod order;
pub(crate) mod validate;

pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{FlowGraph, Stream, Unit};
pub use order::EvaluationOrder;
