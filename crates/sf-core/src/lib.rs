//! sf-core: stable foundation for sanflow.
//!
//! Contains:
//! - ids (stable compact IDs for units and streams)
//! - numeric (Real + tolerances + float helpers)
//! - registry (ordered component identities shared by a network)
//! - state (state/derivative vectors and their labeled view)
//! - units (uom quantities for reported flows and concentrations)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod registry;
pub mod state;
pub mod units;

pub use error::{SfError, SfResult};
pub use ids::*;
pub use numeric::*;
pub use registry::{ComponentRegistry, FLOW_LABEL};
pub use state::{DerivativeVector, StateVector, StateView, check_shape, state_from_parts};
pub use units::*;
