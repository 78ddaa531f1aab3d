//! Transient simulation of dynamic unit networks.
//!
//! Provides:
//! - `TransientModel` for pluggable dynamic systems
//! - Fixed-step RK4 and forward Euler integrators
//! - `run_sim` driver with decimated recording
//! - `DynamicNetwork`: unit nodes over a flow graph, evaluated as one global
//!   state/derivative function

pub mod error;
pub mod integrator;
pub mod model;
pub mod network;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, RK4};
pub use model::TransientModel;
pub use network::DynamicNetwork;
pub use sim::{IntegratorType, SimOptions, SimProgress, SimRecord, run_sim, run_sim_with_progress};
