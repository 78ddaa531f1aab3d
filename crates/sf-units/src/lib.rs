//! sf-units: unit operations for dynamic process networks.
//!
//! Provides the unit node contract and its variants:
//! - Mixer (flow-weighted mixing of N inlets)
//! - Splitter (two-way split with per-component fractions)
//! - Pump (pass-through)
//! - HydraulicDelay (first-order lag)
//! - ComponentSplitter (steady-state fan-out of components)
//!
//! Each dynamic unit owns its state and derivative vectors, compiles its
//! derivative function once, and writes both onto its output stream buffers so
//! an external integrator can evolve the whole network.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::dvector;
//! use sf_core::{ComponentRegistry, Id};
//! use sf_units::{Pump, PumpKind, StreamStore, UnitCore, UnitNode};
//!
//! let registry = Arc::new(ComponentRegistry::new(["S_S", "H2O"], "H2O").unwrap());
//! let core = UnitCore::new(
//!     Id::from_index(0),
//!     "P1",
//!     registry,
//!     vec![Id::from_index(0)],
//!     vec![Id::from_index(1)],
//! );
//! let mut pump = Pump::new(core, PumpKind::Lift).unwrap();
//!
//! let mut streams = StreamStore::with_names(["influent", "effluent"]);
//! streams.get_mut(Id::from_index(0)).unwrap().set_state(dvector![30.0, 0.0, 500.0]);
//!
//! pump.init_state(&streams).unwrap();
//! let state = pump.state_vector().unwrap().clone();
//! pump.update_state(state, &mut streams).unwrap();
//! assert_eq!(pump.state().unwrap().flow(), 500.0);
//! ```

pub mod delay;
pub mod error;
pub mod fanout;
pub mod material;
pub mod mixer;
pub mod ode;
pub mod pump;
pub mod report;
pub mod splitter;
pub mod stream;
pub mod traits;

pub use delay::{DEFAULT_T_DELAY, HydraulicDelay};
pub use error::{UnitError, UnitResult};
pub use fanout::{ComponentSplitter, SplitKey};
pub use material::MaterialFlow;
pub use mixer::Mixer;
pub use ode::CompiledOde;
pub use pump::{Pump, PumpKind};
pub use report::OutletReport;
pub use splitter::Splitter;
pub use stream::{StreamBuffer, StreamStore};
pub use traits::{SteadyUnit, UnitCore, UnitKind, UnitNode};
