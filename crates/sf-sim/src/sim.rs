//! Simulation runner and result recording.

use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::integrator::{ForwardEuler, Integrator, RK4};
use crate::model::TransientModel;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, most accurate, 4 rhs calls per step).
    #[default]
    RK4,
    /// Forward Euler (1st-order, faster, 1 rhs call per step).
    ForwardEuler,
}

/// Options for simulation runs.
///
/// Time is in the model's unit; for unit networks that is days.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOptions {
    /// Fixed time step
    pub dt: f64,
    /// Final simulation time
    pub t_end: f64,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
    /// Integrator type (default: RK4)
    pub integrator: IntegratorType,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1e-4,
            t_end: 1.0,
            max_steps: 1_000_000,
            record_every: 100,
            integrator: IntegratorType::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !self.t_end.is_finite() || self.t_end < 0.0 {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// Record of simulation results.
#[derive(Clone, Debug)]
pub struct SimRecord<S> {
    /// Time points
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<S>,
}

impl<S> SimRecord<S> {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Last recorded time and state.
    pub fn last(&self) -> Option<(f64, &S)> {
        Some((*self.t.last()?, self.x.last()?))
    }
}

/// Progress reported after every recorded step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimProgress {
    pub step: usize,
    pub t: f64,
    pub t_end: f64,
}

impl SimProgress {
    pub fn fraction(&self) -> f64 {
        if self.t_end > 0.0 {
            (self.t / self.t_end).min(1.0)
        } else {
            1.0
        }
    }
}

/// Run a transient simulation with the integrator selected in `opts`.
pub fn run_sim<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
) -> SimResult<SimRecord<M::State>> {
    run_sim_with_progress(model, opts, |_| {})
}

/// `run_sim` with a callback invoked at every recorded step.
pub fn run_sim_with_progress<M, F>(
    model: &mut M,
    opts: &SimOptions,
    mut on_progress: F,
) -> SimResult<SimRecord<M::State>>
where
    M: TransientModel,
    F: FnMut(&SimProgress),
{
    opts.validate()?;

    let mut t = 0.0;
    let mut x = model.initial_state()?;

    let mut t_record = vec![t];
    let mut x_record = vec![x.clone()];

    // Steps are counted, not accumulated, so t_end is hit without drift.
    let full_steps = ((opts.t_end / opts.dt) * (1.0 - 1e-12)).ceil().max(0.0) as usize;
    let n_steps = full_steps.min(opts.max_steps);
    debug!(n_steps, dt = opts.dt, integrator = ?opts.integrator, "starting transient run");

    let mut step = 0;
    while step < n_steps {
        let dt = (opts.t_end - t).min(opts.dt);
        x = match opts.integrator {
            IntegratorType::RK4 => RK4.step(model, t, &x, dt)?,
            IntegratorType::ForwardEuler => ForwardEuler.step(model, t, &x, dt)?,
        };
        step += 1;
        t = if step == full_steps {
            opts.t_end
        } else {
            step as f64 * opts.dt
        };

        if step % opts.record_every == 0 {
            t_record.push(t);
            x_record.push(x.clone());
            on_progress(&SimProgress {
                step,
                t,
                t_end: opts.t_end,
            });
        }
    }

    // Always record the final state
    if step % opts.record_every != 0 {
        t_record.push(t);
        x_record.push(x);
    }

    info!(steps = step, t_final = t, records = t_record.len(), "transient run complete");
    Ok(SimRecord {
        t: t_record,
        x: x_record,
    })
}
