//! Compiled derivative functions.
//!
//! Each unit builds its derivative function once, capturing only the
//! parameters it needs (input count, delay constant), and caches it. The
//! evaluation itself is pure: it maps upstream states/derivatives plus the
//! unit's own state to the unit's derivative vector. Writing the result into
//! the unit and its output buffers is the caller's job (`UnitNode::apply_ode`).

use nalgebra::{DMatrix, DVector};
use sf_core::{DerivativeVector, StateVector};

use crate::error::{UnitError, UnitResult};

/// Captured parameters of a unit's derivative function.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledOde {
    /// Derivative equals the single upstream derivative.
    PassThrough,
    /// Flow-weighted mixing of `n_ins` inputs.
    Mixer { n_ins: usize },
    /// First-order lag with time constant `t_delay`.
    FirstOrderLag { t_delay: f64 },
}

impl CompiledOde {
    /// Evaluate the derivative.
    ///
    /// `ins_state` / `ins_dstate` hold one upstream stream per row; every row
    /// and `state` use the state layout (components then flow).
    pub fn eval(
        &self,
        _t: f64,
        ins_state: &DMatrix<f64>,
        state: &StateVector,
        ins_dstate: &DMatrix<f64>,
    ) -> UnitResult<DerivativeVector> {
        if ins_state.nrows() == 0 {
            return Err(UnitError::NonPhysical {
                what: "derivative needs at least one upstream stream",
            });
        }
        if ins_state.shape() != ins_dstate.shape() {
            return Err(UnitError::ShapeMismatch {
                expected: ins_state.len(),
                actual: ins_dstate.len(),
            });
        }
        flow_index(state.len())?;
        if ins_state.ncols() != state.len() {
            return Err(UnitError::ShapeMismatch {
                expected: state.len(),
                actual: ins_state.ncols(),
            });
        }

        match *self {
            CompiledOde::PassThrough => Ok(ins_dstate.row(0).transpose()),
            CompiledOde::Mixer { n_ins } => {
                if ins_state.nrows() != n_ins {
                    return Err(UnitError::ShapeMismatch {
                        expected: n_ins,
                        actual: ins_state.nrows(),
                    });
                }
                if n_ins == 1 {
                    Ok(ins_dstate.row(0).transpose())
                } else {
                    mix_derivative(ins_state, ins_dstate)
                }
            }
            CompiledOde::FirstOrderLag { t_delay } => lag_derivative(t_delay, ins_state, state, ins_dstate),
        }
    }
}

/// Flow-weighted average of the input rows: `(C, Q)` with `Q = Σ Q_i` and
/// `C = Σ Q_i·C_i / Q`.
pub fn mix_state(ins_state: &DMatrix<f64>) -> UnitResult<StateVector> {
    let n = flow_index(ins_state.ncols())?;
    let q_ins = ins_state.column(n);
    let c_ins = ins_state.columns(0, n);

    let q = q_ins.sum();
    if q == 0.0 {
        return Err(UnitError::NonPhysical {
            what: "total inflow to a mixer is zero",
        });
    }
    let c = c_ins.tr_mul(&q_ins) / q;
    Ok(with_flow(c, q))
}

/// Quotient-rule derivative of the flow-weighted average:
///
/// ```text
/// Q'  = Σ Q_i'
/// C'  = (Σ Q_i'·C_i + Σ Q_i·C_i' − Q'·C) / Q
/// ```
fn mix_derivative(ins_state: &DMatrix<f64>, ins_dstate: &DMatrix<f64>) -> UnitResult<DerivativeVector> {
    let n = flow_index(ins_state.ncols())?;
    let q_ins = ins_state.column(n);
    let c_ins = ins_state.columns(0, n);
    let dq_ins = ins_dstate.column(n);
    let dc_ins = ins_dstate.columns(0, n);

    let q = q_ins.sum();
    if q == 0.0 {
        return Err(UnitError::NonPhysical {
            what: "total inflow to a mixer is zero",
        });
    }
    let c = c_ins.tr_mul(&q_ins) / q;
    let q_dot = dq_ins.sum();
    let c_dot = (c_ins.tr_mul(&dq_ins) + dc_ins.tr_mul(&q_ins) - c * q_dot) / q;
    Ok(with_flow(c_dot, q_dot))
}

/// First-order lag toward the single upstream stream.
///
/// The branch on an exactly-zero upstream flow derivative is a known modeling
/// discontinuity and is kept as is:
///
/// ```text
/// Q_in' == 0:  Q' = 0,                C' = (Q_in·C_in − Q·C) / (Q·T)
/// otherwise:   Q' = (Q_in − Q) / T,   C' = (Q_in / Q)·(C_in − C) / T
/// ```
fn lag_derivative(
    t_delay: f64,
    ins_state: &DMatrix<f64>,
    state: &StateVector,
    ins_dstate: &DMatrix<f64>,
) -> UnitResult<DerivativeVector> {
    let n = flow_index(state.len())?;
    let q_in = ins_state[(0, n)];
    let c_in: DVector<f64> = ins_state.row(0).columns(0, n).transpose();
    let q = state[n];
    let c = state.rows(0, n);
    let dq_in = ins_dstate[(0, n)];

    if q <= 0.0 {
        return Err(UnitError::NonPhysical {
            what: "hydraulic delay flow must be positive",
        });
    }

    if dq_in == 0.0 {
        let c_dot = (c_in * q_in - c * q) / (q * t_delay);
        Ok(with_flow(c_dot, 0.0))
    } else {
        let q_dot = (q_in - q) / t_delay;
        let c_dot = (c_in - c) * (q_in / q / t_delay);
        Ok(with_flow(c_dot, q_dot))
    }
}

/// Position of the flow entry in a layout of `len` entries.
fn flow_index(len: usize) -> UnitResult<usize> {
    len.checked_sub(1).ok_or(UnitError::ShapeMismatch {
        expected: 1,
        actual: 0,
    })
}

/// Append the flow entry to a concentration vector.
fn with_flow(c: DVector<f64>, q: f64) -> DVector<f64> {
    let n = c.len();
    let mut out = c.resize_vertically(n + 1, 0.0);
    out[n] = q;
    out
}
