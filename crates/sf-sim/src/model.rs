//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Vector arithmetic for integration: add states, scale by scalar
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Return the state at t = 0.
    ///
    /// Fails when the model has not been prepared (e.g. a network whose unit
    /// states were never initialized).
    fn initial_state(&self) -> SimResult<Self::State>;

    /// Compute the state derivative dxdt = f(t, x).
    ///
    /// Takes `&mut self` because evaluation writes intermediate values
    /// (stream buffers) into the model.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}
