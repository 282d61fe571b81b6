//! Pre-allocated work buffers for the optimization drivers.
//!
//! Every buffer has the problem dimension. A driver keeps one workspace
//! between runs and resets it at the start of each run, so nothing computed
//! during one run is visible to the next.

use crate::types::{DVector, Scalar};

/// Work buffers of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace<T: Scalar> {
    /// Previous point.
    pub xp: DVector<T>,
    /// Current gradient.
    pub g: DVector<T>,
    /// Previous gradient.
    pub gp: DVector<T>,
    /// Search direction.
    pub d: DVector<T>,
    /// Line search scratch.
    pub w: DVector<T>,
    /// Pseudo-gradient (OWL-QN).
    pub pg: DVector<T>,
    /// Change in position of the last step.
    pub s: DVector<T>,
    /// Change in gradient of the last step.
    pub y: DVector<T>,
    /// Previous direction (conjugate gradient).
    pub dp: DVector<T>,
    /// Scratch for difference vectors.
    pub tmp: DVector<T>,
}

impl<T: Scalar> Workspace<T> {
    /// Allocates zeroed buffers of dimension `n`.
    pub fn with_size(n: usize) -> Self {
        Self {
            xp: DVector::zeros(n),
            g: DVector::zeros(n),
            gp: DVector::zeros(n),
            d: DVector::zeros(n),
            w: DVector::zeros(n),
            pg: DVector::zeros(n),
            s: DVector::zeros(n),
            y: DVector::zeros(n),
            dp: DVector::zeros(n),
            tmp: DVector::zeros(n),
        }
    }

    /// Dimension of the buffers.
    pub fn dimension(&self) -> usize {
        self.xp.len()
    }

    /// Zeroes every buffer, reallocating when the dimension changed.
    pub fn reset(&mut self, n: usize) {
        if self.dimension() != n {
            *self = Self::with_size(n);
            return;
        }
        for buffer in [
            &mut self.xp,
            &mut self.g,
            &mut self.gp,
            &mut self.d,
            &mut self.w,
            &mut self.pg,
            &mut self.s,
            &mut self.y,
            &mut self.dp,
            &mut self.tmp,
        ] {
            buffer.fill(T::zero());
        }
    }

    /// Memory held by the buffers, in bytes.
    pub fn memory_usage(&self) -> usize {
        10 * self.dimension() * std::mem::size_of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_zeroes_and_resizes() {
        let mut workspace = Workspace::<f64>::with_size(3);
        workspace.d.fill(2.0);
        workspace.pg[1] = -1.0;

        workspace.reset(3);
        assert_eq!(workspace.d, DVector::zeros(3));
        assert_eq!(workspace.pg, DVector::zeros(3));

        workspace.reset(5);
        assert_eq!(workspace.dimension(), 5);
        assert_eq!(workspace.tmp.len(), 5);
        assert_eq!(workspace.memory_usage(), 10 * 5 * 8);
    }
}
