use crate::error::{BpodError, Result};
use ndarray::{Array, Dimension};

/// A snapshot or mode field: something that can be scaled and summed.
pub trait Field: Clone + Send + Sync {
    /// Zero field with the same shape as `self`.
    fn zeros_like(&self) -> Self;

    /// `self += alpha * other`
    fn add_scaled(&mut self, alpha: f64, other: &Self) -> Result<()>;
}

impl<D: Dimension> Field for Array<f64, D> {
    fn zeros_like(&self) -> Self {
        Array::zeros(self.raw_dim())
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(BpodError::shape(
                "field combination",
                format!("{:?}", self.shape()),
                format!("{:?}", other.shape()),
            ));
        }
        self.scaled_add(alpha, other);
        Ok(())
    }
}

/// Inner product between two loaded fields.
pub trait InnerProduct<F>: Send + Sync {
    fn inner(&self, a: &F, b: &F) -> Result<f64>;
}

impl<F, G> InnerProduct<F> for G
where
    G: Fn(&F, &F) -> f64 + Send + Sync,
{
    fn inner(&self, a: &F, b: &F) -> Result<f64> {
        Ok(self(a, b))
    }
}

/// Euclidean inner product: sum of element-wise products.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProduct;

impl<D: Dimension> InnerProduct<Array<f64, D>> for DotProduct {
    fn inner(&self, a: &Array<f64, D>, b: &Array<f64, D>) -> Result<f64> {
        if a.shape() != b.shape() {
            return Err(BpodError::shape(
                "inner product",
                format!("{:?}", a.shape()),
                format!("{:?}", b.shape()),
            ));
        }
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
    }
}
