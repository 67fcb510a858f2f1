//! 분해 결과와 엔진 상태
//!
//! `H = L · diag(Σ) · Rᵗ`. 로드 경로가 일부만 주어질 수 있으므로 각 행렬은
//! `Option`이고, 모드 재구성은 [`ModeBasis`]를 통해서만 접근합니다.

use super::modes::ModeBasis;
use crate::error::{BpodError, Result};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use std::cmp::Ordering;

/// 한 번의 분해(또는 로드)로 만들어진 행렬들
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decomposition {
    /// Hankel 행렬, (adjoint 스냅샷 수 × direct 스냅샷 수)
    pub hankel: Option<Array2<f64>>,
    /// 왼쪽 특이벡터 L, adjoint 스냅샷당 한 행
    pub left_vecs: Option<Array2<f64>>,
    /// 내림차순 특이값 Σ
    pub sing_vals: Option<Array1<f64>>,
    /// 오른쪽 특이벡터 R, direct 스냅샷당 한 행
    pub right_vecs: Option<Array2<f64>>,
}

impl Decomposition {
    /// Hankel 행렬을 SVD하여 완전한 분해를 만듭니다.
    pub fn from_hankel(hankel: Array2<f64>, epsilon: f64, max_iterations: usize) -> Result<Self> {
        let (left, sing_vals, right) = hankel_svd(&hankel, epsilon, max_iterations)?;
        Ok(Self {
            hankel: Some(hankel),
            left_vecs: Some(left),
            sing_vals: Some(sing_vals),
            right_vecs: Some(right),
        })
    }

    /// `L · diag(Σ) · Rᵗ`, 세 행렬이 모두 있을 때만
    pub fn reconstruct(&self) -> Option<Array2<f64>> {
        let (l, s, r) = (
            self.left_vecs.as_ref()?,
            self.sing_vals.as_ref()?,
            self.right_vecs.as_ref()?,
        );
        let k = s.len().min(l.ncols()).min(r.ncols());
        let scaled = Array2::from_shape_fn((l.nrows(), k), |(i, j)| l[[i, j]] * s[j]);
        let r_k = r.slice(ndarray::s![.., ..k]);
        Some(scaled.dot(&r_k.t()))
    }

    pub(crate) fn direct_basis(&self) -> Option<ModeBasis<'_>> {
        Some(ModeBasis::new(
            self.right_vecs.as_ref()?.view(),
            self.sing_vals.as_ref()?.view(),
        ))
    }

    pub(crate) fn adjoint_basis(&self) -> Option<ModeBasis<'_>> {
        Some(ModeBasis::new(
            self.left_vecs.as_ref()?.view(),
            self.sing_vals.as_ref()?.view(),
        ))
    }
}

/// 엔진 상태
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DecompositionState {
    /// 아직 계산하거나 로드하지 않음
    #[default]
    Unset,
    /// 계산 또는 로드 완료
    Decomposed(Decomposition),
}

impl DecompositionState {
    pub fn decomposition(&self) -> Option<&Decomposition> {
        match self {
            DecompositionState::Unset => None,
            DecompositionState::Decomposed(d) => Some(d),
        }
    }

    pub fn is_decomposed(&self) -> bool {
        matches!(self, DecompositionState::Decomposed(_))
    }

    /// direct 모드 재구성에 필요한 (R, Σ)
    pub fn direct_basis(&self) -> Result<ModeBasis<'_>> {
        self.decomposition()
            .and_then(Decomposition::direct_basis)
            .ok_or_else(|| {
                BpodError::State(
                    "must compute or load decomposition first (right singular vectors and singular values)"
                        .into(),
                )
            })
    }

    /// adjoint 모드 재구성에 필요한 (L, Σ)
    pub fn adjoint_basis(&self) -> Result<ModeBasis<'_>> {
        self.decomposition()
            .and_then(Decomposition::adjoint_basis)
            .ok_or_else(|| {
                BpodError::State(
                    "must compute or load decomposition first (left singular vectors and singular values)"
                        .into(),
                )
            })
    }
}

/// 얇은 SVD: `H (n×m) = L (n×k) · diag(Σ) · Rᵗ`, `R`은 (m×k), `k = min(n, m)`.
///
/// Σ는 내림차순으로 정렬되어 반환됩니다. 수렴하지 않으면 재시도 없이
/// `BpodError::Decomposition`을 돌려줍니다.
pub fn hankel_svd(
    hankel: &Array2<f64>,
    epsilon: f64,
    max_iterations: usize,
) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    let (rows, cols) = hankel.dim();
    if rows == 0 || cols == 0 {
        return Err(BpodError::Decomposition(format!(
            "cannot factor an empty {}x{} matrix",
            rows, cols
        )));
    }
    if hankel.iter().any(|v| !v.is_finite()) {
        return Err(BpodError::Decomposition(
            "Hankel matrix contains non-finite entries".into(),
        ));
    }

    let matrix = DMatrix::from_fn(rows, cols, |i, j| hankel[[i, j]]);
    let svd = matrix
        .try_svd(true, true, epsilon, max_iterations)
        .ok_or_else(|| {
            BpodError::Decomposition(format!(
                "SVD of the {}x{} Hankel matrix did not converge",
                rows, cols
            ))
        })?;
    let u = svd
        .u
        .ok_or_else(|| BpodError::Decomposition("SVD returned no left vectors".into()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| BpodError::Decomposition("SVD returned no right vectors".into()))?;
    let values = svd.singular_values;

    // 모드 번호는 특이값 크기 순서를 따른다
    let k = values.len();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));

    let sing_vals: Array1<f64> = order.iter().map(|&i| values[i]).collect();
    let left = Array2::from_shape_fn((rows, k), |(i, j)| u[(i, order[j])]);
    let right = Array2::from_shape_fn((cols, k), |(i, j)| v_t[(order[j], i)]);
    Ok((left, sing_vals, right))
}
