use crate::error::{BpodError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use num_traits::Float;

/// 모드 재구성에 쓰이는 특이벡터와 특이값 쌍.
///
/// direct 모드는 (R, Σ), adjoint 모드는 (L, Σ). 분해 상태에서만 얻을 수 있습니다.
#[derive(Debug, Clone, Copy)]
pub struct ModeBasis<'a> {
    vecs: ArrayView2<'a, f64>,
    sing_vals: ArrayView1<'a, f64>,
}

impl<'a> ModeBasis<'a> {
    pub(crate) fn new(vecs: ArrayView2<'a, f64>, sing_vals: ArrayView1<'a, f64>) -> Self {
        Self { vecs, sing_vals }
    }

    pub fn num_modes(&self) -> usize {
        self.sing_vals.len()
    }

    /// 스냅샷 수 (계수 행렬의 행 수)
    pub fn num_snapshots(&self) -> usize {
        self.vecs.nrows()
    }

    /// `V · diag(Σ^-1/2)`. 매번 새로 계산하며 캐시하지 않습니다.
    pub fn coefficients(&self) -> Result<Array2<f64>> {
        balancing_coefficients(self.vecs, self.sing_vals)
    }
}

/// 특이벡터 열 `j`를 `σ_j^(-1/2)`로 스케일합니다.
///
/// `vecs`의 열이 Σ보다 많으면 앞의 `len(Σ)`개 열만 사용합니다.
/// σ가 0이면 해당 열은 무한대가 되므로 호출자가 모드 범위를 잘라야 합니다.
pub fn balancing_coefficients<T: Float>(
    vecs: ArrayView2<T>,
    sing_vals: ArrayView1<T>,
) -> Result<Array2<T>> {
    let k = sing_vals.len();
    if vecs.ncols() < k {
        return Err(BpodError::shape(
            "singular vector columns",
            format!("at least {}", k),
            vecs.ncols(),
        ));
    }
    let scale: Vec<T> = sing_vals.iter().map(|s| s.sqrt().recip()).collect();
    Ok(Array2::from_shape_fn((vecs.nrows(), k), |(i, j)| {
        vecs[[i, j]] * scale[j]
    }))
}
