//! # Balanced POD 엔진
//!
//! direct/adjoint 스냅샷으로 Hankel 행렬을 만들고 SVD한 뒤,
//! 특이벡터를 스냅샷의 선형결합 계수로 바꾸어 direct/adjoint 모드를 저장합니다.
//!
//! ```text
//! H = Yᵗ X = L · diag(Σ) · Rᵗ
//! direct 모드 계수  = R · diag(Σ^-1/2)
//! adjoint 모드 계수 = L · diag(Σ^-1/2)
//! ```
//!
//! 모든 공개 연산은 집합 통신을 시작하기 전에 입력을 검증합니다. 검증은 모든
//! 워커에서 같은 값으로 이루어지므로 워커 간 제어 흐름이 갈라지지 않습니다.

pub mod decomposition;
pub mod modes;

#[cfg(test)]
mod tests;

pub use self::decomposition::{hankel_svd, Decomposition, DecompositionState};
pub use self::modes::{balancing_coefficients, ModeBasis};

use crate::config::{BpodConfig, DecompositionPaths};
use crate::error::{BpodError, Result};
use crate::io::{self, FieldStore, MatrixStore, TextMatrixStore};
use crate::ops::{inner_product_matrix, linear_combinations, Field, InnerProduct, ModeTemplate};
use crate::parallel::{Communicator, Coordinator, SerialComm};
use ndarray::{Array1, Array2};
use std::path::PathBuf;
use tracing::{debug, info};

/// Balanced POD 엔진
///
/// 스냅샷/모드 필드는 `field_store`로, 분해 행렬은 `matrix_store`로 읽고 씁니다.
/// 분해 결과는 코디네이터가 계산한 뒤 모든 워커에 복사됩니다.
pub struct Bpod<F, C = SerialComm> {
    coord: Coordinator<C>,
    field_store: Box<dyn FieldStore<F>>,
    matrix_store: Option<Box<dyn MatrixStore>>,
    inner_product: Box<dyn InnerProduct<F>>,
    config: BpodConfig,
    direct_paths: Option<Vec<PathBuf>>,
    adjoint_paths: Option<Vec<PathBuf>>,
    state: DecompositionState,
}

impl<F, C> Bpod<F, C>
where
    F: Field + 'static,
    C: Communicator,
{
    /// 새 엔진. 행렬 저장소는 기본으로 공백 구분 텍스트 형식입니다.
    pub fn new<S, I>(comm: C, field_store: S, inner_product: I) -> Self
    where
        S: FieldStore<F> + 'static,
        I: InnerProduct<F> + 'static,
    {
        Self {
            coord: Coordinator::new(comm),
            field_store: Box::new(field_store),
            matrix_store: Some(Box::new(TextMatrixStore::default())),
            inner_product: Box::new(inner_product),
            config: BpodConfig::default(),
            direct_paths: None,
            adjoint_paths: None,
            state: DecompositionState::Unset,
        }
    }

    pub fn with_config(mut self, config: BpodConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_matrix_store<M: MatrixStore + 'static>(mut self, store: M) -> Self {
        self.matrix_store = Some(Box::new(store));
        self
    }

    /// 행렬 저장소 없이 사용 (분해 결과를 저장/로드할 수 없음)
    pub fn without_matrix_store(mut self) -> Self {
        self.matrix_store = None;
        self
    }

    pub fn with_snapshots(mut self, direct: Vec<PathBuf>, adjoint: Vec<PathBuf>) -> Self {
        self.direct_paths = Some(direct);
        self.adjoint_paths = Some(adjoint);
        self
    }

    pub fn comm(&self) -> &C {
        self.coord.comm()
    }

    pub fn state(&self) -> &DecompositionState {
        &self.state
    }

    pub fn decomposition(&self) -> Option<&Decomposition> {
        self.state.decomposition()
    }

    pub fn hankel_mat(&self) -> Option<&Array2<f64>> {
        self.decomposition()?.hankel.as_ref()
    }

    pub fn left_sing_vecs(&self) -> Option<&Array2<f64>> {
        self.decomposition()?.left_vecs.as_ref()
    }

    pub fn sing_vals(&self) -> Option<&Array1<f64>> {
        self.decomposition()?.sing_vals.as_ref()
    }

    pub fn right_sing_vecs(&self) -> Option<&Array2<f64>> {
        self.decomposition()?.right_vecs.as_ref()
    }

    /// direct 모드 계수 `R · diag(Σ^-1/2)`
    pub fn direct_mode_coeffs(&self) -> Result<Array2<f64>> {
        self.state.direct_basis()?.coefficients()
    }

    /// adjoint 모드 계수 `L · diag(Σ^-1/2)`
    pub fn adjoint_mode_coeffs(&self) -> Result<Array2<f64>> {
        self.state.adjoint_basis()?.coefficients()
    }

    fn progress(&self) -> bool {
        self.config.verbose && self.coord.is_coordinator()
    }

    fn matrix_store(&self, action: &str) -> Result<&dyn MatrixStore> {
        self.matrix_store.as_deref().ok_or_else(|| {
            BpodError::Configuration(format!("no matrix store configured, cannot {}", action))
        })
    }

    /// Hankel 행렬을 만들고 SVD합니다.
    ///
    /// `direct`/`adjoint`가 주어지면 저장된 스냅샷 목록을 대체합니다. `save_to`에
    /// 경로가 있는 행렬은 코디네이터가 브로드캐스트 전에 저장합니다.
    pub fn compute_decomposition(
        &mut self,
        direct: Option<&[PathBuf]>,
        adjoint: Option<&[PathBuf]>,
        save_to: &DecompositionPaths,
    ) -> Result<&Decomposition> {
        if let Some(paths) = direct {
            self.direct_paths = Some(paths.to_vec());
        }
        if let Some(paths) = adjoint {
            self.adjoint_paths = Some(paths.to_vec());
        }
        let direct = snapshot_list(&self.direct_paths, "direct")?;
        let adjoint = snapshot_list(&self.adjoint_paths, "adjoint")?;
        let store = if save_to.is_empty() {
            None
        } else {
            Some(self.matrix_store("save the decomposition")?)
        };
        let budget = self.config.fields_per_worker(self.coord.comm().size())?;

        // 행: adjoint, 열: direct
        let hankel = inner_product_matrix(
            &self.coord,
            self.field_store.as_ref(),
            self.inner_product.as_ref(),
            adjoint,
            direct,
            budget,
        )?;
        if self.progress() {
            info!(
                rows = hankel.nrows(),
                cols = hankel.ncols(),
                "Hankel matrix computed"
            );
        }

        // SVD와 저장은 코디네이터만, 브로드캐스트보다 먼저
        let (epsilon, max_iterations) = (self.config.svd_epsilon, self.config.svd_max_iterations);
        let local = self.coord.is_coordinator().then(|| {
            let decomposition = Decomposition::from_hankel(hankel.clone(), epsilon, max_iterations)?;
            if let Some(store) = store {
                write_artifacts(store, &decomposition, save_to)?;
            }
            Ok::<_, BpodError>(decomposition)
        });
        let status = local
            .as_ref()
            .map(|r| r.as_ref().map(|_| ()).map_err(Clone::clone));
        self.coord.share(status)??;

        let (left, sing, right) = match local {
            Some(Ok(d)) => (d.left_vecs, d.sing_vals, d.right_vecs),
            _ => (None, None, None),
        };
        let left_vecs = self.coord.share(left)?;
        let sing_vals = self.coord.share(sing)?;
        let right_vecs = self.coord.share(right)?;
        if self.progress() {
            info!(
                modes = sing_vals.len(),
                largest = sing_vals.get(0).copied().unwrap_or(0.0),
                "Hankel SVD computed"
            );
        }

        self.state = DecompositionState::Decomposed(Decomposition {
            hankel: Some(hankel),
            left_vecs: Some(left_vecs),
            sing_vals: Some(sing_vals),
            right_vecs: Some(right_vecs),
        });
        self.decomposition()
            .ok_or_else(|| BpodError::State("decomposition was not stored".into()))
    }

    /// 저장된 분해 행렬을 읽습니다. 경로가 없는 행렬은 읽지 않고 비워 둡니다.
    pub fn load_decomposition(&mut self, paths: &DecompositionPaths) -> Result<&Decomposition> {
        let store = self.matrix_store("load the decomposition")?;
        if paths.is_empty() {
            return Err(BpodError::Configuration(
                "no decomposition paths given to load".into(),
            ));
        }

        let loaded = self.coord.run(|| read_artifacts(store, paths))?;
        if self.progress() {
            info!(
                hankel = loaded.hankel.is_some(),
                left = loaded.left_vecs.is_some(),
                sing_vals = loaded.sing_vals.is_some(),
                right = loaded.right_vecs.is_some(),
                "decomposition loaded"
            );
        }

        self.state = DecompositionState::Decomposed(loaded);
        self.decomposition()
            .ok_or_else(|| BpodError::State("decomposition was not stored".into()))
    }

    /// 분해 행렬을 저장합니다. 경로가 주어진 행렬만 각각 독립적으로 씁니다.
    pub fn save_decomposition(&self, paths: &DecompositionPaths) -> Result<()> {
        let store = self.matrix_store("save the decomposition")?;
        let decomposition = self.state.decomposition().ok_or_else(|| {
            BpodError::State("must compute or load decomposition before saving".into())
        })?;
        check_available(decomposition, paths)?;

        self.coord
            .run(|| write_artifacts(store, decomposition, paths))?;
        if self.progress() {
            info!("decomposition saved");
        }
        Ok(())
    }

    /// direct 모드를 계산해 `mode_path`에 번호별로 저장합니다.
    ///
    /// `mode_indices`는 `index_origin` 기준 번호이며 정렬할 필요가 없습니다
    /// (origin 1이면 1번이 가장 큰 특이값의 모드). 중복 번호는 거부합니다.
    pub fn compute_direct_modes(
        &self,
        mode_indices: &[usize],
        mode_path: &str,
        index_origin: usize,
        direct_paths: Option<&[PathBuf]>,
    ) -> Result<()> {
        let basis = self.state.direct_basis()?;
        let snapshots = match direct_paths {
            Some(paths) => paths,
            None => snapshot_list(&self.direct_paths, "direct")?,
        };
        self.compute_modes("direct", basis, mode_indices, mode_path, index_origin, snapshots)
    }

    /// adjoint 모드를 계산해 `mode_path`에 번호별로 저장합니다.
    pub fn compute_adjoint_modes(
        &self,
        mode_indices: &[usize],
        mode_path: &str,
        index_origin: usize,
        adjoint_paths: Option<&[PathBuf]>,
    ) -> Result<()> {
        let basis = self.state.adjoint_basis()?;
        let snapshots = match adjoint_paths {
            Some(paths) => paths,
            None => snapshot_list(&self.adjoint_paths, "adjoint")?,
        };
        self.compute_modes("adjoint", basis, mode_indices, mode_path, index_origin, snapshots)
    }

    fn compute_modes(
        &self,
        kind: &str,
        basis: ModeBasis<'_>,
        mode_indices: &[usize],
        mode_path: &str,
        index_origin: usize,
        snapshots: &[PathBuf],
    ) -> Result<()> {
        let template = ModeTemplate::parse(mode_path)?;
        if snapshots.is_empty() {
            return Err(BpodError::Configuration(format!(
                "{} snapshot paths are empty",
                kind
            )));
        }
        if snapshots.len() != basis.num_snapshots() {
            return Err(BpodError::shape(
                &format!("{} snapshots vs. singular vector rows", kind),
                basis.num_snapshots(),
                snapshots.len(),
            ));
        }
        let budget = self.config.fields_per_worker(self.coord.comm().size())?;
        let coeffs = basis.coefficients()?;
        debug!(kind, modes = basis.num_modes(), "mode coefficients built");

        linear_combinations(
            &self.coord,
            self.field_store.as_ref(),
            mode_indices,
            &template,
            snapshots,
            coeffs.view(),
            index_origin,
            budget,
        )?;
        if self.progress() {
            info!(kind, count = mode_indices.len(), template = %template, "modes saved");
        }
        Ok(())
    }
}

fn snapshot_list<'a>(paths: &'a Option<Vec<PathBuf>>, kind: &str) -> Result<&'a [PathBuf]> {
    match paths.as_deref() {
        Some(list) if !list.is_empty() => Ok(list),
        Some(_) => Err(BpodError::Configuration(format!(
            "{} snapshot paths are empty",
            kind
        ))),
        None => Err(BpodError::Configuration(format!(
            "{} snapshot paths are not given",
            kind
        ))),
    }
}

/// 요청된 저장 경로마다 해당 행렬이 있는지 확인
fn check_available(decomposition: &Decomposition, paths: &DecompositionPaths) -> Result<()> {
    let missing = [
        ("Hankel matrix", paths.hankel.is_some() && decomposition.hankel.is_none()),
        ("left singular vectors", paths.left_vecs.is_some() && decomposition.left_vecs.is_none()),
        ("singular values", paths.sing_vals.is_some() && decomposition.sing_vals.is_none()),
        ("right singular vectors", paths.right_vecs.is_some() && decomposition.right_vecs.is_none()),
    ];
    match missing.iter().find(|(_, m)| *m) {
        Some((name, _)) => Err(BpodError::State(format!("{} is not available to save", name))),
        None => Ok(()),
    }
}

fn write_artifacts(
    store: &dyn MatrixStore,
    decomposition: &Decomposition,
    paths: &DecompositionPaths,
) -> Result<()> {
    if let (Some(path), Some(h)) = (&paths.hankel, &decomposition.hankel) {
        store.save(h.view(), path)?;
    }
    if let (Some(path), Some(l)) = (&paths.left_vecs, &decomposition.left_vecs) {
        store.save(l.view(), path)?;
    }
    if let (Some(path), Some(r)) = (&paths.right_vecs, &decomposition.right_vecs) {
        store.save(r.view(), path)?;
    }
    if let (Some(path), Some(s)) = (&paths.sing_vals, &decomposition.sing_vals) {
        io::save_vector(store, s.view(), path)?;
    }
    Ok(())
}

fn read_artifacts(store: &dyn MatrixStore, paths: &DecompositionPaths) -> Result<Decomposition> {
    Ok(Decomposition {
        hankel: paths.hankel.as_deref().map(|p| store.load(p)).transpose()?,
        left_vecs: paths.left_vecs.as_deref().map(|p| store.load(p)).transpose()?,
        sing_vals: paths
            .sing_vals
            .as_deref()
            .map(|p| io::load_vector(store, p))
            .transpose()?,
        right_vecs: paths.right_vecs.as_deref().map(|p| store.load(p)).transpose()?,
    })
}
