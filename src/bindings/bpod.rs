use crate::bpod::Bpod;
use crate::config::{BpodConfig, DecompositionPaths};
use crate::io::{TextFieldStore, TextMatrixStore};
use crate::ops::DotProduct;
use crate::parallel::SerialComm;
use ndarray::{Array1, Array2};
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::prelude::*;
use pyo3::{pymethods, PyResult, Python};
use std::path::PathBuf;

type Matrices = (Py<PyArray2<f64>>, Py<PyArray1<f64>>, Py<PyArray2<f64>>);

fn paths(
    hankel: Option<PathBuf>,
    left: Option<PathBuf>,
    sing_vals: Option<PathBuf>,
    right: Option<PathBuf>,
) -> DecompositionPaths {
    DecompositionPaths {
        hankel,
        left_vecs: left,
        sing_vals,
        right_vecs: right,
    }
}

fn matrix(py: Python, m: Option<&Array2<f64>>) -> Option<Py<PyArray2<f64>>> {
    m.map(|m| m.clone().into_pyarray(py).to_owned())
}

/// 텍스트 파일 스냅샷과 유클리드 내적을 쓰는 단일 프로세스 BPOD
#[pyclass(name = "BPOD")]
pub struct PyBpod {
    inner: Bpod<Array1<f64>, SerialComm>,
}

#[pymethods]
impl PyBpod {
    #[new]
    #[pyo3(signature = (max_vecs_per_node = 64, verbose = true, delimiter = ' '))]
    pub fn new(max_vecs_per_node: usize, verbose: bool, delimiter: char) -> Self {
        let format = TextMatrixStore::with_delimiter(delimiter);
        let inner = Bpod::new(SerialComm, TextFieldStore::new(format), DotProduct)
            .with_matrix_store(format)
            .with_config(BpodConfig {
                max_fields_per_node: max_vecs_per_node,
                verbose,
                ..Default::default()
            });
        PyBpod { inner }
    }

    /// Hankel 행렬을 만들고 SVD합니다. `(L, sing_vals, R)`를 반환합니다.
    ///
    /// 분해 행렬은 기본으로 현재 디렉터리의 `hankelMat.txt` 등에 저장되며,
    /// `None`을 넘긴 행렬은 저장하지 않습니다.
    #[pyo3(signature = (
        direct_paths,
        adjoint_paths,
        hankel_path = DecompositionPaths::default_text().hankel,
        l_sing_vecs_path = DecompositionPaths::default_text().left_vecs,
        sing_vals_path = DecompositionPaths::default_text().sing_vals,
        r_sing_vecs_path = DecompositionPaths::default_text().right_vecs
    ))]
    fn compute_decomp(
        &mut self,
        py: Python,
        direct_paths: Vec<PathBuf>,
        adjoint_paths: Vec<PathBuf>,
        hankel_path: Option<PathBuf>,
        l_sing_vecs_path: Option<PathBuf>,
        sing_vals_path: Option<PathBuf>,
        r_sing_vecs_path: Option<PathBuf>,
    ) -> PyResult<Matrices> {
        let save_to = paths(hankel_path, l_sing_vecs_path, sing_vals_path, r_sing_vecs_path);
        let inner = &mut self.inner;
        let (l, s, r) = py.allow_threads(|| {
            inner
                .compute_decomposition(Some(&direct_paths), Some(&adjoint_paths), &save_to)
                .map(|d| (d.left_vecs.clone(), d.sing_vals.clone(), d.right_vecs.clone()))
        })?;
        let (l, s, r) = (l.unwrap_or_default(), s.unwrap_or_default(), r.unwrap_or_default());
        Ok((
            l.into_pyarray(py).to_owned(),
            s.into_pyarray(py).to_owned(),
            r.into_pyarray(py).to_owned(),
        ))
    }

    #[pyo3(signature = (
        hankel_path = None,
        l_sing_vecs_path = None,
        sing_vals_path = None,
        r_sing_vecs_path = None
    ))]
    fn load_decomp(
        &mut self,
        hankel_path: Option<PathBuf>,
        l_sing_vecs_path: Option<PathBuf>,
        sing_vals_path: Option<PathBuf>,
        r_sing_vecs_path: Option<PathBuf>,
    ) -> PyResult<()> {
        let from = paths(hankel_path, l_sing_vecs_path, sing_vals_path, r_sing_vecs_path);
        self.inner.load_decomposition(&from)?;
        Ok(())
    }

    #[pyo3(signature = (
        hankel_path = None,
        l_sing_vecs_path = None,
        sing_vals_path = None,
        r_sing_vecs_path = None
    ))]
    fn save_decomp(
        &self,
        hankel_path: Option<PathBuf>,
        l_sing_vecs_path: Option<PathBuf>,
        sing_vals_path: Option<PathBuf>,
        r_sing_vecs_path: Option<PathBuf>,
    ) -> PyResult<()> {
        let to = paths(hankel_path, l_sing_vecs_path, sing_vals_path, r_sing_vecs_path);
        self.inner.save_decomposition(&to)?;
        Ok(())
    }

    /// `mode_path`는 `%d` 또는 `{}` 자리표시자를 하나 포함해야 합니다.
    #[pyo3(signature = (mode_indices, mode_path, index_from = 1, direct_paths = None))]
    fn compute_direct_modes(
        &self,
        py: Python,
        mode_indices: Vec<usize>,
        mode_path: String,
        index_from: usize,
        direct_paths: Option<Vec<PathBuf>>,
    ) -> PyResult<()> {
        let inner = &self.inner;
        py.allow_threads(|| {
            inner.compute_direct_modes(&mode_indices, &mode_path, index_from, direct_paths.as_deref())
        })?;
        Ok(())
    }

    #[pyo3(signature = (mode_indices, mode_path, index_from = 1, adjoint_paths = None))]
    fn compute_adjoint_modes(
        &self,
        py: Python,
        mode_indices: Vec<usize>,
        mode_path: String,
        index_from: usize,
        adjoint_paths: Option<Vec<PathBuf>>,
    ) -> PyResult<()> {
        let inner = &self.inner;
        py.allow_threads(|| {
            inner.compute_adjoint_modes(&mode_indices, &mode_path, index_from, adjoint_paths.as_deref())
        })?;
        Ok(())
    }

    #[getter]
    fn hankel_mat(&self, py: Python) -> Option<Py<PyArray2<f64>>> {
        matrix(py, self.inner.hankel_mat())
    }

    #[getter(L_sing_vecs)]
    fn left_sing_vecs(&self, py: Python) -> Option<Py<PyArray2<f64>>> {
        matrix(py, self.inner.left_sing_vecs())
    }

    #[getter]
    fn sing_vals(&self, py: Python) -> Option<Py<PyArray1<f64>>> {
        self.inner
            .sing_vals()
            .map(|s| s.clone().into_pyarray(py).to_owned())
    }

    #[getter(R_sing_vecs)]
    fn right_sing_vecs(&self, py: Python) -> Option<Py<PyArray2<f64>>> {
        matrix(py, self.inner.right_sing_vecs())
    }

    fn direct_mode_coeffs(&self, py: Python) -> PyResult<Py<PyArray2<f64>>> {
        Ok(self.inner.direct_mode_coeffs()?.into_pyarray(py).to_owned())
    }

    fn adjoint_mode_coeffs(&self, py: Python) -> PyResult<Py<PyArray2<f64>>> {
        Ok(self.inner.adjoint_mode_coeffs()?.into_pyarray(py).to_owned())
    }
}
