//! # 필드/행렬 입출력
//!
//! 엔진은 특정 파일 형식을 알지 못합니다. 스냅샷과 모드는 [`FieldStore`]로,
//! 분해 결과 행렬은 [`MatrixStore`]로 주입받습니다.

pub mod binary;
pub mod text;

pub use self::binary::BinaryMatrixStore;
pub use self::text::TextMatrixStore;

use crate::error::{BpodError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::path::Path;

/// 경로로부터 필드 하나를 읽고 쓰는 능력
pub trait FieldStore<F>: Send + Sync {
    fn load(&self, path: &Path) -> Result<F>;

    fn save(&self, field: &F, path: &Path) -> Result<()>;
}

/// 2차원 실수 행렬을 영속 형식으로 읽고 쓰는 능력
pub trait MatrixStore: Send + Sync {
    fn save(&self, matrix: ArrayView2<f64>, path: &Path) -> Result<()>;

    fn load(&self, path: &Path) -> Result<Array2<f64>>;
}

/// 1차원 수열을 한 열짜리 행렬로 저장
pub fn save_vector(store: &dyn MatrixStore, values: ArrayView1<f64>, path: &Path) -> Result<()> {
    let column = values.insert_axis(ndarray::Axis(1));
    store.save(column, path)
}

/// 행렬을 읽어 1차원 수열로 평탄화합니다. `(n, 1)`과 `(1, n)` 모두 허용.
pub fn load_vector(store: &dyn MatrixStore, path: &Path) -> Result<Array1<f64>> {
    let matrix = store.load(path)?;
    flatten_vector(matrix, &path.display().to_string())
}

pub(crate) fn flatten_vector(matrix: Array2<f64>, context: &str) -> Result<Array1<f64>> {
    let (rows, cols) = matrix.dim();
    if rows > 1 && cols > 1 {
        return Err(BpodError::shape(
            context,
            "a single row or column",
            format!("{}x{}", rows, cols),
        ));
    }
    Ok(matrix.iter().copied().collect())
}

/// 행렬 형식 위에 얹은 필드 저장소.
///
/// `Array1<f64>` 필드는 한 열짜리 행렬로, `Array2<f64>` 필드는 그대로 저장합니다.
#[derive(Debug, Clone, Default)]
pub struct MatrixFieldStore<M> {
    format: M,
}

/// 텍스트 파일 기반 기본 필드 저장소
pub type TextFieldStore = MatrixFieldStore<TextMatrixStore>;

impl<M: MatrixStore> MatrixFieldStore<M> {
    pub fn new(format: M) -> Self {
        Self { format }
    }
}

impl<M: MatrixStore> FieldStore<Array1<f64>> for MatrixFieldStore<M> {
    fn load(&self, path: &Path) -> Result<Array1<f64>> {
        load_vector(&self.format, path)
    }

    fn save(&self, field: &Array1<f64>, path: &Path) -> Result<()> {
        save_vector(&self.format, field.view(), path)
    }
}

impl<M: MatrixStore> FieldStore<Array2<f64>> for MatrixFieldStore<M> {
    fn load(&self, path: &Path) -> Result<Array2<f64>> {
        self.format.load(path)
    }

    fn save(&self, field: &Array2<f64>, path: &Path) -> Result<()> {
        self.format.save(field.view(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};
    use tempfile::TempDir;

    #[test]
    fn test_vector_saved_as_column_and_flattened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vals.txt");
        let store = TextMatrixStore::default();
        let values = arr1(&[3.0, 2.0, 0.5]);

        save_vector(&store, values.view(), &path).unwrap();
        assert_eq!(store.load(&path).unwrap().dim(), (3, 1));

        let loaded = load_vector(&store, &path).unwrap();
        assert_abs_diff_eq!(loaded, values);
    }

    #[test]
    fn test_row_matrix_flattens_too() {
        let flat = flatten_vector(arr2(&[[1.0, 2.0, 3.0]]), "row").unwrap();
        assert_eq!(flat, arr1(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_full_matrix_is_not_a_vector() {
        let err = flatten_vector(arr2(&[[1.0, 2.0], [3.0, 4.0]]), "square").unwrap_err();
        assert!(matches!(err, BpodError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_field_store_handles_both_ranks() {
        let dir = TempDir::new().unwrap();
        let store = TextFieldStore::default();

        let v = arr1(&[1.5, -2.0]);
        let v_path = dir.path().join("v.txt");
        FieldStore::<Array1<f64>>::save(&store, &v, &v_path).unwrap();
        let v_back = FieldStore::<Array1<f64>>::load(&store, &v_path).unwrap();
        assert_eq!(v_back, v);

        let m = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let m_path = dir.path().join("m.txt");
        FieldStore::<Array2<f64>>::save(&store, &m, &m_path).unwrap();
        let m_back = FieldStore::<Array2<f64>>::load(&store, &m_path).unwrap();
        assert_eq!(m_back, m);
    }
}
