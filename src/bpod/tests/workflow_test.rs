//! 2차원 필드, 사용자 내적, 바이너리 저장소로 전체 흐름 확인

use super::*;
use crate::config::DecompositionPaths;
use crate::error::{BpodError, Result};
use crate::io::{BinaryMatrixStore, MatrixFieldStore};
use crate::ops::DotProduct;
use crate::parallel::ThreadComm;
use approx::assert_abs_diff_eq;
use ndarray::{Array2, Zip};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 가중 Frobenius 내적: 첫 행에 두 배 가중치
fn weighted(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let mut sum = 0.0;
    Zip::indexed(a).and(b).for_each(|(i, _), x, y| {
        let w = if i == 0 { 2.0 } else { 1.0 };
        sum += w * x * y;
    });
    sum
}

fn write_matrix_fields(dir: &TempDir, prefix: &str, fields: &[Array2<f64>]) -> Vec<PathBuf> {
    let store = MatrixFieldStore::new(BinaryMatrixStore);
    fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let path = dir.path().join(format!("{}{}.bin", prefix, i));
            FieldStore::<Array2<f64>>::save(&store, f, &path).unwrap();
            path
        })
        .collect()
}

fn weighted_engine(comm: ThreadComm) -> Bpod<Array2<f64>, ThreadComm> {
    Bpod::new(
        comm,
        MatrixFieldStore::new(BinaryMatrixStore),
        weighted as fn(&Array2<f64>, &Array2<f64>) -> f64,
    )
    .with_matrix_store(BinaryMatrixStore)
    .with_config(BpodConfig {
        max_fields_per_node: 6,
        ..Default::default()
    })
}

#[test]
fn test_two_worker_workflow_with_custom_inner_product() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let dist = Uniform::new(-1.0, 1.0);
    let direct: Vec<Array2<f64>> = (0..6)
        .map(|_| Array2::random_using((3, 4), dist, &mut rng))
        .collect();
    let adjoint: Vec<Array2<f64>> = (0..5)
        .map(|_| Array2::random_using((3, 4), dist, &mut rng))
        .collect();
    let direct_paths = write_matrix_fields(&dir, "x", &direct);
    let adjoint_paths = write_matrix_fields(&dir, "y", &adjoint);
    let artifacts = DecompositionPaths {
        hankel: Some(dir.path().join("hankel.bin")),
        sing_vals: Some(dir.path().join("sv.bin")),
        ..DecompositionPaths::none()
    };
    let phi = format!("{}/phi_{{}}.bin", dir.path().display());
    let psi = format!("{}/psi_{{}}.bin", dir.path().display());

    let outcomes = ThreadComm::run(2, |comm| -> Result<Array2<f64>> {
        let mut bpod = weighted_engine(comm).with_snapshots(direct_paths.clone(), adjoint_paths.clone());
        let hankel = bpod
            .compute_decomposition(None, None, &artifacts)?
            .hankel
            .clone()
            .unwrap_or_default();
        bpod.compute_direct_modes(&[1, 2, 3], &phi, 1, None)?;
        bpod.compute_adjoint_modes(&[3, 2, 1], &psi, 1, None)?;
        Ok(hankel)
    });

    for hankel in &outcomes {
        let hankel = hankel.as_ref().unwrap();
        assert_eq!(hankel.dim(), (5, 6));
        assert_abs_diff_eq!(hankel[[2, 4]], weighted(&adjoint[2], &direct[4]), epsilon = 1e-12);
    }
    assert!(dir.path().join("hankel.bin").exists());
    assert!(dir.path().join("sv.bin").exists());

    let store = MatrixFieldStore::new(BinaryMatrixStore);
    let load = |path: String| -> Array2<f64> {
        FieldStore::<Array2<f64>>::load(&store, PathBuf::from(path).as_path()).unwrap()
    };
    for i in 1..=3 {
        for j in 1..=3 {
            let psi_i = load(psi.replace("{}", &i.to_string()));
            let phi_j = load(phi.replace("{}", &j.to_string()));
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(weighted(&psi_i, &phi_j), expected, epsilon = 1e-8);
        }
    }
}

#[test]
fn test_mismatched_field_shapes_surface_as_errors() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let direct = write_matrix_fields(&dir, "x", &[Array2::zeros((2, 2)), Array2::zeros((3, 2))]);
    let adjoint = write_matrix_fields(&dir, "y", &[Array2::zeros((2, 2))]);

    let outcomes = ThreadComm::run(2, |comm| {
        let mut bpod: Bpod<Array2<f64>, _> =
            Bpod::new(comm, MatrixFieldStore::new(BinaryMatrixStore), DotProduct);
        bpod.compute_decomposition(Some(&direct), Some(&adjoint), &DecompositionPaths::none())
            .map(|_| ())
    });
    for outcome in outcomes {
        assert!(matches!(outcome, Err(BpodError::ShapeMismatch { .. })));
    }
}
