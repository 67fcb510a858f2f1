//! BPOD 엔진 테스트 공용 도우미

use crate::bpod::Bpod;
use crate::config::BpodConfig;
use crate::io::{FieldStore, TextFieldStore};
use crate::ops::DotProduct;
use crate::parallel::{Communicator, SerialComm};
use ndarray::Array1;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod workflow_test;

pub struct Snapshots {
    pub dir: TempDir,
    pub direct: Vec<PathBuf>,
    pub adjoint: Vec<PathBuf>,
    pub direct_fields: Vec<Array1<f64>>,
    pub adjoint_fields: Vec<Array1<f64>>,
}

impl Snapshots {
    pub fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// 출력 디렉터리 안의 모드 파일 템플릿
    pub fn mode_template(&self, sub: &str) -> String {
        let dir = self.dir.path().join(sub);
        std::fs::create_dir_all(&dir).unwrap();
        format!("{}/mode_%d.txt", dir.display())
    }
}

fn write_all(dir: &Path, prefix: &str, fields: &[Array1<f64>]) -> Vec<PathBuf> {
    let store = TextFieldStore::default();
    fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let path = dir.join(format!("{}_{:03}.txt", prefix, i));
            store.save(f, &path).unwrap();
            path
        })
        .collect()
}

pub fn write_snapshots(direct: Vec<Array1<f64>>, adjoint: Vec<Array1<f64>>) -> Snapshots {
    let dir = TempDir::new().unwrap();
    let direct_paths = write_all(dir.path(), "direct", &direct);
    let adjoint_paths = write_all(dir.path(), "adjoint", &adjoint);
    Snapshots {
        dir,
        direct: direct_paths,
        adjoint: adjoint_paths,
        direct_fields: direct,
        adjoint_fields: adjoint,
    }
}

pub fn random_snapshots(n_direct: usize, n_adjoint: usize, dim: usize, seed: u64) -> Snapshots {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(-1.0, 1.0);
    let direct = (0..n_direct)
        .map(|_| Array1::random_using(dim, dist, &mut rng))
        .collect();
    let adjoint = (0..n_adjoint)
        .map(|_| Array1::random_using(dim, dist, &mut rng))
        .collect();
    write_snapshots(direct, adjoint)
}

pub fn quiet() -> BpodConfig {
    BpodConfig {
        verbose: false,
        ..Default::default()
    }
}

pub fn engine_on<C: Communicator>(comm: C) -> Bpod<Array1<f64>, C> {
    Bpod::new(comm, TextFieldStore::default(), DotProduct).with_config(quiet())
}

pub fn engine() -> Bpod<Array1<f64>> {
    engine_on(SerialComm)
}

pub fn load_field(path: &Path) -> Array1<f64> {
    FieldStore::<Array1<f64>>::load(&TextFieldStore::default(), path).unwrap()
}

/// `sum_k coeffs[k, col] * fields[k]`
pub fn combine(fields: &[Array1<f64>], coeffs: &ndarray::Array2<f64>, col: usize) -> Array1<f64> {
    let mut out = Array1::zeros(fields[0].len());
    for (k, f) in fields.iter().enumerate() {
        out.scaled_add(coeffs[[k, col]], f);
    }
    out
}
