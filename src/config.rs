//! 엔진 설정과 분해 결과 저장 경로

use crate::error::{BpodError, Result};
use std::path::{Path, PathBuf};

/// BPOD 엔진 설정
#[derive(Debug, Clone)]
pub struct BpodConfig {
    /// 노드당 동시에 메모리에 올릴 수 있는 최대 필드 수
    pub max_fields_per_node: usize,

    /// 노드 수
    pub num_nodes: usize,

    /// 진행 로그 출력
    pub verbose: bool,

    /// SVD 최대 반복 횟수 (0 이면 수렴할 때까지)
    pub svd_max_iterations: usize,

    /// SVD 수렴 판정 허용 오차
    pub svd_epsilon: f64,
}

impl Default for BpodConfig {
    fn default() -> Self {
        Self {
            max_fields_per_node: 64,
            num_nodes: 1,
            verbose: true,
            svd_max_iterations: 0,
            svd_epsilon: f64::EPSILON,
        }
    }
}

impl BpodConfig {
    /// 워커 하나가 동시에 보유할 수 있는 필드 수.
    ///
    /// 노드 전체 예산을 워커 수로 나누며, 행 청크 하나와 스트리밍 필드 하나를
    /// 위해 최소 2를 보장합니다.
    pub fn fields_per_worker(&self, num_workers: usize) -> Result<usize> {
        if self.max_fields_per_node < 2 {
            return Err(BpodError::Configuration(format!(
                "max_fields_per_node must be at least 2, got {}",
                self.max_fields_per_node
            )));
        }
        if self.num_nodes == 0 {
            return Err(BpodError::Configuration(
                "num_nodes must be positive".to_string(),
            ));
        }
        let total = self.max_fields_per_node * self.num_nodes;
        Ok((total / num_workers.max(1)).max(2))
    }
}

/// 분해 결과(H, L, Σ, R) 각각의 저장 위치. `None`인 항목은 건너뜁니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompositionPaths {
    pub hankel: Option<PathBuf>,
    pub left_vecs: Option<PathBuf>,
    pub sing_vals: Option<PathBuf>,
    pub right_vecs: Option<PathBuf>,
}

impl DecompositionPaths {
    pub const HANKEL_FILE: &'static str = "hankelMat.txt";
    pub const LEFT_VECS_FILE: &'static str = "LSingVecs.txt";
    pub const SING_VALS_FILE: &'static str = "singVals.txt";
    pub const RIGHT_VECS_FILE: &'static str = "RSingVecs.txt";

    /// 아무것도 저장/로드하지 않음
    pub fn none() -> Self {
        Self::default()
    }

    /// 현재 디렉터리 기준 기본 텍스트 파일 이름
    pub fn default_text() -> Self {
        Self::in_dir(Path::new(""))
    }

    /// `dir` 아래의 기본 파일 이름
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            hankel: Some(dir.join(Self::HANKEL_FILE)),
            left_vecs: Some(dir.join(Self::LEFT_VECS_FILE)),
            sing_vals: Some(dir.join(Self::SING_VALS_FILE)),
            right_vecs: Some(dir.join(Self::RIGHT_VECS_FILE)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hankel.is_none()
            && self.left_vecs.is_none()
            && self.sing_vals.is_none()
            && self.right_vecs.is_none()
    }
}
