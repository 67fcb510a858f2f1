//! BPOD 오류 타입
//!
//! 모든 공개 연산은 `Result<T>`를 반환합니다. 오류는 코디네이터에서 발생해도
//! 브로드캐스트되어 모든 워커가 같은 오류를 받으므로 `Clone`이어야 합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// BPOD 연산 중 발생할 수 있는 오류
#[derive(Debug, Clone, thiserror::Error)]
pub enum BpodError {
    /// 필수 입력이나 협력 객체가 없음 (스냅샷 경로, 행렬 저장소 등)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 선행 상태가 준비되기 전에 연산을 요청함
    #[error("state error: {0}")]
    State(String),

    /// SVD 수렴 실패
    #[error("decomposition error: {0}")]
    Decomposition(String),

    /// 모드 번호가 범위를 벗어났거나 중복됨
    #[error("invalid mode index {index}: {reason}")]
    InvalidModeIndex { index: usize, reason: String },

    /// 행렬/필드 모양 불일치
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: String,
        expected: String,
        got: String,
    },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("parse error in {} line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// 워커 간 집합 통신 실패
    #[error("communication error: {0}")]
    Communication(String),
}

impl BpodError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        BpodError::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    pub fn shape(context: &str, expected: impl ToString, got: impl ToString) -> Self {
        BpodError::ShapeMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BpodError>;
