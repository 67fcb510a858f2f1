//! 이진 행렬 형식
//!
//! 레이아웃: 매직 `BPODMAT1` (8바이트), 행 수 `u64`, 열 수 `u64`,
//! 이어서 행 우선 `f64` 값. 모두 리틀 엔디언.

use super::MatrixStore;
use crate::error::{BpodError, Result};
use ndarray::{Array2, ArrayView2};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 8] = b"BPODMAT1";
const HEADER_LEN: usize = 24;

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryMatrixStore;

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

impl MatrixStore for BinaryMatrixStore {
    fn save(&self, matrix: ArrayView2<f64>, path: &Path) -> Result<()> {
        let (rows, cols) = matrix.dim();
        let mut bytes = Vec::with_capacity(HEADER_LEN + rows * cols * 8);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(rows as u64).to_le_bytes());
        bytes.extend_from_slice(&(cols as u64).to_le_bytes());
        // iter()는 논리적 행 우선 순서를 따른다
        for v in matrix.iter() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(path, bytes).map_err(|e| BpodError::io(path, e))
    }

    fn load(&self, path: &Path) -> Result<Array2<f64>> {
        let bytes = fs::read(path).map_err(|e| BpodError::io(path, e))?;
        let parse_err = |message: String| BpodError::Parse {
            path: path.to_path_buf(),
            line: 0,
            message,
        };

        if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
            return Err(parse_err("missing BPODMAT1 header".into()));
        }
        let dim = |offset: usize| {
            let raw = read_u64(&bytes, offset);
            usize::try_from(raw)
                .map_err(|_| parse_err(format!("dimension {} does not fit in memory", raw)))
        };
        let rows = dim(8)?;
        let cols = dim(16)?;
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| parse_err(format!("matrix size {}x{} overflows", rows, cols)))?;
        let body = &bytes[HEADER_LEN..];
        if body.len() != expected {
            return Err(parse_err(format!(
                "expected {} data bytes for {}x{}, found {}",
                expected,
                rows,
                cols,
                body.len()
            )));
        }

        let values: Vec<f64> = body
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                f64::from_le_bytes(buf)
            })
            .collect();
        Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| BpodError::shape("binary matrix", format!("{}x{}", rows, cols), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use tempfile::TempDir;

    #[test]
    fn test_binary_round_trip_transposed_view() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.bin");
        let m = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

        // 전치 뷰도 논리적 순서대로 저장되어야 함
        BinaryMatrixStore.save(m.t(), &path).unwrap();
        assert_eq!(BinaryMatrixStore.load(&path).unwrap(), m.t().to_owned());
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.bin");
        BinaryMatrixStore
            .save(arr2(&[[1.0, 2.0]]).view(), &path)
            .unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.pop();
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            BinaryMatrixStore.load(&path),
            Err(BpodError::Parse { .. })
        ));
    }

    #[test]
    fn test_oversized_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.bin");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            BinaryMatrixStore.load(&path),
            Err(BpodError::Parse { .. })
        ));
    }

    #[test]
    fn test_foreign_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.txt");
        std::fs::write(&path, "1 2 3\n4 5 6\n7 8 9\n").unwrap();
        assert!(BinaryMatrixStore.load(&path).is_err());
    }
}
