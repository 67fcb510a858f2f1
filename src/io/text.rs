//! 텍스트 행렬 형식
//!
//! 한 줄에 한 행, 값은 구분자로 나눕니다. `#`으로 시작하는 줄과 빈 줄은 무시합니다.
//! 값은 최단 왕복 표현(`{:e}`)으로 기록하므로 저장 후 읽으면 비트 단위로 같습니다.

use super::MatrixStore;
use crate::error::{BpodError, Result};
use ndarray::{Array2, ArrayView2};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct TextMatrixStore {
    pub delimiter: char,
}

impl Default for TextMatrixStore {
    fn default() -> Self {
        Self { delimiter: ' ' }
    }
}

impl TextMatrixStore {
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        if self.delimiter.is_whitespace() {
            line.split_whitespace().collect()
        } else {
            line.split(self.delimiter).map(str::trim).collect()
        }
    }
}

impl MatrixStore for TextMatrixStore {
    fn save(&self, matrix: ArrayView2<f64>, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| BpodError::io(path, e))?;
        let mut out = BufWriter::new(file);
        let sep = self.delimiter.to_string();
        for row in matrix.rows() {
            let line = row
                .iter()
                .map(|v| format!("{:e}", v))
                .collect::<Vec<_>>()
                .join(sep.as_str());
            writeln!(out, "{}", line).map_err(|e| BpodError::io(path, e))?;
        }
        out.flush().map_err(|e| BpodError::io(path, e))
    }

    fn load(&self, path: &Path) -> Result<Array2<f64>> {
        let file = File::open(path).map_err(|e| BpodError::io(path, e))?;
        let reader = BufReader::new(file);

        let mut values = Vec::new();
        let mut cols: Option<usize> = None;
        let mut rows = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| BpodError::io(path, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields = self.split(trimmed);
            match cols {
                None => cols = Some(fields.len()),
                Some(n) if n != fields.len() => {
                    return Err(BpodError::Parse {
                        path: path.to_path_buf(),
                        line: i + 1,
                        message: format!("expected {} values, found {}", n, fields.len()),
                    });
                }
                Some(_) => {}
            }
            for field in fields {
                let v: f64 = field.parse().map_err(|_| BpodError::Parse {
                    path: path.to_path_buf(),
                    line: i + 1,
                    message: format!("invalid number '{}'", field),
                })?;
                values.push(v);
            }
            rows += 1;
        }

        let cols = cols.unwrap_or(0);
        Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| BpodError::shape("text matrix", format!("{}x{}", rows, cols), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_text_round_trip_is_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.txt");
        let m = arr2(&[[0.1, -2.5e-17, 3.0], [1.0 / 3.0, 1e300, -0.0]]);

        let store = TextMatrixStore::default();
        store.save(m.view(), &path).unwrap();
        assert_eq!(store.load(&path).unwrap(), m);
    }

    #[test]
    fn test_custom_delimiter_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.csv");
        fs::write(&path, "# header\n1, 2\n\n3 ,4\n").unwrap();

        let store = TextMatrixStore::with_delimiter(',');
        assert_eq!(store.load(&path).unwrap(), arr2(&[[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "1 2\n3\n").unwrap();

        let err = TextMatrixStore::default().load(&path).unwrap_err();
        assert!(matches!(err, BpodError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = TextMatrixStore::default()
            .load(&dir.path().join("nope.txt"))
            .unwrap_err();
        assert!(matches!(err, BpodError::Io { .. }));
    }
}
