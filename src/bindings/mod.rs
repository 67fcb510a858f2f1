mod bpod;

pub use self::bpod::PyBpod;

use crate::error::BpodError;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyModule;

impl From<BpodError> for PyErr {
    fn from(err: BpodError) -> Self {
        let message = err.to_string();
        match err {
            BpodError::Configuration(_)
            | BpodError::InvalidModeIndex { .. }
            | BpodError::ShapeMismatch { .. } => PyValueError::new_err(message),
            BpodError::Io { .. } | BpodError::Parse { .. } => PyIOError::new_err(message),
            BpodError::State(_) | BpodError::Decomposition(_) | BpodError::Communication(_) => {
                PyRuntimeError::new_err(message)
            }
        }
    }
}

/// Balanced POD - Python 모듈
#[pymodule]
pub fn balanced_pod(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<PyBpod>()?;
    Ok(())
}
