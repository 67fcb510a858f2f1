//! Balanced POD - direct/adjoint 스냅샷의 균형 고유직교분해
//!
//! 스냅샷과 모드는 파일로 주고받으며, 워커 여러 개가 Hankel 행렬과 모드를
//! 나누어 계산합니다. 분해(SVD)는 코디네이터 한 곳에서만 수행됩니다.

pub mod bpod;
pub mod config;
pub mod error;
pub mod io;
pub mod ops;
pub mod parallel;

#[cfg(feature = "python")]
mod bindings;

pub use bpod::{Bpod, Decomposition, DecompositionState};
pub use config::{BpodConfig, DecompositionPaths};
pub use error::{BpodError, Result};
pub use io::{BinaryMatrixStore, FieldStore, MatrixFieldStore, MatrixStore, TextFieldStore, TextMatrixStore};
pub use ops::{DotProduct, Field, InnerProduct};
pub use parallel::{Communicator, SerialComm, ThreadComm};
