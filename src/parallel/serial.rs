use super::{Communicator, COORDINATOR_RANK};
use crate::error::{BpodError, Result};

/// 단일 워커 런타임. 브로드캐스트는 입력을 그대로 돌려줍니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        COORDINATOR_RANK
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast<T>(&self, value: Option<T>, root: usize) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        if root != COORDINATOR_RANK {
            return Err(BpodError::Communication(format!(
                "broadcast root {} out of range for a serial runtime",
                root
            )));
        }
        value.ok_or_else(|| BpodError::Communication("serial broadcast without a value".into()))
    }
}
