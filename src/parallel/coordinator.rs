use super::{Communicator, COORDINATOR_RANK};
use crate::error::{BpodError, Result};

/// 코디네이터 역할 객체
///
/// 비싼 전역 계산(SVD, 행렬 파일 읽기/쓰기)은 코디네이터 한 곳에서만 수행하고,
/// 결과(성공이든 실패든)를 브로드캐스트하여 모든 워커가 같은 값을 갖게 합니다.
/// 비즈니스 로직에서 랭크 번호를 직접 비교하지 않도록 이 타입을 거칩니다.
#[derive(Debug, Clone)]
pub struct Coordinator<C> {
    comm: C,
}

impl<C: Communicator> Coordinator<C> {
    pub fn new(comm: C) -> Self {
        Self { comm }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn is_coordinator(&self) -> bool {
        self.comm.is_coordinator()
    }

    /// `compute`를 코디네이터에서만 실행하고 그 결과를 모든 워커에 배포합니다.
    ///
    /// 다른 워커는 `compute`를 호출하지 않으며 브로드캐스트가 끝날 때까지 블록됩니다.
    pub fn run<T, F>(&self, compute: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        let outcome = if self.comm.is_coordinator() {
            Some(compute())
        } else {
            None
        };
        if !self.comm.is_distributed() {
            return outcome.unwrap_or_else(|| {
                Err(BpodError::Communication(
                    "serial runtime has no coordinator".into(),
                ))
            });
        }
        self.comm.broadcast(outcome, COORDINATOR_RANK)?
    }

    /// 코디네이터가 가진 값을 배포합니다. 다른 워커의 `value`는 무시됩니다.
    pub fn share<T>(&self, value: Option<T>) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        if !self.comm.is_distributed() {
            return value.ok_or_else(|| {
                BpodError::Communication("coordinator has nothing to share".into())
            });
        }
        let value = if self.comm.is_coordinator() { value } else { None };
        self.comm.broadcast(value, COORDINATOR_RANK)
    }

    /// 워커별 조각을 랭크 순서대로 모아 모든 워커에 돌려줍니다.
    pub fn all_gather<T>(&self, local: T) -> Result<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let rank = self.comm.rank();
        let mut local = Some(local);
        (0..self.comm.size())
            .map(|root| {
                let value = if root == rank { local.take() } else { None };
                self.comm.broadcast(value, root)
            })
            .collect()
    }
}
