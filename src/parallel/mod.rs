//! # 분산 실행 계층
//!
//! 고정된 워커 집합 위에서 랭크 식별, 집합 브로드캐스트, 직렬/병렬 판별을
//! 제공합니다. 모든 브로드캐스트는 블로킹 집합 연산이며 타임아웃이 없습니다.
//!
//! - [`SerialComm`]: 워커 1개
//! - [`ThreadComm`]: 프로세스 내 스레드 워커 클러스터
//! - [`Coordinator`]: "코디네이터가 계산하고 모두에게 브로드캐스트" 역할 객체

pub mod coordinator;
pub mod serial;
pub mod threaded;

pub use self::coordinator::Coordinator;
pub use self::serial::SerialComm;
pub use self::threaded::ThreadComm;

use crate::error::Result;
use std::ops::Range;

/// 전역 계산과 저장을 담당하는 랭크
pub const COORDINATOR_RANK: usize = 0;

/// 분산 런타임 파사드
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    fn is_distributed(&self) -> bool {
        self.size() > 1
    }

    /// `root` 랭크의 값을 모든 워커에 전달합니다.
    ///
    /// 모든 워커가 호출해야 하며, `root`가 아닌 워커의 `value`는 무시됩니다.
    /// 모든 워커가 값을 받을 때까지 블록됩니다.
    fn broadcast<T>(&self, value: Option<T>, root: usize) -> Result<T>
    where
        T: Clone + Send + Sync + 'static;
}

/// `n`개의 작업을 `workers`개로 연속 균등 분할합니다.
/// 앞쪽 워커들이 나머지를 하나씩 더 가져갑니다.
pub fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = n / workers;
    let extra = n % workers;
    let mut start = 0;
    (0..workers)
        .map(|w| {
            let len = base + usize::from(w < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}
