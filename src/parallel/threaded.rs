//! 프로세스 내 스레드 클러스터
//!
//! 각 워커가 스레드 하나를 차지하고, 브로드캐스트는 `Barrier` 세 번과
//! 공유 슬롯으로 구현합니다.

use super::Communicator;
use crate::error::{BpodError, Result};
use std::any::Any;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

type Payload = Arc<dyn Any + Send + Sync>;

struct Shared {
    size: usize,
    barrier: Barrier,
    slot: Mutex<Option<Payload>>,
}

/// 스레드 워커 하나의 통신 핸들
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl ThreadComm {
    /// `size`개 워커의 핸들을 랭크 순서대로 생성합니다.
    pub fn cluster(size: usize) -> Vec<ThreadComm> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            slot: Mutex::new(None),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// 워커마다 스레드를 띄워 `worker`를 실행하고 랭크 순서로 결과를 모읍니다.
    pub fn run<R, F>(size: usize, worker: F) -> Vec<R>
    where
        R: Send,
        F: Fn(ThreadComm) -> R + Sync,
    {
        let worker = &worker;
        thread::scope(|scope| {
            let handles: Vec<_> = Self::cluster(size)
                .into_iter()
                .map(|comm| scope.spawn(move || worker(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    fn store(&self, payload: Option<Payload>) -> Result<()> {
        let mut slot = self
            .shared
            .slot
            .lock()
            .map_err(|_| BpodError::Communication("broadcast slot poisoned".into()))?;
        *slot = payload;
        Ok(())
    }

    fn fetch(&self) -> Result<Option<Payload>> {
        let slot = self
            .shared
            .slot
            .lock()
            .map_err(|_| BpodError::Communication("broadcast slot poisoned".into()))?;
        Ok(slot.clone())
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn broadcast<T>(&self, value: Option<T>, root: usize) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        // 모든 랭크가 같은 인자로 검사하므로 제어 흐름이 갈라지지 않음
        if root >= self.shared.size {
            return Err(BpodError::Communication(format!(
                "broadcast root {} out of range for {} workers",
                root, self.shared.size
            )));
        }

        // 이전 브로드캐스트의 읽기가 모두 끝난 뒤에 쓴다
        self.shared.barrier.wait();
        let stored = if self.rank == root {
            self.store(value.map(|v| Arc::new(v) as Payload))
        } else {
            Ok(())
        };
        self.shared.barrier.wait();
        let received = self.fetch();
        self.shared.barrier.wait();
        if self.rank == root {
            // 실패해도 다음 브로드캐스트에서 덮어쓴다
            let _ = self.store(None);
        }
        stored?;

        match received? {
            Some(payload) => payload.downcast_ref::<T>().cloned().ok_or_else(|| {
                BpodError::Communication(format!(
                    "rank {} received a payload of a different type from rank {}",
                    self.rank, root
                ))
            }),
            None => Err(BpodError::Communication(format!(
                "rank {} broadcast without a value",
                root
            ))),
        }
    }
}
