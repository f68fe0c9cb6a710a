use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

use crate::config::KeyStrategy;
use crate::error::AppError;

/// 上游密钥选择策略
///
/// 返回本次生图调用依次尝试的密钥序号。
pub trait KeySelector: Send + Sync {
    fn attempt_order(&self, pool_len: usize) -> Result<Vec<usize>, AppError>;

    fn strategy(&self) -> KeyStrategy;
}

/// 轮询：每次调用只给出一个密钥，游标进程内共享
#[derive(Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySelector for RoundRobin {
    fn attempt_order(&self, pool_len: usize) -> Result<Vec<usize>, AppError> {
        if pool_len == 0 {
            return Err(AppError::NoKeysAvailable);
        }
        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(vec![cursor % pool_len])
    }

    fn strategy(&self) -> KeyStrategy {
        KeyStrategy::RoundRobin
    }
}

/// 随机打乱全部密钥，逐个尝试直到成功
#[derive(Default)]
pub struct Shuffle;

impl KeySelector for Shuffle {
    fn attempt_order(&self, pool_len: usize) -> Result<Vec<usize>, AppError> {
        if pool_len == 0 {
            return Err(AppError::NoKeysAvailable);
        }
        let mut order: Vec<usize> = (0..pool_len).collect();
        order.shuffle(&mut rand::thread_rng());
        Ok(order)
    }

    fn strategy(&self) -> KeyStrategy {
        KeyStrategy::Shuffle
    }
}

pub fn selector_for(strategy: KeyStrategy) -> Arc<dyn KeySelector> {
    match strategy {
        KeyStrategy::RoundRobin => Arc::new(RoundRobin::new()),
        KeyStrategy::Shuffle => Arc::new(Shuffle),
    }
}
