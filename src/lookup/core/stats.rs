//! 调度统计
//!
//! 所有计数器均为原子类型，任意任务都可以在不加锁的情况下更新。

use std::sync::atomic::{AtomicUsize, Ordering};

/// 查询调度器的运行时统计
///
/// 字段说明：
/// - `sessions_started`: 发起的会话数，包括立即清空的空查询
/// - `sessions_superseded`: 被新查询取代的会话数
/// - `sessions_completed`: 所有提供者都已落定的会话数
/// - `provider_calls`: 实际发出的提供者调用次数（含重试）
/// - `provider_successes` / `provider_failures`: 调用结果
/// - `provider_timeouts`: 超时的调用，单独计数，不计入失败
/// - `rate_limit_retries`: 因频率限制触发的重试
/// - `stale_results_dropped`: 会话失效后丢弃的迟到结果
/// - `audio_played`: 触发的发音播放次数
#[derive(Debug, Default)]
pub struct OrchestratorStats {
    pub sessions_started: AtomicUsize,
    pub sessions_superseded: AtomicUsize,
    pub sessions_completed: AtomicUsize,
    pub provider_calls: AtomicUsize,
    pub provider_successes: AtomicUsize,
    pub provider_failures: AtomicUsize,
    pub provider_timeouts: AtomicUsize,
    pub rate_limit_retries: AtomicUsize,
    pub stale_results_dropped: AtomicUsize,
    pub audio_played: AtomicUsize,
}

impl OrchestratorStats {
    pub fn inc_sessions_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sessions_superseded(&self) {
        self.sessions_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sessions_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provider_calls(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provider_successes(&self) {
        self.provider_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provider_failures(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provider_timeouts(&self) {
        self.provider_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rate_limit_retries(&self) {
        self.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale_results_dropped(&self) {
        self.stale_results_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_audio_played(&self) {
        self.audio_played.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计数据快照
    ///
    /// 各字段分别读取，高并发下不保证彼此处于同一时刻。
    pub fn snapshot(&self) -> OrchestratorStatsSnapshot {
        OrchestratorStatsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_superseded: self.sessions_superseded.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            provider_successes: self.provider_successes.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            provider_timeouts: self.provider_timeouts.load(Ordering::Relaxed),
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            stale_results_dropped: self.stale_results_dropped.load(Ordering::Relaxed),
            audio_played: self.audio_played.load(Ordering::Relaxed),
        }
    }
}

/// 统计快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorStatsSnapshot {
    pub sessions_started: usize,
    pub sessions_superseded: usize,
    pub sessions_completed: usize,
    pub provider_calls: usize,
    pub provider_successes: usize,
    pub provider_failures: usize,
    pub provider_timeouts: usize,
    pub rate_limit_retries: usize,
    pub stale_results_dropped: usize,
    pub audio_played: usize,
}

impl OrchestratorStatsSnapshot {
    /// 调用成功率
    pub fn success_rate(&self) -> f64 {
        let settled = self.provider_successes + self.provider_failures + self.provider_timeouts;
        if settled == 0 {
            0.0
        } else {
            self.provider_successes as f64 / settled as f64
        }
    }
}
