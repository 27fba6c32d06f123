//! ### English
//! Worker lifecycle state shared between the worker thread and every link that talks to it.
//!
//! ### 中文
//! 在工作线程与所有与之通信的 link 之间共享的生命周期状态。

use std::sync::atomic::{AtomicU8, Ordering};

/// ### English
/// Lifecycle of one worker instance: `Created → Initializing → Active → Stopping → Stopped`.
/// A failed initialization goes straight from `Initializing` to `Stopped`.
///
/// ### 中文
/// 单个工作线程实例的生命周期：`Created → Initializing → Active → Stopping → Stopped`。
/// 初始化失败时从 `Initializing` 直接进入 `Stopped`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Created = 0,
    Initializing = 1,
    Active = 2,
    Stopping = 3,
    Stopped = 4,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Initializing,
            2 => Self::Active,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// ### English
/// Atomic cell holding a `WorkerState`.
///
/// ### 中文
/// 保存 `WorkerState` 的原子单元。
pub(super) struct WorkerStatus(AtomicU8);

impl WorkerStatus {
    pub(super) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Created as u8))
    }

    #[inline]
    pub(super) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(super) fn is_active(&self) -> bool {
        self.get() == WorkerState::Active
    }

    #[inline]
    pub(super) fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// ### English
    /// Moves `Active → Stopping`; returns `false` if the worker was not active.
    /// Links stop forwarding requests as soon as this succeeds.
    ///
    /// ### 中文
    /// 执行 `Active → Stopping`；若工作线程不处于 active 状态则返回 `false`。
    /// 一旦成功，各 link 会立即停止转发请求。
    pub(super) fn begin_stopping(&self) -> bool {
        self.0
            .compare_exchange(
                WorkerState::Active as u8,
                WorkerState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// ### English
/// Marks the worker `Stopped` when dropped, including during a panic unwind.
///
/// ### 中文
/// drop 时（包括 panic 展开期间）将工作线程标记为 `Stopped`。
pub(super) struct StoppedOnDrop<'a>(pub(super) &'a WorkerStatus);

impl Drop for StoppedOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(WorkerState::Stopped);
    }
}
