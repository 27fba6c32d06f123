//! ### English
//! Owning handle of one worker thread, plus the cheap cloneable link used to reach it.
//!
//! ### 中文
//! 单个工作线程的所有者句柄，以及用于访问它的轻量可克隆 link。

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use dpi::PhysicalPosition;

use crate::engine::cache::HandleSequence;
use crate::engine::config::ImageCacheBudget;
use crate::engine::error::{OsdError, OsdResult};
use crate::engine::image::{ImageHandle, OsdImage};
use crate::engine::rendering::{RenderBackend, SurfaceDesc, SurfaceId};
use crate::engine::startup::StartupSignal;

use super::command::{CacheStats, Command, Reply, reply_channel};
use super::state::{WorkerState, WorkerStatus};
use super::worker_thread::{self, WorkerInit};

/// ### English
/// Name given to the worker thread.
///
/// ### 中文
/// 工作线程的线程名。
pub(crate) const WORKER_THREAD_NAME: &str = "gpu-osd-worker";

/// ### English
/// Owning handle of one worker thread. Exactly one exists per spawned thread and it is held
/// only by the provider's slot.
///
/// ### 中文
/// 单个工作线程的所有者句柄。每个线程恰好对应一个，且只由 provider 的槽位持有。
pub(super) struct WorkerThread {
    link: WorkerLink,
    /// ### English
    /// Join handle for the worker (taken on stop).
    ///
    /// ### 中文
    /// 工作线程的 join handle（stop 时取走）。
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerThread {
    /// ### English
    /// Spawns the worker. The thread reports through `startup` once its context exists (or
    /// failed to be created); this function does not wait for that.
    ///
    /// #### Parameters
    /// - `backend`: Context factory invoked on the new thread.
    /// - `budget`: Image cache budget at spawn time.
    /// - `handles`: Provider-wide handle sequence.
    /// - `request_timeout`: Bound for synchronous requests made through this worker's links.
    /// - `startup`: One-shot signal consumed by the worker.
    ///
    /// ### 中文
    /// 启动工作线程。线程在上下文创建完成（或失败）后通过 `startup` 报告；本函数不等待该结果。
    ///
    /// #### 参数
    /// - `backend`：在新线程上调用的上下文工厂。
    /// - `budget`：启动时的图像缓存预算。
    /// - `handles`：provider 级别的句柄序列。
    /// - `request_timeout`：通过该工作线程 link 发起同步请求时的等待上限。
    /// - `startup`：由工作线程消费的一次性信号。
    pub(super) fn spawn(
        backend: Arc<dyn RenderBackend>,
        budget: ImageCacheBudget,
        handles: HandleSequence,
        request_timeout: Duration,
        startup: StartupSignal,
    ) -> io::Result<Self> {
        let (command_tx, command_rx) = channel::unbounded();
        let status = Arc::new(WorkerStatus::new());

        let init = WorkerInit {
            backend,
            budget,
            handles,
            status: status.clone(),
            command_rx,
        };
        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_thread::run_worker_thread(init, startup))?;

        Ok(Self {
            link: WorkerLink {
                command_tx,
                status,
                request_timeout,
            },
            thread: Some(thread),
        })
    }

    /// ### English
    /// `true` only while the worker is in the `Active` state.
    ///
    /// ### 中文
    /// 仅当工作线程处于 `Active` 状态时为 `true`。
    pub(super) fn active(&self) -> bool {
        self.link.is_active()
    }

    pub(super) fn state(&self) -> WorkerState {
        self.link.status.get()
    }

    pub(super) fn link(&self) -> WorkerLink {
        self.link.clone()
    }

    /// ### English
    /// Requests shutdown and joins the thread. Returns once the context and every cached image
    /// are released. Idempotent.
    ///
    /// ### 中文
    /// 请求退出并 join 线程。返回时上下文与所有缓存图像均已释放。幂等。
    pub(super) fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.link.status.begin_stopping();
            let _ = self.link.command_tx.send(Command::Shutdown);
            if thread.join().is_err() {
                log::warn!("OSD worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// ### English
/// Cloneable route into one worker's queue. Every operation fails softly once that worker has
/// left the `Active` state; a link never reaches a different (newer) worker.
///
/// ### 中文
/// 通往某个工作线程队列的可克隆通道。一旦该工作线程离开 `Active` 状态，所有操作都会软失败；
/// link 永远不会访问另一个（更新的）工作线程。
#[derive(Clone)]
pub(super) struct WorkerLink {
    command_tx: channel::Sender<Command>,
    status: Arc<WorkerStatus>,
    request_timeout: Duration,
}

impl WorkerLink {
    pub(super) fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// ### English
    /// Enqueues one command if the worker is active.
    ///
    /// ### 中文
    /// 若工作线程处于 active 状态则入队一个命令。
    fn send(&self, command: Command) -> bool {
        self.is_active() && self.command_tx.send(command).is_ok()
    }

    /// ### English
    /// Synchronous hand-off: enqueue, then wait (bounded) for the one-shot response.
    /// A request abandoned on timeout is undone by the worker.
    ///
    /// ### 中文
    /// 同步交接：入队后（有界）等待一次性响应。
    /// 超时被放弃的请求由工作线程撤销。
    fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> OsdResult<T> {
        let (response, waiter) = reply_channel();
        if !self.send(build(response)) {
            return Err(OsdError::WorkerUnavailable);
        }
        waiter
            .wait(self.request_timeout)
            .ok_or(OsdError::WorkerUnavailable)
    }

    pub(super) fn store_image(&self, image: OsdImage) -> OsdResult<ImageHandle> {
        self.request(|response| Command::StoreImage { image, response })?
    }

    pub(super) fn drop_image(&self, handle: ImageHandle) -> bool {
        self.send(Command::DropImage { handle })
    }

    pub(super) fn set_cache_budget(&self, budget: ImageCacheBudget) -> bool {
        self.send(Command::SetCacheBudget { budget })
    }

    pub(super) fn cache_stats(&self) -> OsdResult<CacheStats> {
        self.request(|response| Command::QueryStats { response })
    }

    pub(super) fn create_surface(&self, desc: SurfaceDesc) -> OsdResult<SurfaceId> {
        self.request(|response| Command::CreateSurface { desc, response })?
    }

    pub(super) fn destroy_surface(&self, id: SurfaceId) -> bool {
        self.send(Command::DestroySurface { id })
    }

    pub(super) fn clear_surface(&self, id: SurfaceId) -> bool {
        self.send(Command::ClearSurface { id })
    }

    pub(super) fn draw_image(
        &self,
        id: SurfaceId,
        handle: ImageHandle,
        position: PhysicalPosition<i32>,
    ) -> bool {
        self.send(Command::DrawImage {
            id,
            handle,
            position,
        })
    }

    pub(super) fn flush_surface(&self, id: SurfaceId) -> OsdResult<()> {
        self.request(|response| Command::FlushSurface { id, response })?
    }
}
