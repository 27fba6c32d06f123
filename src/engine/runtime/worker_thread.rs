//! ### English
//! Dedicated worker thread: owns the rendering context and the image cache.
//!
//! ### 中文
//! 独立工作线程：持有渲染上下文与图像缓存。

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use crossbeam_channel as channel;

use crate::engine::cache::{CachedImage, HandleSequence, ImageCache};
use crate::engine::config::ImageCacheBudget;
use crate::engine::error::{OsdError, OsdResult};
use crate::engine::image::{ImageHandle, OsdImage};
use crate::engine::rendering::{RenderBackend, RenderContext, SurfaceDesc, SurfaceId};
use crate::engine::startup::StartupSignal;

use super::command::{CacheStats, Command};
use super::state::{StoppedOnDrop, WorkerState, WorkerStatus};

/// ### English
/// Everything the worker thread needs, moved into it at spawn time.
///
/// ### 中文
/// 工作线程所需的全部数据，在 spawn 时 move 进线程。
pub(super) struct WorkerInit {
    pub backend: Arc<dyn RenderBackend>,
    pub budget: ImageCacheBudget,
    pub handles: HandleSequence,
    pub status: Arc<WorkerStatus>,
    pub command_rx: channel::Receiver<Command>,
}

/// ### English
/// Worker thread entry function.
/// Returns after `Shutdown`, after every sender is gone, after context loss, or right after a
/// failed initialization.
///
/// ### 中文
/// 工作线程入口函数。
/// 在收到 `Shutdown`、所有 sender 都已 drop、上下文丢失，或初始化失败后返回。
pub(super) fn run_worker_thread(init: WorkerInit, startup: StartupSignal) {
    let WorkerInit {
        backend,
        budget,
        handles,
        status,
        command_rx,
    } = init;

    let _stopped = StoppedOnDrop(&status);
    status.set(WorkerState::Initializing);

    let context = match backend.create_context() {
        Ok(context) => context,
        Err(err) => {
            log::warn!("OSD worker could not create its rendering context: {err}");
            status.set(WorkerState::Stopped);
            startup.notify(Err(err));
            return;
        }
    };

    let mut worker = Worker {
        context,
        cache: ImageCache::new(budget.bytes(), handles),
        surfaces: HashSet::new(),
    };

    status.set(WorkerState::Active);
    startup.notify(Ok(()));
    log::debug!(
        "OSD worker active (image cache budget {} MB)",
        budget.megabytes()
    );

    while let Ok(command) = command_rx.recv() {
        if worker.execute(command).is_break() {
            break;
        }
        if worker.context.is_lost() {
            log::warn!("OSD rendering context lost; worker exits");
            break;
        }
    }

    status.set(WorkerState::Stopping);
    worker.teardown();
    log::debug!("OSD worker stopped");
}

/// ### English
/// Worker-thread-only state. Never leaves the worker thread.
///
/// ### 中文
/// 仅属于工作线程的状态，永远不会离开工作线程。
struct Worker {
    context: Box<dyn RenderContext>,
    cache: ImageCache,
    surfaces: HashSet<SurfaceId>,
}

impl Worker {
    fn execute(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::StoreImage { image, response } => {
                let result = self.store_image(&image);
                if let Err(err) = &result {
                    log::debug!("OSD image store rejected: {err}");
                }
                if let Err(Ok(handle)) = response.send(result) {
                    log::debug!("OSD image {handle} abandoned by its caller; releasing it");
                    if let Some(entry) = self.cache.remove(handle) {
                        self.context.delete_image(entry.texture);
                    }
                }
            }
            Command::DropImage { handle } => {
                if let Some(entry) = self.cache.remove(handle) {
                    self.context.delete_image(entry.texture);
                }
            }
            Command::SetCacheBudget { budget } => {
                let evicted = self.cache.set_budget(budget.bytes());
                self.release_entries(evicted);
            }
            Command::QueryStats { response } => {
                let _ = response.send(CacheStats {
                    entries: self.cache.len(),
                    bytes: self.cache.total_bytes(),
                    budget: self.cache.budget(),
                });
            }
            Command::CreateSurface { desc, response } => {
                if let Err(Ok(id)) = response.send(self.create_surface(&desc)) {
                    log::debug!("OSD {id} abandoned by its caller; destroying it");
                    self.surfaces.remove(&id);
                    self.context.destroy_surface(id);
                }
            }
            Command::DestroySurface { id } => {
                if self.surfaces.remove(&id) {
                    self.context.destroy_surface(id);
                }
            }
            Command::ClearSurface { id } => {
                if let Err(err) = self.with_surface(id, |context| context.clear_surface(id)) {
                    log::debug!("OSD clear of {id} failed: {err}");
                }
            }
            Command::DrawImage {
                id,
                handle,
                position,
            } => {
                let Some(entry) = self.cache.get(handle).copied() else {
                    log::debug!("OSD draw of stale image {handle} ignored");
                    return ControlFlow::Continue(());
                };
                if let Err(err) = self.with_surface(id, |context| {
                    context.draw_image(id, entry.texture, entry.size, position)
                }) {
                    log::debug!("OSD draw of {handle} on {id} failed: {err}");
                }
            }
            Command::FlushSurface { id, response } => {
                let _ = response.send(self.with_surface(id, |context| context.flush_surface(id)));
            }
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// ### English
    /// Store algorithm: reserve (FIFO eviction until the image fits or the cache is empty),
    /// reject if it still does not fit, upload, insert.
    /// Evicted textures are freed before the upload so the GPU never holds more than the budget.
    ///
    /// ### 中文
    /// 存储算法：预留空间（FIFO 淘汰直到能放下或缓存为空）、仍放不下则拒绝、上传、插入。
    /// 被淘汰的纹理在上传前释放，保证 GPU 占用不超过预算。
    fn store_image(&mut self, image: &OsdImage) -> OsdResult<ImageHandle> {
        let bytes = image.byte_size();
        let evicted = self.cache.reserve(bytes);
        self.release_entries(evicted);
        self.cache.check_fits(bytes)?;

        let texture = self.context.upload_image(image)?;
        Ok(self.cache.insert(bytes, image.size(), texture))
    }

    fn create_surface(&mut self, desc: &SurfaceDesc) -> OsdResult<SurfaceId> {
        let id = self.context.create_surface(desc)?;
        self.surfaces.insert(id);
        Ok(id)
    }

    fn with_surface(
        &mut self,
        id: SurfaceId,
        op: impl FnOnce(&mut dyn RenderContext) -> OsdResult<()>,
    ) -> OsdResult<()> {
        if !self.surfaces.contains(&id) {
            return Err(OsdError::UnknownSurface(id));
        }
        op(self.context.as_mut())
    }

    fn release_entries(&mut self, entries: Vec<CachedImage>) {
        for entry in entries {
            log::trace!("releasing OSD image {} ({} bytes)", entry.handle, entry.bytes);
            self.context.delete_image(entry.texture);
        }
    }

    /// ### English
    /// Releases every cached image, every surface and finally the context.
    ///
    /// ### 中文
    /// 释放所有缓存图像、所有 surface，最后释放上下文。
    fn teardown(&mut self) {
        let entries = self.cache.clear();
        log::debug!("OSD worker releasing {} cached images", entries.len());
        self.release_entries(entries);
        debug_assert!(self.cache.is_empty());
        for id in self.surfaces.drain() {
            self.context.destroy_surface(id);
        }
        self.context.release();
    }
}
