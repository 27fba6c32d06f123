//! ### English
//! Recording backend for tests: no GPU, but counts contexts/textures/surfaces, records the
//! thread every context call runs on, and can fail, delay or lose its context on demand.
//!
//! ### 中文
//! 测试用记录后端：不使用 GPU，但会统计上下文/纹理/surface 数量，记录每次上下文调用所在线程，
//! 并可按需模拟启动失败、启动延迟或上下文丢失。

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use dpi::{PhysicalPosition, PhysicalSize};

use crate::engine::error::{OsdError, OsdResult};
use crate::engine::image::OsdImage;

use super::{GpuTexture, RenderBackend, RenderContext, SurfaceDesc, SurfaceId};

#[derive(Default)]
pub(crate) struct TestBackendState {
    pub(crate) fail_startup: AtomicBool,
    pub(crate) startup_delay_ms: AtomicU64,
    pub(crate) fail_uploads: AtomicBool,
    pub(crate) lose_context: AtomicBool,
    pub(crate) contexts_created: AtomicUsize,
    pub(crate) live_contexts: AtomicUsize,
    pub(crate) max_live_contexts: AtomicUsize,
    pub(crate) live_textures: AtomicUsize,
    pub(crate) live_surfaces: AtomicUsize,
    /// Textures still alive when their context was released (the cache never freed them).
    pub(crate) leaked_textures: AtomicUsize,
    /// Surfaces still alive when their context was released.
    pub(crate) leaked_surfaces: AtomicUsize,
    pub(crate) op_delay_ms: AtomicU64,
    pub(crate) draws: AtomicUsize,
    pub(crate) flushes: AtomicUsize,
    pub(crate) calling_threads: Mutex<HashSet<String>>,
}

impl TestBackendState {
    fn record_thread(&self) {
        let name = thread::current().name().unwrap_or("<unnamed>").to_string();
        self.calling_threads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name);
    }

    pub(crate) fn threads(&self) -> HashSet<String> {
        self.calling_threads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn live_contexts(&self) -> usize {
        self.live_contexts.load(Ordering::SeqCst)
    }

    pub(crate) fn contexts_created(&self) -> usize {
        self.contexts_created.load(Ordering::SeqCst)
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.live_textures.load(Ordering::SeqCst)
    }

    pub(crate) fn leaked_textures(&self) -> usize {
        self.leaked_textures.load(Ordering::SeqCst)
    }

    pub(crate) fn leaked_surfaces(&self) -> usize {
        self.leaked_surfaces.load(Ordering::SeqCst)
    }

    /// Sleeps for the configured per-operation delay (slow uploads and surface allocation).
    fn op_delay(&self) {
        let delay = self.op_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct TestBackend {
    pub(crate) state: Arc<TestBackendState>,
}

impl TestBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_op_delay(self, delay: Duration) -> Self {
        self.state
            .op_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_startup_delay(self, delay: Duration) -> Self {
        self.state
            .startup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }
}

impl RenderBackend for TestBackend {
    fn create_context(&self) -> OsdResult<Box<dyn RenderContext>> {
        let state = self.state.clone();
        state.record_thread();

        let delay = state.startup_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        if state.fail_startup.load(Ordering::SeqCst) {
            return Err(OsdError::StartupFailure("test backend refused".to_string()));
        }

        state.contexts_created.fetch_add(1, Ordering::SeqCst);
        let live = state.live_contexts.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_live_contexts.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(TestContext {
            state,
            next_texture: 1,
            next_surface: 1,
            textures: HashSet::new(),
            surfaces: HashSet::new(),
            released: false,
        }))
    }
}

struct TestContext {
    state: Arc<TestBackendState>,
    next_texture: u32,
    next_surface: u32,
    textures: HashSet<GpuTexture>,
    surfaces: HashSet<SurfaceId>,
    released: bool,
}

impl TestContext {
    fn check_surface(&self, surface: SurfaceId) -> OsdResult<()> {
        if self.surfaces.contains(&surface) {
            Ok(())
        } else {
            Err(OsdError::UnknownSurface(surface))
        }
    }
}

impl RenderContext for TestContext {
    fn upload_image(&mut self, _image: &OsdImage) -> OsdResult<GpuTexture> {
        self.state.record_thread();
        self.state.op_delay();
        if self.state.fail_uploads.load(Ordering::SeqCst) {
            return Err(OsdError::Upload("test backend out of memory".to_string()));
        }
        let raw = NonZeroU32::new(self.next_texture).unwrap_or(NonZeroU32::MIN);
        self.next_texture += 1;
        let texture = GpuTexture::new(raw);
        self.textures.insert(texture);
        self.state.live_textures.fetch_add(1, Ordering::SeqCst);
        Ok(texture)
    }

    fn delete_image(&mut self, texture: GpuTexture) {
        self.state.record_thread();
        if self.textures.remove(&texture) {
            self.state.live_textures.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn create_surface(&mut self, _desc: &SurfaceDesc) -> OsdResult<SurfaceId> {
        self.state.record_thread();
        self.state.op_delay();
        let id = SurfaceId::new(self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(id);
        self.state.live_surfaces.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        self.state.record_thread();
        if self.surfaces.remove(&surface) {
            self.state.live_surfaces.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn clear_surface(&mut self, surface: SurfaceId) -> OsdResult<()> {
        self.state.record_thread();
        self.check_surface(surface)
    }

    fn draw_image(
        &mut self,
        surface: SurfaceId,
        texture: GpuTexture,
        _size: PhysicalSize<u32>,
        _position: PhysicalPosition<i32>,
    ) -> OsdResult<()> {
        self.state.record_thread();
        self.check_surface(surface)?;
        if !self.textures.contains(&texture) {
            return Err(OsdError::Upload(format!("unknown texture {texture:?}")));
        }
        self.state.draws.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn flush_surface(&mut self, surface: SurfaceId) -> OsdResult<()> {
        self.state.record_thread();
        self.check_surface(surface)?;
        self.state.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_lost(&self) -> bool {
        self.state.lose_context.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.state.record_thread();
        self.state
            .leaked_textures
            .fetch_add(self.textures.len(), Ordering::SeqCst);
        self.state
            .leaked_surfaces
            .fetch_add(self.surfaces.len(), Ordering::SeqCst);
        self.state
            .live_textures
            .fetch_sub(self.textures.len(), Ordering::SeqCst);
        self.state
            .live_surfaces
            .fetch_sub(self.surfaces.len(), Ordering::SeqCst);
        self.textures.clear();
        self.surfaces.clear();
        self.state.live_contexts.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.release();
    }
}
