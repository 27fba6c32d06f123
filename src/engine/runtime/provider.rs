//! ### English
//! Lifecycle controller: the single gate deciding whether a usable worker exists right now.
//!
//! ### 中文
//! 生命周期控制器：判断“当前是否存在可用工作线程”的唯一入口。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dpi::{PhysicalPosition, PhysicalSize};

use crate::engine::cache::HandleSequence;
use crate::engine::config::{ImageCacheBudget, OsdConfig};
use crate::engine::error::{OsdError, OsdResult};
use crate::engine::image::{ImageHandle, OsdImage};
use crate::engine::rendering::{RenderBackend, SurfaceDesc};
use crate::engine::startup::startup_signal;

use super::command::CacheStats;
use super::surface::OsdSurfaceHandle;
use super::worker::{WorkerLink, WorkerThread};

/// ### English
/// Host collaborators consumed by the provider.
///
/// ### 中文
/// provider 所依赖的宿主协作方。
pub trait HostDevice: Send + Sync {
    /// ### English
    /// Whether the display device is detached/suspended. While `true` no rendering context may
    /// be created.
    ///
    /// ### 中文
    /// 显示设备是否已分离/挂起。为 `true` 时不允许创建渲染上下文。
    fn is_device_suspended(&self) -> bool;

    /// ### English
    /// Current output geometry; new surfaces are sized to it.
    ///
    /// ### 中文
    /// 当前输出尺寸；新 surface 按该尺寸分配。
    fn display_size(&self) -> PhysicalSize<u32>;

    /// ### English
    /// Asks the host to renegotiate OSD geometry (surfaces must be re-requested).
    ///
    /// ### 中文
    /// 请求宿主重新协商 OSD 尺寸（surface 需重新申请）。
    fn update_osd_size(&self);
}

/// ### English
/// Capability set the host OSD subsystem depends on.
///
/// ### 中文
/// 宿主 OSD 子系统所依赖的能力集合。
pub trait OsdProvider {
    type Surface;

    /// ### English
    /// Creates a surface at (`left`, `top`) on layer `level`; `None` means "render without
    /// acceleration".
    ///
    /// ### 中文
    /// 在 (`left`, `top`)、图层 `level` 创建 surface；`None` 表示“不使用加速渲染”。
    fn create_osd(&self, left: i32, top: i32, level: u32) -> Option<Self::Surface>;

    fn provides_true_color(&self) -> bool;

    /// ### English
    /// Caches an image; returns `ImageHandle::NONE` on any failure.
    ///
    /// ### 中文
    /// 缓存一张图像；任何失败都返回 `ImageHandle::NONE`。
    fn store_image_data(&self, image: OsdImage) -> ImageHandle;

    fn drop_image_data(&self, handle: ImageHandle);
}

/// ### English
/// Slot holding at most one worker.
///
/// ### 中文
/// 至多持有一个工作线程的槽位。
#[derive(Default)]
struct WorkerSlot {
    worker: Option<WorkerThread>,
    /// ### English
    /// Outcome of the most recent start attempt.
    ///
    /// ### 中文
    /// 最近一次启动尝试的结果。
    last_start_ok: bool,
}

/// ### English
/// GPU-backed OSD provider.
///
/// Owns the single worker slot, the process-wide cache budget and the handle sequence.
/// Dropping the provider stops the worker.
///
/// ### 中文
/// 基于 GPU 的 OSD provider。
///
/// 持有唯一的工作线程槽位、进程级缓存预算以及句柄序列。
/// drop provider 时会停止工作线程。
pub struct GpuOsdProvider {
    backend: Arc<dyn RenderBackend>,
    host: Arc<dyn HostDevice>,
    config: OsdConfig,
    /// ### English
    /// Budget (bytes) handed to the next worker at spawn time.
    ///
    /// ### 中文
    /// 下一个工作线程启动时使用的预算（字节）。
    budget: AtomicUsize,
    handles: HandleSequence,
    slot: Mutex<WorkerSlot>,
    /// ### English
    /// Number of start attempts so far; bumped while holding `slot`.
    /// Callers that waited on `slot` during someone else's attempt adopt its outcome.
    ///
    /// ### 中文
    /// 迄今为止的启动尝试次数；在持有 `slot` 时递增。
    /// 在他人启动期间等待 `slot` 的调用方会直接采用该次尝试的结果。
    start_attempts: AtomicU64,
}

impl GpuOsdProvider {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        host: Arc<dyn HostDevice>,
        config: OsdConfig,
    ) -> Self {
        let budget = AtomicUsize::new(config.image_cache_budget.bytes());
        Self {
            backend,
            host,
            config,
            budget,
            handles: HandleSequence::default(),
            slot: Mutex::new(WorkerSlot::default()),
            start_attempts: AtomicU64::new(0),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, WorkerSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// ### English
    /// Makes sure an active worker exists, starting one if needed.
    ///
    /// Returns `false` while the device is suspended (no thread is spawned), or when startup
    /// failed or timed out.
    ///
    /// ### 中文
    /// 确保存在 active 工作线程，必要时启动一个。
    ///
    /// 设备挂起时（不会创建线程）、或启动失败/超时时返回 `false`。
    pub fn ensure_worker_started(&self) -> bool {
        self.acquire_worker().is_ok()
    }

    fn acquire_worker(&self) -> OsdResult<WorkerLink> {
        if self.host.is_device_suspended() {
            return Err(OsdError::DeviceSuspended);
        }

        let observed_attempts = self.start_attempts.load(Ordering::Acquire);
        let mut slot = self.lock_slot();

        if let Some(worker) = slot.worker.as_ref() {
            if worker.active() {
                return Ok(worker.link());
            }
        }
        if let Some(mut stale) = slot.worker.take() {
            log::debug!(
                "discarding inactive OSD worker (state {:?})",
                stale.state()
            );
            stale.stop();
        }

        if self.start_attempts.load(Ordering::Acquire) != observed_attempts && !slot.last_start_ok
        {
            return Err(OsdError::StartupFailure(
                "concurrent start attempt failed".to_string(),
            ));
        }
        if self.host.is_device_suspended() {
            return Err(OsdError::DeviceSuspended);
        }

        let started = self.start_worker();
        self.start_attempts.fetch_add(1, Ordering::AcqRel);
        slot.last_start_ok = started.is_ok();

        let worker = started?;
        let link = worker.link();
        slot.worker = Some(worker);
        Ok(link)
    }

    /// ### English
    /// Spawns a worker and blocks on its startup signal (bounded by `startup_timeout`).
    ///
    /// ### 中文
    /// 启动工作线程并阻塞等待其启动信号（上限为 `startup_timeout`）。
    fn start_worker(&self) -> OsdResult<WorkerThread> {
        log::debug!("trying to start OSD worker thread");

        let (signal, waiter) = startup_signal();
        let mut worker = WorkerThread::spawn(
            self.backend.clone(),
            self.cache_budget(),
            self.handles.clone(),
            self.config.request_timeout,
            signal,
        )
        .map_err(|err| OsdError::StartupFailure(format!("failed to spawn worker: {err}")))?;

        let result = match waiter.wait(self.config.startup_timeout) {
            Ok(()) if worker.active() => Ok(()),
            Ok(()) => Err(OsdError::StartupFailure(
                "worker stopped right after startup".to_string(),
            )),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                log::debug!("OSD worker thread successfully started");
                Ok(worker)
            }
            Err(err) => {
                log::warn!("OSD worker thread NOT started: {err}");
                worker.stop();
                Err(err)
            }
        }
    }

    /// ### English
    /// Stops the worker (if any) and blocks until its context and every cached image are
    /// released. Idempotent.
    ///
    /// ### 中文
    /// 停止工作线程（若存在），并阻塞直到其上下文与所有缓存图像均已释放。幂等。
    pub fn stop_worker(&self) {
        let mut slot = self.lock_slot();
        if let Some(mut worker) = slot.worker.take() {
            log::debug!("stopping OSD worker thread");
            worker.stop();
            log::debug!("OSD worker thread stopped");
        }
    }

    /// ### English
    /// Output geometry changed: tear everything down and ask the host to renegotiate.
    ///
    /// ### 中文
    /// 输出尺寸已变化：销毁全部资源并请求宿主重新协商。
    pub fn on_display_geometry_changed(&self) {
        self.stop_worker();
        self.host.update_osd_size();
    }

    pub fn store_image(&self, image: OsdImage) -> ImageHandle {
        let result = self
            .acquire_worker()
            .and_then(|worker| worker.store_image(image));
        match result {
            Ok(handle) => handle,
            Err(err) => {
                log::debug!("OSD image not cached: {err}");
                ImageHandle::NONE
            }
        }
    }

    /// ### English
    /// Drops a cached image. Unknown, stale or `0` handles are silently ignored.
    ///
    /// ### 中文
    /// 丢弃一张缓存图像。未知、过期或为 `0` 的句柄会被静默忽略。
    pub fn drop_image(&self, handle: ImageHandle) {
        if handle.is_none() {
            return;
        }
        if let Ok(worker) = self.acquire_worker() {
            worker.drop_image(handle);
        }
    }

    pub fn create_surface(&self, left: i32, top: i32, level: u32) -> Option<OsdSurfaceHandle> {
        log::debug!("create OSD surface at {left}, {top}, level {level}");

        let worker = match self.acquire_worker() {
            Ok(worker) => worker,
            Err(err) => {
                log::debug!("no accelerated OSD surface: {err}");
                return None;
            }
        };

        let desc = SurfaceDesc {
            origin: PhysicalPosition::new(left, top),
            level,
            size: self.host.display_size(),
        };
        match worker.create_surface(desc) {
            Ok(id) => Some(OsdSurfaceHandle::new(id, desc, worker)),
            Err(err) => {
                log::debug!("no accelerated OSD surface: {err}");
                None
            }
        }
    }

    pub fn cache_budget(&self) -> ImageCacheBudget {
        ImageCacheBudget::from_bytes(self.budget.load(Ordering::Acquire))
    }

    /// ### English
    /// Updates the process-wide budget. A live worker receives the change as a queued request
    /// and evicts on its own thread; the cache is never touched from here.
    ///
    /// ### 中文
    /// 更新进程级预算。正在运行的工作线程会以排队请求的方式接收变更并在自身线程上执行淘汰；
    /// 此处绝不直接访问缓存。
    pub fn set_cache_budget(&self, budget: ImageCacheBudget) {
        self.budget.store(budget.bytes(), Ordering::Release);
        let slot = self.lock_slot();
        if let Some(worker) = slot.worker.as_ref() {
            worker.link().set_cache_budget(budget);
        }
    }

    /// ### English
    /// Cache statistics of the live worker; `None` if no worker is active. Never starts one.
    ///
    /// ### 中文
    /// 当前工作线程的缓存统计；若没有 active 工作线程则为 `None`。不会启动工作线程。
    pub fn cache_stats(&self) -> Option<CacheStats> {
        let link = {
            let slot = self.lock_slot();
            slot.worker.as_ref()?.link()
        };
        link.cache_stats().ok()
    }

    pub fn is_worker_active(&self) -> bool {
        self.lock_slot()
            .worker
            .as_ref()
            .is_some_and(WorkerThread::active)
    }
}

impl OsdProvider for GpuOsdProvider {
    type Surface = OsdSurfaceHandle;

    fn create_osd(&self, left: i32, top: i32, level: u32) -> Option<OsdSurfaceHandle> {
        self.create_surface(left, top, level)
    }

    fn provides_true_color(&self) -> bool {
        true
    }

    fn store_image_data(&self, image: OsdImage) -> ImageHandle {
        self.store_image(image)
    }

    fn drop_image_data(&self, handle: ImageHandle) {
        self.drop_image(handle);
    }
}

impl Drop for GpuOsdProvider {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::engine::rendering::test_backend::TestBackend;

    const MB: usize = 1024 * 1024;

    #[derive(Default)]
    struct TestHost {
        suspended: AtomicBool,
        size_changes: AtomicUsize,
    }

    impl HostDevice for TestHost {
        fn is_device_suspended(&self) -> bool {
            self.suspended.load(Ordering::SeqCst)
        }

        fn display_size(&self) -> PhysicalSize<u32> {
            PhysicalSize::new(720, 576)
        }

        fn update_osd_size(&self) {
            self.size_changes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn provider_with(
        backend: &TestBackend,
        budget: ImageCacheBudget,
    ) -> (GpuOsdProvider, Arc<TestHost>) {
        let host = Arc::new(TestHost::default());
        let provider = GpuOsdProvider::new(
            Arc::new(backend.clone()),
            host.clone(),
            OsdConfig::default()
                .with_image_cache_budget(budget)
                .with_startup_timeout(Duration::from_secs(5))
                .with_request_timeout(Duration::from_secs(5)),
        );
        (provider, host)
    }

    /// 1 MiB image (512 x 512 x 4 bytes) repeated `megabytes` times in height.
    fn image_mb(megabytes: u32) -> OsdImage {
        let size = PhysicalSize::new(512, 512 * megabytes);
        OsdImage::packed(size, vec![0; 512 * 512 * 4 * megabytes as usize]).unwrap()
    }

    fn small_image() -> OsdImage {
        OsdImage::packed(PhysicalSize::new(4, 4), vec![0xff; 64]).unwrap()
    }

    #[test]
    fn fifo_eviction_with_ten_megabyte_budget() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::from_megabytes(10));

        let a = provider.store_image(image_mb(6));
        assert_eq!(a, ImageHandle::new(1));
        assert_eq!(provider.cache_stats().unwrap().bytes, 6 * MB);

        let b = provider.store_image(image_mb(6));
        assert_eq!(b, ImageHandle::new(2));
        let stats = provider.cache_stats().unwrap();
        assert_eq!(stats.bytes, 6 * MB);
        assert_eq!(stats.entries, 1);
        assert_eq!(backend.state.live_textures(), 1);
    }

    #[test]
    fn suspended_device_gets_no_surface_and_no_thread() {
        let backend = TestBackend::new();
        let (provider, host) = provider_with(&backend, ImageCacheBudget::default());
        host.suspended.store(true, Ordering::SeqCst);

        assert!(provider.create_osd(0, 0, 0).is_none());
        assert!(!provider.ensure_worker_started());
        assert_eq!(provider.store_image(small_image()), ImageHandle::NONE);
        assert!(backend.state.threads().is_empty());
        assert_eq!(backend.state.contexts_created(), 0);
    }

    #[test]
    fn suspension_wins_over_a_live_worker() {
        let backend = TestBackend::new();
        let (provider, host) = provider_with(&backend, ImageCacheBudget::default());
        assert!(provider.ensure_worker_started());

        host.suspended.store(true, Ordering::SeqCst);
        assert!(!provider.ensure_worker_started());
        assert_eq!(backend.state.contexts_created(), 1);
    }

    #[test]
    fn geometry_change_invalidates_handles() {
        let backend = TestBackend::new();
        let (provider, host) = provider_with(&backend, ImageCacheBudget::default());

        provider.store_image(small_image());
        provider.store_image(small_image());
        let c = provider.store_image(small_image());
        assert_eq!(c, ImageHandle::new(3));

        provider.on_display_geometry_changed();
        assert_eq!(host.size_changes.load(Ordering::SeqCst), 1);
        assert!(!provider.is_worker_active());
        assert_eq!(backend.state.live_contexts(), 0);
        assert_eq!(backend.state.live_textures(), 0);
        assert_eq!(backend.state.leaked_textures(), 0);

        provider.drop_image(c);
        let stats = provider.cache_stats().unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.bytes, 0);
    }

    #[test]
    fn concurrent_starters_share_one_worker() {
        let backend = TestBackend::new().with_startup_delay(Duration::from_millis(50));
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());
        let provider = Arc::new(provider);
        let barrier = Arc::new(Barrier::new(2));

        let results: Vec<bool> = (0..2)
            .map(|_| {
                let provider = provider.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    provider.ensure_worker_started()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(results, vec![true, true]);
        assert_eq!(backend.state.contexts_created(), 1);
    }

    #[test]
    fn concurrent_starters_share_one_failure() {
        let backend = TestBackend::new().with_startup_delay(Duration::from_millis(50));
        backend.state.fail_startup.store(true, Ordering::SeqCst);
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());
        let provider = Arc::new(provider);
        let barrier = Arc::new(Barrier::new(2));

        let results: Vec<bool> = (0..2)
            .map(|_| {
                let provider = provider.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    provider.ensure_worker_started()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(results, vec![false, false]);
        assert_eq!(backend.state.contexts_created(), 0);
        assert!(!provider.is_worker_active());
    }

    #[test]
    fn never_more_than_one_live_context() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());
        let provider = Arc::new(provider);

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let provider = provider.clone();
                thread::spawn(move || {
                    for round in 0..20 {
                        if (i + round) % 3 == 0 {
                            provider.stop_worker();
                        } else {
                            provider.ensure_worker_started();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(backend.state.max_live_contexts.load(Ordering::SeqCst), 1);
        provider.stop_worker();
        assert_eq!(backend.state.live_contexts(), 0);
    }

    #[test]
    fn stop_empties_cache_and_next_store_restarts() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());

        let first = provider.store_image(small_image());
        assert!(!first.is_none());
        provider.stop_worker();
        provider.stop_worker();
        assert_eq!(backend.state.live_contexts(), 0);
        assert_eq!(backend.state.live_textures(), 0);
        assert_eq!(backend.state.leaked_textures(), 0);
        assert!(provider.cache_stats().is_none());

        let second = provider.store_image(small_image());
        assert!(!second.is_none());
        assert_ne!(first, second);
        assert_eq!(backend.state.contexts_created(), 2);
        assert_eq!(provider.cache_stats().unwrap().entries, 1);
    }

    #[test]
    fn stale_drops_are_harmless() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());

        let kept = provider.store_image(small_image());
        let dropped = provider.store_image(small_image());
        provider.drop_image(dropped);
        provider.drop_image(dropped);
        provider.drop_image(ImageHandle::new(4242));
        provider.drop_image(ImageHandle::NONE);

        let stats = provider.cache_stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.bytes, 64);

        provider.stop_worker();
        provider.drop_image(kept);
        let fresh = provider.store_image(small_image());
        assert!(!fresh.is_none());
        assert_eq!(provider.cache_stats().unwrap().entries, 1);
    }

    #[test]
    fn oversized_image_empties_the_cache_and_returns_null_handle() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::from_megabytes(1));

        let evicted = provider.store_image(small_image());
        assert!(!evicted.is_none());
        assert_eq!(provider.store_image(image_mb(2)), ImageHandle::NONE);
        assert!(provider.is_worker_active());
        let stats = provider.cache_stats().unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.bytes, 0);
        assert_eq!(backend.state.live_textures(), 0);
        provider.drop_image(evicted);
    }

    #[test]
    fn failed_startup_degrades_then_recovers() {
        let backend = TestBackend::new();
        backend.state.fail_startup.store(true, Ordering::SeqCst);
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());

        assert!(provider.create_osd(10, 10, 1).is_none());
        assert_eq!(provider.store_image(small_image()), ImageHandle::NONE);

        backend.state.fail_startup.store(false, Ordering::SeqCst);
        assert!(provider.create_osd(10, 10, 1).is_some());
    }

    #[test]
    fn startup_timeout_counts_as_failure() {
        let backend = TestBackend::new().with_startup_delay(Duration::from_millis(300));
        let host = Arc::new(TestHost::default());
        let provider = GpuOsdProvider::new(
            Arc::new(backend.clone()),
            host,
            OsdConfig::default().with_startup_timeout(Duration::from_millis(20)),
        );

        assert!(!provider.ensure_worker_started());
        // The late worker was shut down and joined before the call returned.
        assert_eq!(backend.state.live_contexts(), 0);
        assert!(!provider.is_worker_active());
    }

    #[test]
    fn lost_context_is_replaced_on_next_use() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());
        assert!(provider.ensure_worker_started());

        backend.state.lose_context.store(true, Ordering::SeqCst);
        let _ = provider.cache_stats();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while provider.is_worker_active() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!provider.is_worker_active());

        backend.state.lose_context.store(false, Ordering::SeqCst);
        assert!(!provider.store_image(small_image()).is_none());
        assert_eq!(backend.state.contexts_created(), 2);
        assert_eq!(backend.state.max_live_contexts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn surfaces_fail_softly_after_their_worker_stops() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());

        let image = provider.store_image(small_image());
        let surface = provider.create_osd(0, 0, 0).unwrap();
        assert_eq!(surface.desc().size, PhysicalSize::new(720, 576));
        assert!(surface.is_usable());
        assert!(surface.clear());
        assert!(surface.draw_image(image, PhysicalPosition::new(10, 20)));
        assert!(surface.flush());
        assert_eq!(backend.state.draws.load(Ordering::SeqCst), 1);

        provider.on_display_geometry_changed();
        assert!(!surface.is_usable());
        assert!(!surface.clear());
        assert!(!surface.draw_image(image, PhysicalPosition::new(0, 0)));
        assert!(!surface.flush());

        // A new worker does not adopt surfaces of the old one.
        assert!(provider.ensure_worker_started());
        assert!(!surface.is_usable());
        drop(surface);
        assert_eq!(backend.state.live_surfaces.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_a_surface_destroys_it_on_the_worker() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());

        let surface = provider.create_osd(0, 0, 0).unwrap();
        assert_eq!(backend.state.live_surfaces.load(Ordering::SeqCst), 1);
        drop(surface);
        // Stats are queued behind the destroy request.
        provider.cache_stats().unwrap();
        assert_eq!(backend.state.live_surfaces.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn budget_updates_reach_live_and_future_workers() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::from_megabytes(8));
        for _ in 0..4 {
            assert!(!provider.store_image(image_mb(2)).is_none());
        }

        provider.set_cache_budget(ImageCacheBudget::from_megabytes(3));
        let stats = provider.cache_stats().unwrap();
        assert_eq!(stats.budget, 3 * MB);
        assert_eq!(stats.bytes, 2 * MB);

        provider.stop_worker();
        assert!(provider.ensure_worker_started());
        assert_eq!(provider.cache_stats().unwrap().budget, 3 * MB);
        assert_eq!(provider.cache_budget(), ImageCacheBudget::from_megabytes(3));
    }

    #[test]
    fn requests_given_up_on_leave_nothing_behind() {
        let backend = TestBackend::new().with_op_delay(Duration::from_millis(150));
        let host = Arc::new(TestHost::default());
        let provider = GpuOsdProvider::new(
            Arc::new(backend.clone()),
            host,
            OsdConfig::default().with_request_timeout(Duration::from_millis(30)),
        );

        assert_eq!(provider.store_image(small_image()), ImageHandle::NONE);
        assert!(provider.create_osd(0, 0, 0).is_none());
        backend.state.op_delay_ms.store(0, Ordering::SeqCst);

        // Stats are queued behind both abandoned requests.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let stats = loop {
            if let Some(stats) = provider.cache_stats() {
                break stats;
            }
            assert!(std::time::Instant::now() < deadline, "worker never answered");
        };
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.bytes, 0);
        assert_eq!(backend.state.live_textures(), 0);
        assert_eq!(backend.state.live_surfaces.load(Ordering::SeqCst), 0);

        assert!(!provider.store_image(small_image()).is_none());
    }

    #[test]
    fn dropping_the_provider_releases_everything() {
        let backend = TestBackend::new();
        let (provider, _) = provider_with(&backend, ImageCacheBudget::default());
        provider.store_image(small_image());
        let surface = provider.create_osd(0, 0, 0).unwrap();
        assert!(provider.provides_true_color());

        drop(provider);
        assert!(!surface.is_usable());
        assert_eq!(backend.state.live_contexts(), 0);
        assert_eq!(backend.state.live_textures(), 0);
        assert_eq!(backend.state.leaked_textures(), 0);
        assert_eq!(backend.state.leaked_surfaces(), 0);
    }
}
