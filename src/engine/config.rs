//! ### English
//! Process-wide tunables: image cache budget and the bounded waits used for worker hand-offs.
//!
//! ### 中文
//! 进程级可调参数：图像缓存预算，以及与工作线程交接时使用的有界等待时长。

use std::time::Duration;

use dpi::PhysicalSize;

/// ### English
/// Default "maximum GPU memory for image caching" (megabytes).
///
/// ### 中文
/// 默认的“图像缓存最大 GPU 内存”（MB）。
pub const DEFAULT_MAX_GPU_IMAGE_CACHE_MB: u32 = 128;

/// ### English
/// How long a caller waits for the worker to create its rendering context.
///
/// ### 中文
/// 调用方等待工作线程创建渲染上下文的时长。
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// ### English
/// How long a caller waits for a synchronous request (store, surface creation, flush).
///
/// ### 中文
/// 调用方等待同步请求（store、surface 创建、flush）的时长。
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ### English
/// Surface geometry used when the host cannot report its display size.
///
/// ### 中文
/// 宿主无法报告显示尺寸时使用的 surface 尺寸。
pub const DEFAULT_DISPLAY_SIZE: PhysicalSize<u32> = PhysicalSize::new(1920, 1080);

const BYTES_PER_MEGABYTE: usize = 1024 * 1024;

/// ### English
/// Maximum aggregate byte size of all cached images.
///
/// ### 中文
/// 所有缓存图像的总字节数上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageCacheBudget(usize);

impl ImageCacheBudget {
    pub const fn from_bytes(bytes: usize) -> Self {
        Self(bytes)
    }

    pub const fn from_megabytes(megabytes: u32) -> Self {
        Self((megabytes as usize).saturating_mul(BYTES_PER_MEGABYTE))
    }

    pub const fn bytes(self) -> usize {
        self.0
    }

    /// ### English
    /// Budget in whole megabytes (rounded down).
    ///
    /// ### 中文
    /// 以整 MB 表示的预算（向下取整）。
    pub const fn megabytes(self) -> usize {
        self.0 / BYTES_PER_MEGABYTE
    }
}

impl Default for ImageCacheBudget {
    fn default() -> Self {
        Self::from_megabytes(DEFAULT_MAX_GPU_IMAGE_CACHE_MB)
    }
}

/// ### English
/// Configuration for one `GpuOsdProvider`.
///
/// ### 中文
/// 单个 `GpuOsdProvider` 的配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdConfig {
    /// ### English
    /// Initial image cache budget (can be changed later via `set_cache_budget`).
    ///
    /// ### 中文
    /// 初始图像缓存预算（之后可通过 `set_cache_budget` 修改）。
    pub image_cache_budget: ImageCacheBudget,
    /// ### English
    /// Bound on the startup handshake; expiry counts as a startup failure.
    ///
    /// ### 中文
    /// 启动握手的等待上限；超时视为启动失败。
    pub startup_timeout: Duration,
    /// ### English
    /// Bound on synchronous worker requests.
    ///
    /// ### 中文
    /// 同步工作线程请求的等待上限。
    pub request_timeout: Duration,
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self {
            image_cache_budget: ImageCacheBudget::default(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OsdConfig {
    pub fn with_image_cache_budget(mut self, budget: ImageCacheBudget) -> Self {
        self.image_cache_budget = budget;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
