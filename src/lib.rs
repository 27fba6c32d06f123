/// ### English
/// `gpu_osd` crate root (cdylib + rlib).
/// Exposes the C ABI via `ffi`; the worker lifecycle, image cache and rendering seam live under
/// `engine`.
///
/// ### 中文
/// `gpu_osd` 的 crate 根（cdylib + rlib）。
/// 通过 `ffi` 导出 C ABI；工作线程生命周期、图像缓存与渲染接口位于 `engine` 模块。
mod engine;
mod ffi;

pub use engine::config::{ImageCacheBudget, OsdConfig};
pub use engine::error::{OsdError, OsdResult};
pub use engine::image::{ImageHandle, OsdImage};
pub use engine::rendering::{
    GpuTexture, RenderBackend, RenderContext, SurfaceDesc, SurfaceId, SurfmanBackend,
};
pub use engine::runtime::{
    CacheStats, GpuOsdProvider, HostDevice, OsdProvider, OsdSurfaceHandle, WorkerState,
};
