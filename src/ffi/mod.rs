//! ### English
//! C ABI surface for `gpu_osd`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! Every pointer argument may be NULL; NULL is treated as "nothing to do" and the function
//! returns its failure value.
//!
//! ### 中文
//! `gpu_osd` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! 所有指针参数都可以为 NULL；NULL 视为“无事可做”，函数返回其失败值。
mod abi;
mod host;
mod provider;
mod surface;

use crate::engine::config::{DEFAULT_MAX_GPU_IMAGE_CACHE_MB, ImageCacheBudget};
use crate::engine::runtime::{GpuOsdProvider, OsdSurfaceHandle};

pub use host::GpuOsdHostCallbacks;

#[repr(C)]
/// ### English
/// Opaque provider handle owning the worker lifecycle and the image cache.
///
/// ### 中文
/// 不透明 provider 句柄，持有工作线程生命周期与图像缓存。
pub struct GpuOsd {
    provider: GpuOsdProvider,
}

#[repr(C)]
/// ### English
/// Opaque surface handle (thread-safe for the host to use via pointers).
///
/// ### 中文
/// 不透明 surface 句柄（宿主可通过指针线程安全使用）。
pub struct GpuOsdSurface {
    handle: OsdSurfaceHandle,
}

/// ### English
/// C ABI version for `gpu_osd`.
///
/// ### 中文
/// `gpu_osd` 的 C ABI 版本号。
const GPU_OSD_ABI_VERSION: u32 = 1;

/// ### English
/// Converts the host's cache size in megabytes; `0` selects the default.
///
/// ### 中文
/// 转换宿主传入的缓存大小（MB）；`0` 表示使用默认值。
fn budget_from_megabytes(max_cache_mb: u32) -> ImageCacheBudget {
    if max_cache_mb == 0 {
        ImageCacheBudget::from_megabytes(DEFAULT_MAX_GPU_IMAGE_CACHE_MB)
    } else {
        ImageCacheBudget::from_megabytes(max_cache_mb)
    }
}
