//! ### English
//! C ABI bindings for surface drawing.
//!
//! ### 中文
//! surface 绘制相关的 C ABI 绑定。

use dpi::PhysicalPosition;

use super::GpuOsdSurface;
use crate::engine::image::ImageHandle;

#[unsafe(no_mangle)]
/// ### English
/// Destroys a surface created by `gpu_osd_create_surface`. Safe to call after the provider
/// stopped its worker.
///
/// ### 中文
/// 销毁由 `gpu_osd_create_surface` 创建的 surface。provider 停止工作线程后调用也是安全的。
pub unsafe extern "C" fn gpu_osd_surface_destroy(surface: *mut GpuOsdSurface) {
    if surface.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(surface));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Queues a clear to fully transparent. Returns `false` if the surface is no longer usable.
///
/// ### 中文
/// 排队清为全透明。surface 已不可用时返回 `false`。
pub unsafe extern "C" fn gpu_osd_surface_clear(surface: *const GpuOsdSurface) -> bool {
    if surface.is_null() {
        return false;
    }
    unsafe { (*surface).handle.clear() }
}

#[unsafe(no_mangle)]
/// ### English
/// Queues drawing of a cached image with its top-left corner at (`x`, `y`).
///
/// Return value:
/// - `false` if `surface` is NULL, `image` is `0`, or the surface is no longer usable.
/// - `true` otherwise (stale handles are skipped on the worker).
///
/// ### 中文
/// 排队绘制一张缓存图像，左上角位于 (`x`, `y`)。
///
/// 返回值：
/// - `surface` 为 NULL、`image` 为 `0` 或 surface 已不可用时返回 `false`。
/// - 其它情况返回 `true`（过期句柄会在工作线程上被跳过）。
pub unsafe extern "C" fn gpu_osd_surface_draw_image(
    surface: *const GpuOsdSurface,
    image: u32,
    x: i32,
    y: i32,
) -> bool {
    if surface.is_null() {
        return false;
    }
    unsafe {
        (*surface)
            .handle
            .draw_image(ImageHandle::new(image), PhysicalPosition::new(x, y))
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Blocks until every queued call for this surface was executed and flushed to the GPU.
///
/// ### 中文
/// 阻塞直到该 surface 所有已排队的调用执行完毕并提交到 GPU。
pub unsafe extern "C" fn gpu_osd_surface_flush(surface: *const GpuOsdSurface) -> bool {
    if surface.is_null() {
        return false;
    }
    unsafe { (*surface).handle.flush() }
}
