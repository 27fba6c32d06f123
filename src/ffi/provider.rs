//! ### English
//! C ABI bindings for the provider lifecycle and the image cache.
//!
//! ### 中文
//! provider 生命周期与图像缓存相关的 C ABI 绑定。

use std::sync::Arc;

use dpi::PhysicalSize;

use super::host::CallbackHost;
use super::{GpuOsd, GpuOsdHostCallbacks, GpuOsdSurface};
use crate::engine::config::OsdConfig;
use crate::engine::image::{ImageHandle, OsdImage};
use crate::engine::rendering::SurfmanBackend;
use crate::engine::runtime::{GpuOsdProvider, OsdProvider};

#[unsafe(no_mangle)]
/// ### English
/// Creates a provider. No thread is started until the first image or surface is requested.
///
/// `max_cache_mb` is the image cache budget in megabytes (`0` selects 128).
/// `host` may be NULL, meaning "never suspended, 1920x1080, no size-change notification".
/// The callback table is copied.
///
/// ### 中文
/// 创建 provider。在首次请求图像或 surface 之前不会启动线程。
///
/// `max_cache_mb` 为图像缓存预算（MB，`0` 表示 128）。
/// `host` 可为 NULL，表示“从不挂起、1920x1080、不通知尺寸变化”。回调表会被复制。
pub unsafe extern "C" fn gpu_osd_create(
    max_cache_mb: u32,
    host: *const GpuOsdHostCallbacks,
) -> *mut GpuOsd {
    let callbacks = if host.is_null() {
        GpuOsdHostCallbacks::default()
    } else {
        unsafe { *host }
    };

    let budget = super::budget_from_megabytes(max_cache_mb);
    let config = OsdConfig::default().with_image_cache_budget(budget);
    let provider = GpuOsdProvider::new(
        Arc::new(SurfmanBackend::new()),
        Arc::new(CallbackHost::new(callbacks)),
        config,
    );

    Box::into_raw(Box::new(GpuOsd { provider }))
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a provider created by `gpu_osd_create`.
///
/// Stops the worker (releasing every cached image and surface). Surfaces created by this
/// provider must be destroyed separately; they become inert.
///
/// ### 中文
/// 销毁由 `gpu_osd_create` 创建的 provider。
///
/// 会停止工作线程（释放所有缓存图像与 surface）。该 provider 创建的 surface 需单独销毁；
/// 它们此后不再生效。
pub unsafe extern "C" fn gpu_osd_destroy(osd: *mut GpuOsd) {
    if osd.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(osd));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Whether surfaces accept 32-bit ARGB images. Always `true` for a valid provider.
///
/// ### 中文
/// surface 是否接受 32 位 ARGB 图像。有效 provider 恒为 `true`。
pub unsafe extern "C" fn gpu_osd_provides_true_color(osd: *const GpuOsd) -> bool {
    if osd.is_null() {
        return false;
    }
    unsafe { (*osd).provider.provides_true_color() }
}

#[unsafe(no_mangle)]
/// ### English
/// Uploads one BGRA image (`stride` bytes per row) and returns its handle, or `0` on failure
/// (suspended device, no worker, budget exceeded, invalid image).
///
/// `pixels` must point to at least `stride * height` bytes; they are copied before returning.
///
/// ### 中文
/// 上传一张 BGRA 图像（每行 `stride` 字节）并返回句柄；失败时（设备挂起、无工作线程、
/// 超出预算、图像非法）返回 `0`。
///
/// `pixels` 必须指向至少 `stride * height` 字节；返回前会复制这些数据。
pub unsafe extern "C" fn gpu_osd_store_image(
    osd: *const GpuOsd,
    pixels: *const u8,
    width: u32,
    height: u32,
    stride: u32,
) -> u32 {
    if osd.is_null() || pixels.is_null() {
        return ImageHandle::NONE.get();
    }

    let Some(len) = (stride as usize).checked_mul(height as usize) else {
        return ImageHandle::NONE.get();
    };
    let pixels = unsafe { std::slice::from_raw_parts(pixels, len) }.to_vec();
    let image = match OsdImage::new(PhysicalSize::new(width, height), stride as usize, pixels) {
        Ok(image) => image,
        Err(err) => {
            log::debug!("rejected OSD image from host: {err}");
            return ImageHandle::NONE.get();
        }
    };

    unsafe { (*osd).provider.store_image(image) }.get()
}

#[unsafe(no_mangle)]
/// ### English
/// Drops a cached image. Unknown, stale or `0` handles are ignored.
///
/// ### 中文
/// 丢弃一张缓存图像。未知、过期或为 `0` 的句柄会被忽略。
pub unsafe extern "C" fn gpu_osd_drop_image(osd: *const GpuOsd, handle: u32) {
    if osd.is_null() {
        return;
    }
    unsafe { (*osd).provider.drop_image(ImageHandle::new(handle)) };
}

#[unsafe(no_mangle)]
/// ### English
/// Changes the image cache budget (`0` selects 128 MB). A live cache is trimmed on the worker.
///
/// ### 中文
/// 修改图像缓存预算（`0` 表示 128 MB）。正在使用的缓存会在工作线程上裁剪。
pub unsafe extern "C" fn gpu_osd_set_max_cache_mb(osd: *const GpuOsd, max_cache_mb: u32) {
    if osd.is_null() {
        return;
    }
    unsafe {
        (*osd)
            .provider
            .set_cache_budget(super::budget_from_megabytes(max_cache_mb))
    };
}

#[unsafe(no_mangle)]
/// ### English
/// Output geometry changed: stops the worker (all handles and surfaces become invalid) and
/// invokes the host's `osd_size_changed` callback.
///
/// ### 中文
/// 输出尺寸已变化：停止工作线程（所有句柄与 surface 失效），并调用宿主的 `osd_size_changed`。
pub unsafe extern "C" fn gpu_osd_size_changed(osd: *const GpuOsd) {
    if osd.is_null() {
        return;
    }
    unsafe { (*osd).provider.on_display_geometry_changed() };
}

#[unsafe(no_mangle)]
/// ### English
/// Stops the worker and blocks until its resources are released. The next image or surface
/// request starts a new one.
///
/// ### 中文
/// 停止工作线程并阻塞直到其资源释放完毕。下一次图像或 surface 请求会启动新的工作线程。
pub unsafe extern "C" fn gpu_osd_stop_worker(osd: *const GpuOsd) {
    if osd.is_null() {
        return;
    }
    unsafe { (*osd).provider.stop_worker() };
}

#[unsafe(no_mangle)]
/// ### English
/// Creates one surface at (`left`, `top`) on layer `level`, sized to the host's display.
///
/// Returns NULL when acceleration is unavailable; the host should then render in software.
///
/// ### 中文
/// 在 (`left`, `top`)、图层 `level` 创建一个 surface，尺寸与宿主显示输出一致。
///
/// 加速不可用时返回 NULL；宿主此时应改用软件渲染。
pub unsafe extern "C" fn gpu_osd_create_surface(
    osd: *const GpuOsd,
    left: i32,
    top: i32,
    level: u32,
) -> *mut GpuOsdSurface {
    if osd.is_null() {
        return std::ptr::null_mut();
    }

    let handle = unsafe { (*osd).provider.create_surface(left, top, level) };
    let Some(handle) = handle else {
        return std::ptr::null_mut();
    };

    Box::into_raw(Box::new(GpuOsdSurface { handle }))
}
