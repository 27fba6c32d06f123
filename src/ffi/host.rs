//! ### English
//! Host callback table and its `HostDevice` adapter.
//!
//! ### 中文
//! 宿主回调表及其 `HostDevice` 适配器。

use std::ffi::c_void;

use dpi::PhysicalSize;

use crate::engine::config::DEFAULT_DISPLAY_SIZE;
use crate::engine::runtime::HostDevice;

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Callbacks supplied by the host plugin. Every callback is optional.
///
/// Callbacks may be invoked from any thread (including the worker thread) and must be
/// thread-safe. `user_data` is passed back unchanged.
///
/// ### 中文
/// 宿主插件提供的回调。所有回调均可为空。
///
/// 回调可能在任意线程（包括工作线程）上被调用，必须线程安全。`user_data` 原样回传。
pub struct GpuOsdHostCallbacks {
    pub user_data: *mut c_void,
    /// ### English
    /// Returns non-zero while the display device is detached. NULL means "never suspended".
    ///
    /// ### 中文
    /// 显示设备分离期间返回非 0。为 NULL 表示“从不挂起”。
    pub is_device_suspended: Option<unsafe extern "C" fn(user_data: *mut c_void) -> u8>,
    /// ### English
    /// Writes the current output size. NULL (or a zero size) selects 1920x1080.
    ///
    /// ### 中文
    /// 写出当前输出尺寸。为 NULL（或尺寸为 0）时使用 1920x1080。
    pub get_display_size: Option<
        unsafe extern "C" fn(user_data: *mut c_void, width: *mut u32, height: *mut u32),
    >,
    /// ### English
    /// Asks the host to renegotiate OSD geometry.
    ///
    /// ### 中文
    /// 请求宿主重新协商 OSD 尺寸。
    pub osd_size_changed: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
}

impl Default for GpuOsdHostCallbacks {
    fn default() -> Self {
        Self {
            user_data: std::ptr::null_mut(),
            is_device_suspended: None,
            get_display_size: None,
            osd_size_changed: None,
        }
    }
}

/// ### English
/// `HostDevice` backed by the host's callback table.
///
/// ### 中文
/// 基于宿主回调表实现的 `HostDevice`。
pub(super) struct CallbackHost {
    callbacks: GpuOsdHostCallbacks,
}

// SAFETY: the host guarantees its callbacks and `user_data` are usable from any thread.
unsafe impl Send for CallbackHost {}
unsafe impl Sync for CallbackHost {}

impl CallbackHost {
    pub(super) fn new(callbacks: GpuOsdHostCallbacks) -> Self {
        Self { callbacks }
    }
}

impl HostDevice for CallbackHost {
    fn is_device_suspended(&self) -> bool {
        match self.callbacks.is_device_suspended {
            Some(callback) => unsafe { callback(self.callbacks.user_data) != 0 },
            None => false,
        }
    }

    fn display_size(&self) -> PhysicalSize<u32> {
        let Some(callback) = self.callbacks.get_display_size else {
            return DEFAULT_DISPLAY_SIZE;
        };

        let mut width = 0;
        let mut height = 0;
        unsafe { callback(self.callbacks.user_data, &mut width, &mut height) };
        if width == 0 || height == 0 {
            return DEFAULT_DISPLAY_SIZE;
        }
        PhysicalSize::new(width, height)
    }

    fn update_osd_size(&self) {
        if let Some(callback) = self.callbacks.osd_size_changed {
            unsafe { callback(self.callbacks.user_data) };
        }
    }
}
