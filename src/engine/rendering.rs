//! ### English
//! Rendering module entry point.
//!
//! The worker thread talks to the GPU only through `RenderContext`; a `RenderBackend` is the
//! thread-safe factory the worker calls (on its own thread) to create that context.
//! The production backend is a headless surfman/glow OpenGL context.
//!
//! ### 中文
//! 渲染模块入口。
//!
//! 工作线程只通过 `RenderContext` 访问 GPU；`RenderBackend` 是线程安全的工厂，
//! 由工作线程（在自身线程上）调用以创建该上下文。
//! 生产环境后端为基于 surfman/glow 的无头 OpenGL 上下文。

mod gl_context;
#[cfg(test)]
pub(crate) mod test_backend;

use std::fmt;
use std::num::NonZeroU32;

use dpi::{PhysicalPosition, PhysicalSize};

use crate::engine::error::OsdResult;
use crate::engine::image::OsdImage;

pub use gl_context::SurfmanBackend;

/// ### English
/// GPU texture name owned by a `RenderContext`.
///
/// ### 中文
/// 由 `RenderContext` 持有的 GPU 纹理名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuTexture(NonZeroU32);

impl GpuTexture {
    pub const fn new(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> NonZeroU32 {
        self.0
    }
}

/// ### English
/// Identifier of one OSD surface inside a `RenderContext`.
///
/// ### 中文
/// `RenderContext` 内单个 OSD surface 的标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

impl SurfaceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// ### English
/// Placement and geometry of one OSD surface as requested by the host.
///
/// ### 中文
/// 宿主请求的单个 OSD surface 的位置与尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesc {
    /// ### English
    /// Screen position of the surface's top-left corner.
    ///
    /// ### 中文
    /// surface 左上角在屏幕上的位置。
    pub origin: PhysicalPosition<i32>,
    /// ### English
    /// Layer level (higher levels are composed above lower ones by the host).
    ///
    /// ### 中文
    /// 图层级别（宿主将高层级合成在低层级之上）。
    pub level: u32,
    /// ### English
    /// Backing store size (the display geometry at creation time).
    ///
    /// ### 中文
    /// 后备存储尺寸（创建时的显示尺寸）。
    pub size: PhysicalSize<u32>,
}

/// ### English
/// Thread-safe factory for rendering contexts.
///
/// `create_context` is always invoked on the worker thread, which then owns the returned
/// context for its whole life.
///
/// ### 中文
/// 渲染上下文的线程安全工厂。
///
/// `create_context` 总是在工作线程上调用，返回的上下文在其整个生命周期内归该线程所有。
pub trait RenderBackend: Send + Sync + 'static {
    fn create_context(&self) -> OsdResult<Box<dyn RenderContext>>;
}

/// ### English
/// A GPU rendering context. Not `Send`: it is created, used and destroyed on one thread.
///
/// ### 中文
/// GPU 渲染上下文。非 `Send`：在同一线程上创建、使用和销毁。
pub trait RenderContext {
    /// ### English
    /// Uploads one image into a new texture.
    ///
    /// ### 中文
    /// 将一张图像上传到新纹理。
    fn upload_image(&mut self, image: &OsdImage) -> OsdResult<GpuTexture>;

    /// ### English
    /// Frees a texture previously returned by `upload_image`.
    ///
    /// ### 中文
    /// 释放之前由 `upload_image` 返回的纹理。
    fn delete_image(&mut self, texture: GpuTexture);

    fn create_surface(&mut self, desc: &SurfaceDesc) -> OsdResult<SurfaceId>;

    /// ### English
    /// Destroys a surface; unknown ids are ignored.
    ///
    /// ### 中文
    /// 销毁 surface；未知 id 会被忽略。
    fn destroy_surface(&mut self, surface: SurfaceId);

    fn clear_surface(&mut self, surface: SurfaceId) -> OsdResult<()>;

    /// ### English
    /// Composes `texture` (of `size` pixels) onto `surface` at `position`.
    ///
    /// ### 中文
    /// 将 `texture`（尺寸为 `size`）合成到 `surface` 的 `position` 处。
    fn draw_image(
        &mut self,
        surface: SurfaceId,
        texture: GpuTexture,
        size: PhysicalSize<u32>,
        position: PhysicalPosition<i32>,
    ) -> OsdResult<()>;

    fn flush_surface(&mut self, surface: SurfaceId) -> OsdResult<()>;

    /// ### English
    /// Returns whether the context was invalidated (device reset, display loss).
    ///
    /// ### 中文
    /// 返回上下文是否已失效（设备重置、显示丢失）。
    fn is_lost(&self) -> bool;

    /// ### English
    /// Destroys every remaining GPU object and the context itself (idempotent).
    ///
    /// ### 中文
    /// 销毁所有剩余 GPU 对象以及上下文本身（幂等）。
    fn release(&mut self);
}
