//! ### English
//! Headless OpenGL rendering context (surfman device/context + glow function loader).
//!
//! The context is made current once on the worker thread right after creation and stays
//! current for its whole life, since no other context ever lives on that thread.
//!
//! Context-loss detection is best-effort: surfman cannot request a robust context (no reset
//! notification strategy), so `GL_CONTEXT_LOST` is only seen on drivers that report it through
//! `glGetError` anyway.
//!
//! ### 中文
//! 无头 OpenGL 渲染上下文（surfman device/context + glow 函数加载器）。
//!
//! 上下文在工作线程上创建后立即 make current，并在整个生命周期内保持 current，
//! 因为该线程上不会存在其它上下文。
//!
//! 上下文丢失检测是尽力而为的：surfman 无法请求 robust 上下文（没有 reset 通知策略），
//! 因此只有驱动仍通过 `glGetError` 报告 `GL_CONTEXT_LOST` 时才能检测到。

use std::collections::HashMap;

use dpi::{PhysicalPosition, PhysicalSize};
use glow::HasContext as _;
use surfman::{Connection, ContextAttributeFlags, ContextAttributes, GLVersion};

use crate::engine::error::{OsdError, OsdResult};
use crate::engine::image::{BYTES_PER_PIXEL, OsdImage};

use super::{GpuTexture, RenderBackend, RenderContext, SurfaceDesc, SurfaceId};

/// ### English
/// `GL_CONTEXT_LOST` (KHR_robustness / GL 4.5).
///
/// ### 中文
/// `GL_CONTEXT_LOST`（KHR_robustness / GL 4.5）。
const GL_CONTEXT_LOST: u32 = 0x0507;

/// ### English
/// Backend that creates a headless OpenGL 3.0 context through surfman.
///
/// ### 中文
/// 通过 surfman 创建无头 OpenGL 3.0 上下文的后端。
#[derive(Debug, Default, Clone, Copy)]
pub struct SurfmanBackend;

impl SurfmanBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for SurfmanBackend {
    fn create_context(&self) -> OsdResult<Box<dyn RenderContext>> {
        Ok(Box::new(GlRenderContext::new()?))
    }
}

/// ### English
/// Per-surface GL resources: an FBO with one color texture sized to the display.
///
/// ### 中文
/// 每个 surface 的 GL 资源：一个 FBO 及其按显示尺寸分配的颜色纹理。
struct GlSurface {
    framebuffer: glow::Framebuffer,
    texture: glow::Texture,
    size: PhysicalSize<u32>,
}

/// ### English
/// Owns the surfman device/context and the glow function table.
///
/// ### 中文
/// 持有 surfman device/context 以及 glow 函数表。
struct GlRenderContext {
    device: surfman::Device,
    context: surfman::Context,
    gl: glow::Context,
    /// ### English
    /// Scratch FBO used as blit source when composing cached images.
    ///
    /// ### 中文
    /// 合成缓存图像时用作 blit 源的临时 FBO。
    read_framebuffer: glow::Framebuffer,
    surfaces: HashMap<SurfaceId, GlSurface>,
    next_surface_id: u32,
    lost: bool,
    released: bool,
}

/// ### English
/// Converts a pixel extent to a GL coordinate, clamping at `i32::MAX`.
///
/// ### 中文
/// 将像素尺寸转换为 GL 坐标，超过 `i32::MAX` 时截断。
fn gl_extent(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// ### English
/// Blit destination `[x0, y0, x1, y1]` for an image of `size` placed at `position`
/// (top-left origin) on a surface `surface_height` pixels tall. GL framebuffers are
/// bottom-left based, so the rectangle is flipped vertically (`y0 > y1`).
///
/// ### 中文
/// 将 `size` 大小的图像放在 `position`（左上角为原点）时，在高度为 `surface_height` 的
/// surface 上的 blit 目标矩形 `[x0, y0, x1, y1]`。GL framebuffer 以左下角为原点，
/// 因此矩形在垂直方向翻转（`y0 > y1`）。
fn blit_destination(
    surface_height: u32,
    size: PhysicalSize<u32>,
    position: PhysicalPosition<i32>,
) -> [i32; 4] {
    let top = gl_extent(surface_height).saturating_sub(position.y);
    let bottom = top.saturating_sub(gl_extent(size.height));
    let right = position.x.saturating_add(gl_extent(size.width));
    [position.x, top, right, bottom]
}

fn startup_error(what: &str, err: impl std::fmt::Debug) -> OsdError {
    OsdError::StartupFailure(format!("{what}: {err:?}"))
}

impl GlRenderContext {
    /// ### English
    /// Creates the device and context and makes the context current on the calling thread.
    /// Must be called from the worker thread.
    ///
    /// ### 中文
    /// 创建 device 与上下文，并使上下文在调用线程上 current。
    /// 必须在工作线程中调用。
    fn new() -> OsdResult<Self> {
        let connection =
            Connection::new().map_err(|err| startup_error("Failed to create surfman Connection", err))?;
        let adapter = connection
            .create_adapter()
            .map_err(|err| startup_error("Failed to create surfman Adapter", err))?;
        let device = connection
            .create_device(&adapter)
            .map_err(|err| startup_error("Failed to create surfman Device", err))?;

        let attributes = ContextAttributes {
            version: GLVersion::new(3, 0),
            flags: ContextAttributeFlags::ALPHA,
        };
        let descriptor = device
            .create_context_descriptor(&attributes)
            .map_err(|err| startup_error("Failed to create context descriptor", err))?;
        let mut context = device
            .create_context(&descriptor, None)
            .map_err(|err| startup_error("Failed to create GL context", err))?;

        if let Err(err) = device.make_context_current(&context) {
            let _ = device.destroy_context(&mut context);
            return Err(startup_error("Failed to make GL context current", err));
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|name| device.get_proc_address(&context, name))
        };

        let read_framebuffer = match unsafe { gl.create_framebuffer() } {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                let _ = device.make_no_context_current();
                let _ = device.destroy_context(&mut context);
                return Err(OsdError::StartupFailure(err));
            }
        };

        Ok(Self {
            device,
            context,
            gl,
            read_framebuffer,
            surfaces: HashMap::new(),
            next_surface_id: 1,
            lost: false,
            released: false,
        })
    }

    /// ### English
    /// Drains the GL error queue; records context loss and maps errors to `OsdError`.
    ///
    /// ### 中文
    /// 清空 GL 错误队列；记录上下文丢失，并将错误映射为 `OsdError`。
    fn check_error(&mut self, what: &str) -> OsdResult<()> {
        let mut first = glow::NO_ERROR;
        loop {
            let error = unsafe { self.gl.get_error() };
            if error == glow::NO_ERROR {
                break;
            }
            if error == GL_CONTEXT_LOST {
                self.lost = true;
                return Err(OsdError::ContextLost(format!("{what}: GL_CONTEXT_LOST")));
            }
            if first == glow::NO_ERROR {
                first = error;
            }
        }

        if first == glow::NO_ERROR {
            Ok(())
        } else {
            Err(OsdError::Upload(format!("{what}: GL error 0x{first:04x}")))
        }
    }

    fn surface(&self, surface: SurfaceId) -> OsdResult<&GlSurface> {
        self.surfaces
            .get(&surface)
            .ok_or(OsdError::UnknownSurface(surface))
    }

    unsafe fn set_default_tex_params(gl: &glow::Context) {
        unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    fn delete_surface_resources(gl: &glow::Context, surface: GlSurface) {
        unsafe {
            gl.delete_framebuffer(surface.framebuffer);
            gl.delete_texture(surface.texture);
        }
    }
}

impl RenderContext for GlRenderContext {
    fn upload_image(&mut self, image: &OsdImage) -> OsdResult<GpuTexture> {
        let size = image.size();
        let texture = unsafe { self.gl.create_texture() }.map_err(OsdError::Upload)?;
        let gl = &self.gl;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            gl.pixel_store_i32(
                glow::UNPACK_ROW_LENGTH,
                (image.stride() / BYTES_PER_PIXEL) as i32,
            );
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                size.width as i32,
                size.height as i32,
                0,
                glow::BGRA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(image.pixels())),
            );
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            Self::set_default_tex_params(gl);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        if let Err(err) = self.check_error("upload image") {
            unsafe { self.gl.delete_texture(texture) };
            return Err(err);
        }
        Ok(GpuTexture::new(texture.0))
    }

    fn delete_image(&mut self, texture: GpuTexture) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.get())) };
    }

    fn create_surface(&mut self, desc: &SurfaceDesc) -> OsdResult<SurfaceId> {
        let size = desc.size;
        let gl = &self.gl;
        let texture = unsafe { gl.create_texture() }.map_err(OsdError::Upload)?;
        let framebuffer = match unsafe { gl.create_framebuffer() } {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                unsafe { gl.delete_texture(texture) };
                return Err(OsdError::Upload(err));
            }
        };

        let status = unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                size.width as i32,
                size.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            Self::set_default_tex_params(gl);
            gl.bind_texture(glow::TEXTURE_2D, None);

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            status
        };

        let surface = GlSurface {
            framebuffer,
            texture,
            size,
        };
        if status != glow::FRAMEBUFFER_COMPLETE {
            Self::delete_surface_resources(&self.gl, surface);
            return Err(OsdError::Upload(format!(
                "surface framebuffer incomplete: 0x{status:04x}"
            )));
        }
        if let Err(err) = self.check_error("create surface") {
            Self::delete_surface_resources(&self.gl, surface);
            return Err(err);
        }

        let id = SurfaceId::new(self.next_surface_id);
        self.next_surface_id = self.next_surface_id.wrapping_add(1).max(1);
        self.surfaces.insert(id, surface);
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        if let Some(surface) = self.surfaces.remove(&surface) {
            Self::delete_surface_resources(&self.gl, surface);
        }
    }

    fn clear_surface(&mut self, surface: SurfaceId) -> OsdResult<()> {
        let framebuffer = self.surface(surface)?.framebuffer;
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        self.check_error("clear surface")
    }

    fn draw_image(
        &mut self,
        surface: SurfaceId,
        texture: GpuTexture,
        size: PhysicalSize<u32>,
        position: PhysicalPosition<i32>,
    ) -> OsdResult<()> {
        let target = self.surface(surface)?;
        let draw_framebuffer = target.framebuffer;
        let (width, height) = (gl_extent(size.width), gl_extent(size.height));
        let [dst_left, dst_top, dst_right, dst_bottom] =
            blit_destination(target.size.height, size, position);

        unsafe {
            let gl = &self.gl;
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.read_framebuffer));
            gl.framebuffer_texture_2d(
                glow::READ_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(glow::NativeTexture(texture.get())),
                0,
            );
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(draw_framebuffer));
            gl.blit_framebuffer(
                0,
                0,
                width,
                height,
                dst_left,
                dst_top,
                dst_right,
                dst_bottom,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
            gl.framebuffer_texture_2d(
                glow::READ_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                None,
                0,
            );
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        }
        self.check_error("draw image")
    }

    fn flush_surface(&mut self, surface: SurfaceId) -> OsdResult<()> {
        self.surface(surface)?;
        unsafe { self.gl.flush() };
        self.check_error("flush surface")
    }

    fn is_lost(&self) -> bool {
        self.lost
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for (_, surface) in self.surfaces.drain() {
            Self::delete_surface_resources(&self.gl, surface);
        }
        unsafe { self.gl.delete_framebuffer(self.read_framebuffer) };

        let _ = self.device.make_no_context_current();
        if let Err(err) = self.device.destroy_context(&mut self.context) {
            log::warn!("failed to destroy GL context: {err:?}");
        }
    }
}

impl Drop for GlRenderContext {
    fn drop(&mut self) {
        self.release();
    }
}
