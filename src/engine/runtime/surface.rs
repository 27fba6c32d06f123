//! ### English
//! Surface handle returned to the host for one accelerated OSD layer.
//!
//! ### 中文
//! 为单个加速 OSD 图层返回给宿主的 surface 句柄。

use dpi::PhysicalPosition;

use crate::engine::image::ImageHandle;
use crate::engine::rendering::{SurfaceDesc, SurfaceId};

use super::worker::WorkerLink;

/// ### English
/// Host-facing handle of one OSD surface.
///
/// Bound to the worker that created it. Drawing calls are forwarded to that worker's queue;
/// once the worker has stopped (geometry change, context loss, provider teardown) every call
/// returns `false` without touching anything.
///
/// ### 中文
/// 面向宿主的单个 OSD surface 句柄。
///
/// 绑定到创建它的工作线程。绘制调用会转发到该工作线程的队列；
/// 一旦该工作线程停止（尺寸变化、上下文丢失、provider 销毁），所有调用都直接返回 `false`。
pub struct OsdSurfaceHandle {
    id: SurfaceId,
    desc: SurfaceDesc,
    link: WorkerLink,
}

impl OsdSurfaceHandle {
    pub(super) fn new(id: SurfaceId, desc: SurfaceDesc, link: WorkerLink) -> Self {
        Self { id, desc, link }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn desc(&self) -> &SurfaceDesc {
        &self.desc
    }

    /// ### English
    /// Returns whether the bound worker is still active.
    ///
    /// ### 中文
    /// 返回所绑定的工作线程是否仍处于 active 状态。
    pub fn is_usable(&self) -> bool {
        self.link.is_active()
    }

    /// ### English
    /// Clears the surface to fully transparent.
    ///
    /// ### 中文
    /// 将 surface 清为全透明。
    pub fn clear(&self) -> bool {
        self.link.clear_surface(self.id)
    }

    /// ### English
    /// Queues composition of a cached image at `position` (surface coordinates, top-left
    /// origin). Stale handles are ignored by the worker.
    ///
    /// ### 中文
    /// 排队将缓存图像合成到 `position`（surface 坐标，左上角为原点）。
    /// 过期句柄会被工作线程忽略。
    pub fn draw_image(&self, handle: ImageHandle, position: PhysicalPosition<i32>) -> bool {
        if handle.is_none() {
            return false;
        }
        self.link.draw_image(self.id, handle, position)
    }

    /// ### English
    /// Waits until every queued drawing call of this surface was executed and flushed.
    ///
    /// ### 中文
    /// 等待该 surface 所有已排队的绘制调用执行完毕并 flush。
    pub fn flush(&self) -> bool {
        match self.link.flush_surface(self.id) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("OSD flush of {} failed: {err}", self.id);
                false
            }
        }
    }
}

impl Drop for OsdSurfaceHandle {
    /// ### English
    /// Schedules surface destruction on the worker (GL objects must die on the owning thread).
    ///
    /// ### 中文
    /// 在工作线程上安排销毁 surface（GL 对象必须在持有上下文的线程上销毁）。
    fn drop(&mut self) {
        let _ = self.link.destroy_surface(self.id);
    }
}
