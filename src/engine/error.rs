//! ### English
//! Error taxonomy for the OSD acceleration layer.
//!
//! Every variant is non-fatal: the provider resolves them to "no acceleration" sentinels
//! (handle `0`, no surface, `false`) before anything reaches the host.
//!
//! ### 中文
//! OSD 加速层的错误分类。
//!
//! 所有错误都不是致命的：provider 会在返回宿主之前将其转换为“无加速”哨兵值
//!（句柄 `0`、无 surface、`false`）。

use std::time::Duration;

use crate::engine::image::ImageHandle;
use crate::engine::rendering::SurfaceId;

/// ### English
/// Errors produced while starting the worker or servicing its requests.
///
/// ### 中文
/// 启动工作线程或处理其请求时产生的错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OsdError {
    /// The host reports the display device as detached/suspended.
    #[error("display device is suspended")]
    DeviceSuspended,

    /// The rendering context could not be created.
    #[error("rendering context could not be created: {0}")]
    StartupFailure(String),

    /// The worker did not report startup in time.
    #[error("worker thread did not report startup within {0:?}")]
    StartupTimeout(Duration),

    /// A single image is larger than the whole cache budget.
    #[error("image of {size} bytes exceeds cache budget of {budget} bytes")]
    BudgetExceeded { size: usize, budget: usize },

    /// The pixel buffer does not match its declared dimensions/stride.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The handle is not (or no longer) present in the cache.
    #[error("unknown image handle {0}")]
    StaleHandle(ImageHandle),

    /// The surface was never created or has already been destroyed.
    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceId),

    /// The rendering context was invalidated underneath the worker.
    #[error("rendering context lost: {0}")]
    ContextLost(String),

    /// The GPU refused an upload or allocation.
    #[error("GPU upload failed: {0}")]
    Upload(String),

    /// No active worker thread is available to service the request.
    #[error("worker thread is not running")]
    WorkerUnavailable,
}

/// ### English
/// Result alias used throughout the engine.
///
/// ### 中文
/// 引擎内通用的 Result 别名。
pub type OsdResult<T> = Result<T, OsdError>;
