//! ### English
//! Internal command protocol between caller threads and the dedicated worker thread.
//!
//! ### 中文
//! 调用方线程与独立工作线程之间的内部命令协议。

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crossbeam_channel as channel;
use dpi::PhysicalPosition;

use crate::engine::config::ImageCacheBudget;
use crate::engine::error::OsdResult;
use crate::engine::image::{ImageHandle, OsdImage};
use crate::engine::rendering::{SurfaceDesc, SurfaceId};

/// ### English
/// Snapshot of the worker's image cache.
///
/// ### 中文
/// 工作线程图像缓存的快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub budget: usize,
}

const PENDING: u8 = 0;
const DELIVERED: u8 = 1;
const ABANDONED: u8 = 2;

/// ### English
/// Creates a one-shot reply pair for a synchronous request.
///
/// Whoever claims the reply first wins: the worker (delivered) or a caller that stopped
/// waiting (abandoned). A worker that loses gets its value back and must undo the work.
///
/// ### 中文
/// 为同步请求创建一次性应答对。
///
/// 先声明者获胜：工作线程（已交付）或放弃等待的调用方（已放弃）。
/// 失败的工作线程会拿回结果，并负责撤销已完成的工作。
pub(super) fn reply_channel<T>() -> (Reply<T>, ReplyWaiter<T>) {
    let (tx, rx) = channel::bounded(1);
    let claim = Arc::new(AtomicU8::new(PENDING));
    (
        Reply {
            tx,
            claim: claim.clone(),
        },
        ReplyWaiter { rx, claim },
    )
}

/// ### English
/// Worker side of a synchronous request.
///
/// ### 中文
/// 同步请求的工作线程端。
pub(super) struct Reply<T> {
    tx: channel::Sender<T>,
    claim: Arc<AtomicU8>,
}

impl<T> Reply<T> {
    /// ### English
    /// Delivers `value`, or returns it if the caller already gave up.
    ///
    /// ### 中文
    /// 交付 `value`；若调用方已放弃等待则原样返回。
    pub(super) fn send(self, value: T) -> Result<(), T> {
        if self
            .claim
            .compare_exchange(PENDING, DELIVERED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(value);
        }
        // The waiter cannot abandon once delivery is claimed, so it is still listening.
        let _ = self.tx.send(value);
        Ok(())
    }
}

/// ### English
/// Caller side of a synchronous request.
///
/// ### 中文
/// 同步请求的调用方端。
pub(super) struct ReplyWaiter<T> {
    rx: channel::Receiver<T>,
    claim: Arc<AtomicU8>,
}

impl<T> ReplyWaiter<T> {
    /// ### English
    /// Waits up to `timeout`. On expiry the reply is abandoned unless the worker already
    /// claimed delivery, in which case the value is taken anyway.
    ///
    /// ### 中文
    /// 最多等待 `timeout`。超时后放弃该应答；若工作线程已声明交付，则仍会取走结果。
    pub(super) fn wait(self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(channel::RecvTimeoutError::Disconnected) => None,
            Err(channel::RecvTimeoutError::Timeout) => {
                if self
                    .claim
                    .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    None
                } else {
                    self.rx.recv().ok()
                }
            }
        }
    }
}

/// ### English
/// Commands sent from caller threads to the worker thread, serviced strictly in order.
///
/// ### 中文
/// 从调用方线程发送到工作线程的命令，严格按顺序处理。
pub(super) enum Command {
    /// ### English
    /// Uploads one image and caches it.
    ///
    /// ### 中文
    /// 上传一张图像并缓存。
    StoreImage {
        image: OsdImage,
        /// ### English
        /// One-shot response carrying the new handle or the rejection.
        ///
        /// ### 中文
        /// 一次性响应：携带新句柄或拒绝原因。
        response: Reply<OsdResult<ImageHandle>>,
    },
    /// ### English
    /// Drops one cached image (unknown handles are ignored).
    ///
    /// ### 中文
    /// 丢弃一张缓存图像（未知句柄会被忽略）。
    DropImage { handle: ImageHandle },
    /// ### English
    /// Applies a new cache budget (evicting if the cache no longer fits).
    ///
    /// ### 中文
    /// 应用新的缓存预算（若缓存超出则执行淘汰）。
    SetCacheBudget { budget: ImageCacheBudget },
    QueryStats {
        response: Reply<CacheStats>,
    },
    CreateSurface {
        desc: SurfaceDesc,
        response: Reply<OsdResult<SurfaceId>>,
    },
    DestroySurface { id: SurfaceId },
    ClearSurface { id: SurfaceId },
    /// ### English
    /// Composes a cached image onto a surface.
    ///
    /// ### 中文
    /// 将一张缓存图像合成到 surface 上。
    DrawImage {
        id: SurfaceId,
        handle: ImageHandle,
        position: PhysicalPosition<i32>,
    },
    FlushSurface {
        id: SurfaceId,
        response: Reply<OsdResult<()>>,
    },
    /// ### English
    /// Releases every cached image, every surface and the context, then exits.
    ///
    /// ### 中文
    /// 释放所有缓存图像、所有 surface 以及上下文，然后退出。
    Shutdown,
}
