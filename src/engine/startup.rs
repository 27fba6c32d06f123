//! ### English
//! One-shot startup handshake between the starting caller and a freshly spawned worker.
//!
//! The worker owns a `StartupSignal` and consumes it exactly once after its rendering context
//! was created (or failed to be). If the worker dies before signaling, the dropped sender is
//! observed by the waiter as a startup failure.
//!
//! ### 中文
//! 发起启动的调用方与新建工作线程之间的一次性启动握手。
//!
//! 工作线程持有 `StartupSignal`，在渲染上下文创建成功（或失败）后将其消费一次。
//! 若工作线程在发出信号前退出，等待方会通过 sender 被 drop 观察到启动失败。

use std::time::Duration;

use crossbeam_channel as channel;

use crate::engine::error::{OsdError, OsdResult};

/// ### English
/// Worker side of the handshake.
///
/// ### 中文
/// 握手的工作线程一侧。
pub(crate) struct StartupSignal {
    tx: channel::Sender<OsdResult<()>>,
}

/// ### English
/// Caller side of the handshake.
///
/// ### 中文
/// 握手的调用方一侧。
pub(crate) struct StartupWaiter {
    rx: channel::Receiver<OsdResult<()>>,
}

/// ### English
/// Creates a fresh signal/waiter pair (one per worker instance).
///
/// ### 中文
/// 创建一对新的 signal/waiter（每个工作线程实例一对）。
pub(crate) fn startup_signal() -> (StartupSignal, StartupWaiter) {
    let (tx, rx) = channel::bounded(1);
    (StartupSignal { tx }, StartupWaiter { rx })
}

impl StartupSignal {
    /// ### English
    /// Reports the startup outcome. Consumes the signal, so it can fire only once.
    ///
    /// ### 中文
    /// 报告启动结果。该方法消费 signal，因此只能触发一次。
    pub(crate) fn notify(self, result: OsdResult<()>) {
        // Capacity 1 and a single send: never blocks. A gone waiter is fine.
        let _ = self.tx.send(result);
    }
}

impl StartupWaiter {
    /// ### English
    /// Blocks until the worker reports, the worker dies, or `timeout` expires.
    ///
    /// ### 中文
    /// 阻塞直到工作线程报告结果、工作线程退出，或 `timeout` 到期。
    pub(crate) fn wait(self, timeout: Duration) -> OsdResult<()> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(channel::RecvTimeoutError::Timeout) => Err(OsdError::StartupTimeout(timeout)),
            Err(channel::RecvTimeoutError::Disconnected) => Err(OsdError::StartupFailure(
                "worker exited before reporting startup".to_string(),
            )),
        }
    }
}
