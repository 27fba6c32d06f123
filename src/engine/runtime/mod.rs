//! ### English
//! OSD acceleration runtime: worker lifecycle and the host-facing handles (public API).
//!
//! ### 中文
//! OSD 加速运行时：工作线程生命周期与面向宿主的句柄（对外公开 API）。

mod command;
mod state;
mod worker;
mod worker_thread;

mod provider;
mod surface;

pub use command::CacheStats;
pub use provider::{GpuOsdProvider, HostDevice, OsdProvider};
pub use state::WorkerState;
pub use surface::OsdSurfaceHandle;
