/// ### English
/// Engine internal modules (worker thread lifecycle, image cache, rendering seam).
///
/// ### 中文
/// 引擎内部模块（工作线程生命周期、图像缓存、渲染接口）。
pub(crate) mod cache;
pub mod config;
pub mod error;
pub mod image;
pub mod rendering;
pub mod runtime;
pub(crate) mod startup;
