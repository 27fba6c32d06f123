//! ### English
//! Handle → GPU image bookkeeping with a byte budget and FIFO eviction.
//!
//! Not thread-safe on purpose: only the worker thread touches it. The cache never talks to the
//! GPU itself; evicted/removed entries are handed back so the worker can free their textures
//! on the rendering context.
//!
//! ### 中文
//! 句柄 → GPU 图像的簿记，带字节预算与 FIFO 淘汰。
//!
//! 刻意不做线程安全：只有工作线程会访问它。缓存本身不访问 GPU；
//! 被淘汰/移除的条目会交还给工作线程，由其在渲染上下文上释放纹理。

use std::hash::{BuildHasherDefault, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dpi::PhysicalSize;
use hashlink::LinkedHashMap;

use crate::engine::error::{OsdError, OsdResult};
use crate::engine::image::ImageHandle;
use crate::engine::rendering::GpuTexture;

/// ### English
/// Identity hasher for `ImageHandle` keys (handles are already unique small integers).
///
/// ### 中文
/// `ImageHandle` key 的恒等哈希（句柄本身就是唯一的小整数）。
#[derive(Default)]
pub(crate) struct HandleHasher(u64);

impl Hasher for HandleHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = (self.0 << 8) | u64::from(byte);
        }
    }

    fn write_u32(&mut self, i: u32) {
        self.0 = u64::from(i);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

type HandleMap<V> = LinkedHashMap<ImageHandle, V, BuildHasherDefault<HandleHasher>>;

/// ### English
/// Provider-wide handle sequence shared by successive worker instances.
///
/// Sharing it means a handle issued by a torn-down worker can never alias an entry of the next
/// worker; `0` is skipped on wrap-around.
///
/// ### 中文
/// 由先后多个工作线程实例共享的、provider 级别的句柄序列。
///
/// 共享序列保证已销毁工作线程发出的句柄不会与下一个工作线程的条目重名；回绕时跳过 `0`。
#[derive(Clone, Default)]
pub(crate) struct HandleSequence(Arc<AtomicU32>);

impl HandleSequence {
    fn next(&self) -> ImageHandle {
        loop {
            let raw = self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if raw != 0 {
                return ImageHandle::new(raw);
            }
        }
    }
}

/// ### English
/// One GPU-resident image.
///
/// ### 中文
/// 一张驻留在 GPU 上的图像。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CachedImage {
    pub(crate) handle: ImageHandle,
    pub(crate) bytes: usize,
    pub(crate) size: PhysicalSize<u32>,
    pub(crate) texture: GpuTexture,
}

pub(crate) struct ImageCache {
    /// ### English
    /// Entries in insertion order (front = oldest = next eviction victim).
    ///
    /// ### 中文
    /// 按插入顺序排列的条目（队首 = 最旧 = 下一个淘汰对象）。
    entries: HandleMap<CachedImage>,
    total_bytes: usize,
    budget: usize,
    handles: HandleSequence,
}

impl ImageCache {
    pub(crate) fn new(budget: usize, handles: HandleSequence) -> Self {
        Self {
            entries: HandleMap::default(),
            total_bytes: 0,
            budget,
            handles,
        }
    }

    pub(crate) fn budget(&self) -> usize {
        self.budget
    }

    pub(crate) fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, handle: ImageHandle) -> Option<&CachedImage> {
        self.entries.get(&handle)
    }

    /// ### English
    /// Makes room for an image of `bytes` by evicting oldest entries first, until the image
    /// fits or the cache is empty.
    ///
    /// Returns the evicted entries; the caller must free their textures. An image larger than
    /// the whole budget empties the cache; `check_fits` then rejects it.
    ///
    /// ### 中文
    /// 为 `bytes` 大小的图像腾出空间，优先淘汰最旧的条目，直到能放下或缓存为空。
    ///
    /// 返回被淘汰的条目；调用方负责释放其纹理。超过整个预算的图像会清空缓存，
    /// 随后由 `check_fits` 拒绝。
    pub(crate) fn reserve(&mut self, bytes: usize) -> Vec<CachedImage> {
        self.evict_until(self.budget.saturating_sub(bytes))
    }

    /// ### English
    /// Whether an image of `bytes` fits next to the current entries.
    ///
    /// ### 中文
    /// 当前条目之外能否再放下 `bytes` 大小的图像。
    pub(crate) fn check_fits(&self, bytes: usize) -> OsdResult<()> {
        match self.total_bytes.checked_add(bytes) {
            Some(total) if total <= self.budget => Ok(()),
            _ => Err(OsdError::BudgetExceeded {
                size: bytes,
                budget: self.budget,
            }),
        }
    }

    /// ### English
    /// Inserts an uploaded image and returns its fresh handle.
    /// Call `reserve` and `check_fits` first; the budget is not re-checked here.
    ///
    /// ### 中文
    /// 插入已上传的图像并返回新句柄。
    /// 需先调用 `reserve` 与 `check_fits`；此处不再检查预算。
    pub(crate) fn insert(
        &mut self,
        bytes: usize,
        size: PhysicalSize<u32>,
        texture: GpuTexture,
    ) -> ImageHandle {
        debug_assert!(self.total_bytes + bytes <= self.budget);

        let mut handle = self.handles.next();
        while self.entries.contains_key(&handle) {
            handle = self.handles.next();
        }

        self.entries.insert(
            handle,
            CachedImage {
                handle,
                bytes,
                size,
                texture,
            },
        );
        self.total_bytes += bytes;
        handle
    }

    pub(crate) fn remove(&mut self, handle: ImageHandle) -> Option<CachedImage> {
        let entry = self.entries.remove(&handle)?;
        self.total_bytes -= entry.bytes;
        Some(entry)
    }

    /// ### English
    /// Applies a new budget, evicting oldest entries until the cache fits.
    ///
    /// ### 中文
    /// 应用新预算，淘汰最旧的条目直到缓存满足预算。
    pub(crate) fn set_budget(&mut self, budget: usize) -> Vec<CachedImage> {
        self.budget = budget;
        self.evict_until(budget)
    }

    /// ### English
    /// Removes every entry (worker teardown).
    ///
    /// ### 中文
    /// 移除所有条目（工作线程销毁时）。
    pub(crate) fn clear(&mut self) -> Vec<CachedImage> {
        self.evict_until(0)
    }

    fn evict_until(&mut self, limit: usize) -> Vec<CachedImage> {
        let mut evicted = Vec::new();
        while self.total_bytes > limit {
            let Some((_, entry)) = self.entries.pop_front() else {
                break;
            };
            self.total_bytes -= entry.bytes;
            evicted.push(entry);
        }
        evicted
    }
}
