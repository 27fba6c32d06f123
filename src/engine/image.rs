//! ### English
//! Image payloads handed in by the host and the opaque handles handed back.
//!
//! ### 中文
//! 宿主传入的图像载荷，以及返回给宿主的不透明句柄。

use std::fmt;

use dpi::PhysicalSize;

use crate::engine::error::{OsdError, OsdResult};

/// ### English
/// Bytes per pixel of host images (32-bit ARGB, `BGRA` byte order in memory).
///
/// ### 中文
/// 宿主图像每像素字节数（32 位 ARGB，内存字节序为 `BGRA`）。
pub const BYTES_PER_PIXEL: usize = 4;

/// ### English
/// Opaque identifier of one cached GPU image. `0` is reserved for "no resource / failure".
///
/// ### 中文
/// 单个已缓存 GPU 图像的不透明标识。`0` 保留表示“无资源 / 失败”。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ImageHandle(u32);

impl ImageHandle {
    /// ### English
    /// The reserved "no resource" handle.
    ///
    /// ### 中文
    /// 保留的“无资源”句柄。
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// ### English
/// One host image: pixel buffer + dimensions + row stride.
///
/// Decoding and pixel format are the host's responsibility; the buffer is taken as 32-bit
/// pixels. `stride` is the distance between rows in bytes and may include padding.
///
/// ### 中文
/// 一张宿主图像：像素缓冲 + 尺寸 + 行跨度。
///
/// 解码与像素格式由宿主负责；缓冲区按 32 位像素解释。`stride` 为相邻两行之间的字节距离，
/// 可以包含填充。
#[derive(Clone, PartialEq, Eq)]
pub struct OsdImage {
    size: PhysicalSize<u32>,
    stride: usize,
    pixels: Vec<u8>,
}

impl OsdImage {
    /// ### English
    /// Creates an image after validating that `pixels` covers `size` rows of `stride` bytes.
    ///
    /// #### Parameters
    /// - `size`: Image size in pixels (both dimensions must be non-zero).
    /// - `stride`: Row pitch in bytes (multiple of 4, at least `width * 4`).
    /// - `pixels`: Pixel buffer; the last row only needs `width * 4` bytes.
    ///
    /// ### 中文
    /// 创建图像，并校验 `pixels` 足以覆盖 `size` 行、每行 `stride` 字节。
    ///
    /// #### 参数
    /// - `size`：像素尺寸（两个维度都必须非 0）。
    /// - `stride`：行跨度（字节，4 的倍数且不小于 `width * 4`）。
    /// - `pixels`：像素缓冲；最后一行只需 `width * 4` 字节。
    pub fn new(size: PhysicalSize<u32>, stride: usize, pixels: Vec<u8>) -> OsdResult<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(OsdError::InvalidImage(format!(
                "empty dimensions {}x{}",
                size.width, size.height
            )));
        }

        let row_bytes = (size.width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(|| OsdError::InvalidImage("row size overflows".to_string()))?;
        if stride < row_bytes || stride % BYTES_PER_PIXEL != 0 {
            return Err(OsdError::InvalidImage(format!(
                "stride {stride} does not fit {} pixels per row",
                size.width
            )));
        }

        let required = stride
            .checked_mul(size.height as usize - 1)
            .and_then(|bytes| bytes.checked_add(row_bytes))
            .ok_or_else(|| OsdError::InvalidImage("image size overflows".to_string()))?;
        if pixels.len() < required {
            return Err(OsdError::InvalidImage(format!(
                "buffer holds {} bytes, {required} required",
                pixels.len()
            )));
        }

        Ok(Self {
            size,
            stride,
            pixels,
        })
    }

    /// ### English
    /// Creates an image whose rows are tightly packed (`stride == width * 4`).
    ///
    /// ### 中文
    /// 创建行紧密排列的图像（`stride == width * 4`）。
    pub fn packed(size: PhysicalSize<u32>, pixels: Vec<u8>) -> OsdResult<Self> {
        Self::new(size, size.width as usize * BYTES_PER_PIXEL, pixels)
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// ### English
    /// Bytes this image occupies once resident on the GPU (`width * height * 4`).
    /// Row padding in the host buffer is not uploaded and therefore not counted.
    ///
    /// ### 中文
    /// 图像驻留 GPU 后占用的字节数（`width * height * 4`）。
    /// 宿主缓冲中的行填充不会上传，因此不计入。
    pub fn byte_size(&self) -> usize {
        self.size.width as usize * self.size.height as usize * BYTES_PER_PIXEL
    }
}

impl fmt::Debug for OsdImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsdImage")
            .field("width", &self.size.width)
            .field("height", &self.size.height)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}
