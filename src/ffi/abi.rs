#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn gpu_osd_abi_version() -> u32 {
    super::GPU_OSD_ABI_VERSION
}
