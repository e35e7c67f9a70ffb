use super::CryptoError;

/// Best‑effort memory locking for derived key bytes.
///
/// On Unix with the `memlock` feature these pin the slice with mlock/munlock for the
/// duration of one encrypt or decrypt. Elsewhere they are no‑ops.
#[inline]
pub fn lock_slice(_data: &mut [u8]) -> Result<(), CryptoError> {
    #[cfg(all(target_family = "unix", feature = "memlock"))]
    {
        // Safety: mlock only reads the pointer and length; the kernel rounds to pages.
        let ptr = _data.as_ptr() as *const core::ffi::c_void;
        let len = _data.len();
        if len == 0 {
            return Ok(());
        }
        let rc = unsafe { libc::mlock(ptr, len) };
        if rc != 0 {
            tracing::debug!("mlock refused for derived key ({len} bytes)");
        }
    }
    Ok(())
}

#[inline]
pub fn unlock_slice(_data: &mut [u8]) -> Result<(), CryptoError> {
    #[cfg(all(target_family = "unix", feature = "memlock"))]
    {
        let ptr = _data.as_ptr() as *const core::ffi::c_void;
        let len = _data.len();
        if len == 0 {
            return Ok(());
        }
        let _ = unsafe { libc::munlock(ptr, len) };
    }
    Ok(())
}
