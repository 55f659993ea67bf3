// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! POSIX shared memory segment management.
//!
//! Safe wrappers around `shm_open`, `ftruncate` and `mmap` for creating
//! and mapping the segments the notification state lives in.
//!
//! # Segment Lifecycle
//!
//! 1. The creating side calls [`ShmSegment::create`]
//! 2. Attaching processes call [`ShmSegment::open`]
//! 3. The mapping is removed on drop
//! 4. The creator calls [`ShmSegment::unlink`] on cleanup

use super::{Result, ShmError};
use std::ffi::CString;
use std::io;
use std::ptr;

/// A named POSIX shared memory segment, mapped into this process.
///
/// Unmaps the region on drop. Does NOT unlink the name - removing the
/// segment from the namespace is the creator's responsibility.
pub struct ShmSegment {
    /// Pointer to mapped memory region
    ptr: *mut u8,
    /// Size of the mapping
    size: usize,
    /// Segment name (for unlink)
    name: String,
}

// SAFETY: the mapping is MAP_SHARED memory designed for concurrent
// access from multiple threads and processes; everything placed in it by
// this crate synchronizes through atomics.
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Create a new shared memory segment, replacing any existing one
    /// with the same name. The region is zero-initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or creation/mapping fails.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        Self::validate_name(name)?;

        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string. shm_unlink on
        // a missing name simply fails, which we ignore; shm_open with
        // O_CREAT|O_EXCL|O_RDWR and mode 0600 returns a valid fd or -1.
        let fd = unsafe {
            // Remove a leftover segment first (ignore errors)
            libc::shm_unlink(c_name.as_ptr());

            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600, // Owner read/write only
            )
        };

        if fd < 0 {
            return Err(ShmError::SegmentCreate(io::Error::last_os_error()));
        }

        // SAFETY: fd is the valid descriptor obtained above; ftruncate
        // fails gracefully on an out-of-range size.
        let ret = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is valid and not reused after this error path.
            unsafe { libc::close(fd) };
            return Err(ShmError::SegmentCreate(err));
        }

        let ptr = Self::map(fd, size);

        // SAFETY: fd is valid; the mapping (if any) holds its own
        // reference to the segment, so the descriptor can be closed.
        unsafe { libc::close(fd) };

        let ptr = ptr?;

        // SAFETY: ptr spans exactly `size` writable bytes from the
        // successful mapping and no other reference exists yet.
        unsafe {
            ptr::write_bytes(ptr, 0, size);
        }

        log::debug!("[shm] created segment {name} ({size} bytes)");

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    /// Open an existing shared memory segment.
    ///
    /// `size` is the expected mapping size and must not exceed the
    /// actual segment size.
    ///
    /// # Errors
    ///
    /// Returns [`ShmError::NotFound`] if no segment with this name
    /// exists, or another error if mapping fails.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        Self::validate_name(name)?;

        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string; O_RDWR opens
        // an existing segment, mode is ignored without O_CREAT.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(ShmError::NotFound(name.to_string()));
            }
            return Err(ShmError::SegmentOpen(err));
        }

        let ptr = Self::map(fd, size);

        // SAFETY: fd is valid; the mapping keeps the segment alive.
        unsafe { libc::close(fd) };

        let ptr = ptr?;

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    /// Map `size` bytes of `fd` as a shared read-write region.
    fn map(fd: libc::c_int, size: usize) -> Result<*mut u8> {
        // SAFETY: null hint lets the kernel pick the address; fd is a
        // valid descriptor supplied by the caller; MAP_SHARED with
        // PROT_READ|PROT_WRITE is the visibility other processes need.
        // MAP_FAILED is checked below.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(ShmError::Mmap(io::Error::last_os_error()));
        }

        Ok(ptr.cast::<u8>())
    }

    /// Validate segment name follows POSIX rules
    fn validate_name(name: &str) -> Result<()> {
        if !name.starts_with('/') {
            return Err(ShmError::InvalidName(format!(
                "Segment name must start with '/': {name}"
            )));
        }
        if name.len() > 1 && name[1..].contains('/') {
            return Err(ShmError::InvalidName(format!(
                "Segment name cannot contain '/' after prefix: {name}"
            )));
        }
        if name.len() > 255 {
            return Err(ShmError::InvalidName(format!(
                "Segment name too long (max 255): {name}"
            )));
        }
        Ok(())
    }

    /// Unlink (delete) a shared memory segment by name.
    ///
    /// The segment disappears once every process unmaps it. Idempotent:
    /// a missing segment is not an error.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string; shm_unlink
        // only touches the filesystem namespace.
        let ret = unsafe { libc::shm_unlink(c_name.as_ptr()) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(ShmError::SegmentOpen(err));
            }
        }

        log::debug!("[shm] unlinked segment {name}");

        Ok(())
    }

    /// Get raw pointer to the mapped memory
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Get the size of the mapping
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the segment name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a segment with the given name exists
    #[must_use]
    pub fn exists(name: &str) -> bool {
        let Ok(c_name) = CString::new(name) else {
            return false;
        };

        // SAFETY: c_name is a valid NUL-terminated string; O_RDONLY
        // probes for existence without modifying anything.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };

        if fd >= 0 {
            // SAFETY: fd is valid and not used after this close.
            unsafe { libc::close(fd) };
            true
        } else {
            false
        }
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly what mmap returned in create() or
        // open(), and Drop runs once. The name is not unlinked here; the
        // creator owns namespace cleanup.
        unsafe {
            libc::munmap(self.ptr.cast::<libc::c_void>(), self.size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("/zipc_test_{tag}_{ts}")
    }

    #[test]
    fn test_validate_name_valid() {
        assert!(ShmSegment::validate_name("/foo").is_ok());
        assert!(ShmSegment::validate_name("/zipc_cond_d0_events").is_ok());
    }

    #[test]
    fn test_validate_name_no_leading_slash() {
        assert!(ShmSegment::validate_name("foo").is_err());
    }

    #[test]
    fn test_validate_name_embedded_slash() {
        assert!(ShmSegment::validate_name("/foo/bar").is_err());
    }

    #[test]
    fn test_create_and_open_share_content() {
        let name = unique_name("seg");
        let size = 4096;

        let seg1 = ShmSegment::create(&name, size).expect("create failed");
        assert_eq!(seg1.size(), size);

        // SAFETY: seg1 spans 4096 bytes, offsets 0 and 1 are in bounds.
        unsafe {
            *seg1.as_ptr() = 0x42;
            *seg1.as_ptr().add(1) = 0x43;
        }

        // Open the same segment as a second mapping
        let seg2 = ShmSegment::open(&name, size).expect("open failed");

        // SAFETY: seg2 maps the same segment; both offsets were written
        // through seg1 above.
        unsafe {
            assert_eq!(*seg2.as_ptr(), 0x42);
            assert_eq!(*seg2.as_ptr().add(1), 0x43);
        }

        drop(seg1);
        drop(seg2);
        ShmSegment::unlink(&name).ok();
    }

    #[test]
    fn test_open_nonexistent() {
        let result = ShmSegment::open("/zipc_nonexistent_12345", 4096);
        assert!(matches!(result, Err(ShmError::NotFound(_))));
    }

    #[test]
    fn test_exists() {
        let name = unique_name("exists");

        assert!(!ShmSegment::exists(&name));

        let _seg = ShmSegment::create(&name, 4096).expect("create failed");
        assert!(ShmSegment::exists(&name));

        ShmSegment::unlink(&name).ok();
    }

    #[test]
    fn test_unlink_idempotent() {
        let name = unique_name("unlink");

        let _seg = ShmSegment::create(&name, 4096).expect("create failed");
        assert!(ShmSegment::unlink(&name).is_ok());

        // Second unlink must also succeed
        assert!(ShmSegment::unlink(&name).is_ok());
    }

    #[test]
    fn test_create_zero_initializes() {
        let name = unique_name("zero");

        let seg = ShmSegment::create(&name, 4096).expect("create failed");
        // SAFETY: offsets are within the 4096-byte mapping.
        unsafe {
            assert_eq!(*seg.as_ptr(), 0);
            assert_eq!(*seg.as_ptr().add(4095), 0);
        }

        ShmSegment::unlink(&name).ok();
    }
}
