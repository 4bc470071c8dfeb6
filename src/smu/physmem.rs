use crate::error::{TelemetryError, TelemetryResult};
use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::NonNull;

pub const DEFAULT_DEVMEM_PATH: &str = "/dev/mem";

/// A read-only mapping of a physical address window, unmapped on drop.
#[derive(Debug)]
pub struct PhysRegion {
    base: NonNull<libc::c_void>,
    map_len: usize,
    /// Offset of the requested address inside the page-aligned mapping.
    skew: usize,
    len: usize,
}

// The mapping is read-only and owned exclusively by this handle.
unsafe impl Send for PhysRegion {}
unsafe impl Sync for PhysRegion {}

fn page_size() -> u64 {
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret > 0 { ret as u64 } else { 4096 }
}

impl PhysRegion {
    /// Maps `len` bytes at physical `addr` through the memory device at `devmem`.
    ///
    /// # Errors
    /// Returns [`TelemetryError::Map`] if the device cannot be opened or mapped
    /// (typically missing root privileges or `CONFIG_STRICT_DEVMEM`).
    pub fn map(devmem: &Path, addr: u64, len: usize) -> TelemetryResult<Self> {
        let map_err = |source: io::Error| TelemetryError::Map { addr, source };

        if len == 0 {
            return Err(map_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty physical region",
            )));
        }

        let page = page_size();
        let aligned = addr & !(page - 1);
        let skew = (addr - aligned) as usize;
        let map_len = skew + len;

        let file = OpenOptions::new().read(true).open(devmem).map_err(map_err)?;

        let ret = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned as libc::off_t,
            )
        };
        if ret == libc::MAP_FAILED {
            return Err(map_err(io::Error::last_os_error()));
        }
        let base = NonNull::new(ret).ok_or_else(|| map_err(io::Error::other("mmap returned null")))?;

        Ok(Self {
            base,
            map_len,
            skew,
            len,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(self.base.as_ptr().cast::<u8>().add(self.skew), self.len)
        }
    }
}

impl Drop for PhysRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base.as_ptr(), self.map_len);
        }
    }
}
