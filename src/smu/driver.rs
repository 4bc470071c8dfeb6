use super::codename::Codename;
use crate::decode::dram::SmnReader;
use crate::error::{TelemetryError, TelemetryResult};
use crate::utils::{floats_from_le_bytes, read_u32_le};
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_SMU_PATH: &str = "/sys/kernel/ryzen_smu_drv";

/// A handle to the `ryzen_smu` kernel driver's sysfs interface.
///
/// The SMN file is held open behind an `Arc`, so the handle is cheap to clone.
/// An SMN read is an address write followed by a value read on that one file, so
/// the pair runs under the lock and clones on other threads cannot interleave.
#[derive(Clone, Debug)]
pub struct SmuDriver {
    root: PathBuf,
    smn: Option<Arc<Mutex<File>>>,
}

impl SmuDriver {
    /// Opens the driver interface rooted at `root`.
    ///
    /// # Errors
    /// Returns [`TelemetryError::DriverNotLoaded`] if `root/version` does not exist.
    pub fn open(root: impl AsRef<Path>) -> TelemetryResult<Self> {
        let root = root.as_ref().to_path_buf();
        let version = root.join("version");
        if !version.exists() {
            return Err(TelemetryError::DriverNotLoaded(version));
        }

        let smn = match OpenOptions::new().read(true).write(true).open(root.join("smn")) {
            Ok(file) => Some(Arc::new(Mutex::new(file))),
            Err(e) => {
                debug!("SMN interface unavailable under {}: {e}", root.display());
                None
            }
        };

        Ok(Self { root, smn })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_string(&self, name: &str) -> io::Result<String> {
        Ok(fs::read_to_string(self.root.join(name))?.trim().to_string())
    }

    /// SMU firmware version string.
    pub fn version(&self) -> io::Result<String> {
        self.read_string("version")
    }

    /// Silicon codename; unreadable or unparsable values are [`Codename::Unknown`].
    #[must_use]
    pub fn codename(&self) -> Codename {
        self.read_string("codename")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .map_or(Codename::Unknown, Codename::from_index)
    }

    /// PM table layout version, 0 when unavailable.
    #[must_use]
    pub fn pm_table_version(&self) -> u32 {
        fs::read(self.root.join("pm_table_version"))
            .ok()
            .and_then(|b| read_u32_le(&b, 0))
            .unwrap_or(0)
    }

    /// Current PM table snapshot as little-endian floats.
    pub fn pm_table(&self) -> io::Result<Vec<f32>> {
        let raw = fs::read(self.root.join("pm_table"))?;
        Ok(floats_from_le_bytes(&raw))
    }

    /// Reads one SMN register: the address is written to `smn`, then the value is read back.
    pub fn read_register(&self, address: u32) -> io::Result<u32> {
        let smn = self
            .smn
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "SMN interface not available"))?;
        let file = smn.lock().unwrap_or_else(PoisonError::into_inner);

        let mut buf = [0u8; 4];
        unsafe {
            pwrite_exact(&file, &address.to_le_bytes())?;
            pread_exact(&file, &mut buf)?;
        }
        Ok(u32::from_le_bytes(buf))
    }
}

/// Positional write at offset 0.
///
/// # Safety
/// `file` must be an open, writable descriptor.
unsafe fn pwrite_exact(file: &File, buf: &[u8]) -> io::Result<()> {
    let ret = unsafe { libc::pwrite(file.as_raw_fd(), buf.as_ptr().cast(), buf.len(), 0) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    if ret as usize != buf.len() {
        return Err(io::Error::new(io::ErrorKind::WriteZero, "short SMN address write"));
    }
    Ok(())
}

/// Positional read at offset 0.
///
/// # Safety
/// `file` must be an open, readable descriptor.
unsafe fn pread_exact(file: &File, buf: &mut [u8]) -> io::Result<()> {
    let ret = unsafe { libc::pread(file.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len(), 0) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    if ret as usize != buf.len() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short SMN value read"));
    }
    Ok(())
}

impl SmnReader for SmuDriver {
    fn read_smn(&self, address: u32) -> u32 {
        self.read_register(address).unwrap_or_else(|e| {
            debug!("SMN read 0x{address:08x} failed: {e}");
            0
        })
    }
}
