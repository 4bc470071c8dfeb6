use log::debug;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

pub const DEFAULT_MSR_PATH: &str = "/dev/cpu/0/msr";

/// Core P-state 0 definition.
pub const MSR_PSTATE_0: u32 = 0xC001_0064;

/// Reads one 64-bit model-specific register through the `msr` driver's device node.
///
/// The device is addressed by register number: the value lives at file offset `reg`.
pub fn read_msr(path: &Path, reg: u32) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut buf = [0u8; 8];
    let ret = unsafe {
        libc::pread(
            file.as_raw_fd(),
            buf.as_mut_ptr().cast(),
            buf.len(),
            libc::off_t::from(reg),
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    if ret as usize != buf.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short read of MSR 0x{reg:08x}"),
        ));
    }
    Ok(u64::from_le_bytes(buf))
}

/// [`read_msr`] with failures logged and reported as `None`.
#[must_use]
pub fn try_read_msr(path: &Path, reg: u32) -> Option<u64> {
    read_msr(path, reg)
        .inspect_err(|e| debug!("MSR 0x{reg:08x} via {} unavailable: {e}", path.display()))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn register_is_read_at_its_offset() {
        // A sparse regular file stands in for the device node.
        let path = std::env::temp_dir().join(format!("ryzen-telemetry-msr-{}", std::process::id()));
        let file = File::create(&path).unwrap();
        let value = 0x0000_0000_4408_1488u64;
        let ret = unsafe {
            libc::pwrite(
                file.as_raw_fd(),
                value.to_le_bytes().as_ptr().cast(),
                8,
                libc::off_t::from(MSR_PSTATE_0),
            )
        };
        assert_eq!(ret, 8);
        drop(file);

        let read = read_msr(&path, MSR_PSTATE_0).unwrap();
        let past_end = try_read_msr(&path, MSR_PSTATE_0 + 8);
        fs::remove_file(&path).unwrap();

        assert_eq!(read, value);
        assert_eq!(past_end, None);
    }

    #[test]
    fn missing_device_is_none() {
        let path = std::env::temp_dir().join("ryzen-telemetry-no-such-msr");
        assert_eq!(try_read_msr(&path, MSR_PSTATE_0), None);
    }
}
