/// Marker that precedes the AGESA version string in firmware images.
pub const AGESA_MARKER: &[u8] = b"AGESA!V9";

/// Legacy BIOS shadow window scanned for the marker (`0xE0000..0x100000`).
pub const BIOS_SHADOW_BASE: u64 = 0xE_0000;
pub const BIOS_SHADOW_LEN: usize = 0x2_0000;

const fn allowed(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b' ' | b'.' | b'-')
}

/// Returns the version string following the first `AGESA!V9` marker in `buf`.
///
/// Bytes between the marker and the string that are not `[A-Za-z0-9 .-]` are skipped.
#[must_use]
pub fn find_agesa_version(buf: &[u8]) -> Option<String> {
    let pos = buf
        .windows(AGESA_MARKER.len())
        .position(|w| w == AGESA_MARKER)?;
    let tail = &buf[pos + AGESA_MARKER.len()..];

    let start = tail.iter().position(|&b| allowed(b))?;
    let len = tail[start..]
        .iter()
        .position(|&b| !allowed(b))
        .unwrap_or(tail.len() - start);

    let version = String::from_utf8_lossy(&tail[start..start + len]);
    let version = version.trim();
    (!version.is_empty()).then(|| version.to_string())
}
