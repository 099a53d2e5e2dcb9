//! Small binary-descriptor helpers for fields that don't fit `binrw`'s
//! static layout cleanly — reading typed values at a fixed offset in an
//! already-materialized byte blob, and a couple of small rendering rules
//! shared by the NCA header.

/// Returns `None` if `bytes` is all zero (used for optional/"absent" fields
/// like an NCA's rights ID).
pub fn bytes_or_absent(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.iter().all(|&b| b == 0) {
        None
    } else {
        Some(bytes)
    }
}

/// Renders a 4-byte SDK version as `d.c.b.0`, matching Nintendo's convention
/// of storing the version reversed (byte 3 is the major component).
pub fn render_sdk_version(bytes: [u8; 4]) -> String {
    format!("{}.{}.{}.0", bytes[3], bytes[2], bytes[1])
}

pub fn read_u32_le_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

pub fn read_u64_le_at(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sdk_version_reversed() {
        assert_eq!(render_sdk_version([0, 5, 1, 12]), "12.1.5.0");
    }

    #[test]
    fn all_zero_bytes_are_absent() {
        assert_eq!(bytes_or_absent(&[0u8; 16]), None);
        assert!(bytes_or_absent(&[0, 0, 1]).is_some());
    }
}
