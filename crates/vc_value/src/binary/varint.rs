use alloc::vec::Vec;

/// Appends `value` as unsigned LEB128.
pub(crate) fn write_u64(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[inline]
pub(crate) const fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub(crate) const fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Decodes an unsigned LEB128 at `input[*pos..]`.
///
/// Returns `None` on truncation and `Some(Err(()))` on overflow.
pub(crate) fn read_u64(input: &[u8], pos: &mut usize) -> Option<Result<u64, ()>> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *input.get(*pos)?;
        *pos += 1;
        if shift == 63 && byte > 1 {
            return Some(Err(()));
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Some(Ok(value));
        }
        shift += 7;
        if shift > 63 {
            return Some(Err(()));
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{read_u64, unzigzag, write_u64, zigzag};

    #[test]
    fn varint_edges() {
        for value in [0, 1, 127, 128, 300, u64::from(u32::MAX), u64::MAX] {
            let mut out = Vec::new();
            write_u64(&mut out, value);
            let mut pos = 0;
            assert_eq!(read_u64(&out, &mut pos), Some(Ok(value)));
            assert_eq!(pos, out.len());
        }
        let mut pos = 0;
        assert_eq!(read_u64(&[0x80, 0x80], &mut pos), None);
        let mut pos = 0;
        assert_eq!(read_u64(&[0xFF; 11], &mut pos), Some(Err(())));
    }

    #[test]
    fn zigzag_is_symmetric() {
        for value in [0, -1, 1, i64::MIN, i64::MAX, -300] {
            assert_eq!(unzigzag(zigzag(value)), value);
        }
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
    }
}
