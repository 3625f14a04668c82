//! Fixed order-13 alphabetic substitution cipher.

/// Rotate a single byte by 13 places within its alphabetic range.
///
/// `[A:M] -> [N:Z]`, `[N:Z] -> [A:M]`, likewise for lowercase; everything
/// else passes through unchanged. The rotation is its own inverse.
pub fn rot13_byte(b: u8) -> u8 {
    match b {
        b'A'..=b'M' | b'a'..=b'm' => b + 13,
        b'N'..=b'Z' | b'n'..=b'z' => b - 13,
        _ => b,
    }
}

/// Translate `src` into `dst` byte by byte, left to right.
///
/// Both slices must be the same length.
pub fn rot13(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d = rot13_byte(*s);
    }
}

/// In-place translation, for when source and destination are the same buffer.
///
/// Safe to use wherever [`rot13`] would alias, since the transform is
/// byte-wise.
pub fn rot13_in_place(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = rot13_byte(*b);
    }
}
