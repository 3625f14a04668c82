//! String operations for the demo library.

/// Doubles a string by concatenating it with itself.
///
/// Returns a newly allocated buffer owned by the caller. The input is taken
/// as raw bytes; terminator conventions are the boundary layer's concern.
pub fn string_double(s: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(s.len() * 2);
    result.extend_from_slice(s);
    result.extend_from_slice(s);
    result
}

/// Print a greeting from the demo library.
pub fn hello(msg: &str) {
    println!("Demo says '{msg}'");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_contents() {
        assert_eq!(string_double(b"hi"), b"hihi");
        assert_eq!(string_double(b"a"), b"aa");
    }

    #[test]
    fn doubling_empty_is_empty() {
        assert!(string_double(b"").is_empty());
    }

    #[test]
    fn hello_does_not_panic() {
        hello("tests");
    }
}
