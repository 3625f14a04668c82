//! Integer arithmetic for the demo library.

/// Returns the sum of two integers under native wraparound semantics.
pub fn add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

#[cfg(test)]
mod tests {
    use super::add;

    #[test]
    fn adds_small_integers() {
        assert_eq!(add(2, 3), 5);
        assert_eq!(add(-7, 7), 0);
    }

    #[test]
    fn wraps_on_overflow() {
        assert_eq!(add(i32::MAX, 1), i32::MIN);
        assert_eq!(add(i32::MIN, -1), i32::MAX);
    }
}
