//! Wasm/JS boundary for the demo library.
//!
//! The only types the embedding can pass across the boundary are i32, i64,
//! f32 and f64. This crate wraps `demo-core`'s native API in a surface using
//! only those types: strings and buffers travel as offsets into a shared
//! linear memory region (see [`memory`]), and ownership of returned regions
//! transfers to the host, which must release them via [`wasm_free`].
//!
//! Symbol export mechanics (visibility flags, the symbol manifest) and the
//! JS glue that drives this surface belong to the embedding, not to this
//! crate.

pub mod memory;


use crate::memory::{MemOffset, linear_memory};

// Imported from the embedding. The JS side registers the callback in the
// symbol manifest; signatures are matched by hand, not compiler enforced.
#[cfg(all(feature = "js_callbacks", not(test)))]
unsafe extern "C" {
    fn js_wasm_add_callback(result: i32) -> i32;
}

/// Stand-in used when running outside the embedding (no JS to call back into).
#[cfg(all(not(feature = "js_callbacks"), not(test)))]
unsafe extern "C" fn js_wasm_add_callback(_result: i32) -> i32 {
    0
}

/// Recording stand-in so tests can observe callback delivery.
#[cfg(test)]
unsafe extern "C" fn js_wasm_add_callback(result: i32) -> i32 {
    tests::record_add_callback(result);
    0
}

/// Reserve `len` bytes in the linear memory region.
///
/// Returns the null offset when the request cannot be satisfied (`len <= 0`,
/// or the allocator is exhausted); callers must check before use. The caller
/// owns the returned region and must release it via [`wasm_free`].
#[unsafe(no_mangle)]
pub extern "C" fn wasm_malloc(len: i32) -> MemOffset {
    if len <= 0 {
        return MemOffset::null();
    }
    linear_memory().allocate(len as usize)
}

/// Release a region previously returned by [`wasm_malloc`] or
/// [`string_double`].
///
/// Releasing twice, or releasing an offset the allocator never returned, is
/// a caller contract violation (reported under the `debug_memory` feature,
/// silently ignored otherwise).
#[unsafe(no_mangle)]
pub extern "C" fn wasm_free(address: MemOffset) {
    linear_memory().release(address);
}

/// Add two ints.
///
/// The type conversions are no-ops in this case but demonstrate the
/// technique. The result is computed natively, delivered to the host
/// callback, and then returned; the callback observes the same value this
/// function returns. The callback's own return value is discarded.
#[unsafe(no_mangle)]
pub extern "C" fn add(a: i32, b: i32) -> i32 {
    let result = demo_core::add(a, b);
    let _ = unsafe { js_wasm_add_callback(result) };
    result
}

/// Double a string.
///
/// `address` must point at a NUL-terminated byte sequence resident in the
/// linear memory region. The doubled copy is written into a freshly
/// allocated region whose offset is returned; the host must interpret it as
/// a NUL-terminated byte array and release it with [`wasm_free`] when done.
/// The source region is left unchanged.
#[unsafe(no_mangle)]
pub extern "C" fn string_double(address: MemOffset) -> MemOffset {
    let memory = linear_memory();
    let Some(input) = memory.read_cstr(address) else {
        return MemOffset::null();
    };
    let doubled = demo_core::string_double(&input);
    let out = memory.allocate(doubled.len() + 1);
    if out.is_null() {
        return MemOffset::null();
    }
    memory.with_bytes_mut(out, |data| {
        data[..doubled.len()].copy_from_slice(&doubled);
        data[doubled.len()] = 0;
    });
    out
}

/// Rot13 a string: translate the first `len` bytes of `src` into `dst`.
///
/// Both offsets must name live regions of at least `len` bytes. `dst` and
/// `src` may be the same region; the transform is byte-wise left-to-right,
/// so in-place translation is safe. `len <= 0` is a no-op. No return value.
#[unsafe(no_mangle)]
pub extern "C" fn rot13(dst: MemOffset, src: MemOffset, len: i32) {
    if len <= 0 {
        return;
    }
    let len = len as usize;
    let memory = linear_memory();

    if dst == src {
        memory.with_bytes_mut(dst, |data| {
            let n = len.min(data.len());
            demo_core::rot13_in_place(&mut data[..n]);
        });
        return;
    }

    let Some(input) = memory.read_bytes(src) else {
        return;
    };
    memory.with_bytes_mut(dst, |data| {
        let n = len.min(input.len()).min(data.len());
        demo_core::rot13(&mut data[..n], &input[..n]);
    });
}
