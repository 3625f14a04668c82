//! Native core of the demo library.
//!
//! Implements the demo operations over ordinary Rust types (integers, byte
//! slices, owned buffers). This crate has no awareness of the wasm boundary;
//! the numeric-only calling surface lives in `demo-wasm-bridge`.

pub mod arithmetic;
pub mod cipher;
pub mod string;

pub use arithmetic::add;
pub use cipher::{rot13, rot13_byte, rot13_in_place};
pub use string::{hello, string_double};
