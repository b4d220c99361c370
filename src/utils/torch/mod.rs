//! Utilities for working with tch [`Tensor`](tch::Tensor).
mod serialize;

pub use serialize::{ByteOrder, DeviceDef, KindDef, TensorDef};
