//! ChainPack binary codec.

mod reader;
mod vlq;
mod writer;

pub use reader::{from_bytes, from_bytes_with_depth};
pub use writer::{to_bytes, to_bytes_strict, to_bytes_with_depth, to_bytes_with_depth_strict, write_value};

pub(crate) use reader::read_meta_only;
pub(crate) use vlq::read_uint as vlq_read_uint;
pub(crate) use vlq::write_uint as vlq_write_uint;
pub(crate) use writer::{meta_to_bytes, to_bytes_body_only};
