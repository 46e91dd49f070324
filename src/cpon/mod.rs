//! Cpon text codec.

mod datetime;
mod reader;
mod writer;

pub use reader::{from_str, from_str_with_depth};
pub use writer::{to_string, to_string_opts, to_string_opts_strict, to_string_strict, WriterOptions};

pub(crate) use reader::read_meta_only;
pub(crate) use writer::{meta_to_string, to_string_body_only};
