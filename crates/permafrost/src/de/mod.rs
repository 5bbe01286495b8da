//! Reading object graphs back out of a stream.

mod reader;

pub use reader::{LostMember, Reader};
