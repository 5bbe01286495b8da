//! Writing object graphs to a stream.

mod writer;

pub use writer::Writer;
