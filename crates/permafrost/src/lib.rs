#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Extern Self

// The derive macro emits absolute `permafrost::` paths, and this alias
// keeps those paths valid inside the crate itself.
extern crate self as permafrost;

// -----------------------------------------------------------------------------
// Modules

mod api;
mod context;
mod shared;

pub mod de;
pub mod dynamic;
pub mod error;
pub mod impls;
pub mod model;
pub mod reflection;
pub mod registry;
pub mod ser;
pub mod stubgen;
pub mod wire;

// -----------------------------------------------------------------------------
// Top-level exports

pub use api::{
    clone_value, clone_value_with, from_bytes, from_bytes_as, from_text, from_text_as, read_into,
    to_bytes, to_bytes_with, to_text, to_text_with,
};
pub use context::{IdentityContext, NULL_ID, Registered, well_known_types};
pub use error::{Error, Result};
pub use impls::Blob;
pub use reflection::{Reflect, Typed};
pub use registry::{AfterRead, CustomSerialize, Describe, TypeRegistry};
pub use shared::Shared;
pub use wire::WriteOptions;

pub use permafrost_derive as derive;
