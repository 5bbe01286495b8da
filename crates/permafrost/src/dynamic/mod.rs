//! Values with no static type: property bags and placeholders for
//! stream types this build does not know.

mod bag;
mod unknown;

pub use bag::PropertyBag;
pub use unknown::{AnyList, AnyMap, StructuralPayload, UnknownObject, UnknownPayload};
