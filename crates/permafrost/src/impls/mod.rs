//! Built-in impls: primitives, options, collections, arrays and the
//! type-erased `Box<dyn Reflect>`.

mod array;
mod boxed;
mod collections;
mod option;
mod primitives;

pub use primitives::Blob;

/// The mechanical part of every `Reflect` impl.
macro_rules! impl_reflect_plumbing {
    () => {
        fn as_any(&self) -> &dyn ::core::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn ::core::any::Any> {
            self
        }

        fn as_reflect(&self) -> &dyn $crate::reflection::Reflect {
            self
        }

        fn as_reflect_mut(&mut self) -> &mut dyn $crate::reflection::Reflect {
            self
        }
    };
}
pub(crate) use impl_reflect_plumbing;
