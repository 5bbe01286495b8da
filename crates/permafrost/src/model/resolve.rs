use std::sync::Arc;

use crate::model::{CollectionKind, PrimitiveKind, RuntimeType, TypeData};
use crate::registry::TypeRegistry;

/// An expected type, local or foreign.
///
/// Most of the engine does not care whether an expected type came from
/// a local descriptor or from a stream, so both sides traffic in this
/// handle and ask it the structural questions.
#[derive(Clone)]
pub enum TypeHandle {
    Local(&'static RuntimeType),
    Wire(Arc<TypeData>),
}

impl TypeHandle {
    /// The handle for a descriptor slot: local when the descriptor is
    /// already backed by a local type, wire otherwise.
    pub fn for_data(data: &Arc<TypeData>) -> Self {
        match data.cached_target().copied() {
            Some(Some(ty)) => Self::Local(ty),
            _ => Self::Wire(data.clone()),
        }
    }

    /// A stable per-process identity for context bookkeeping. Two
    /// handles to the same descriptor compare equal.
    pub fn identity(&self) -> usize {
        match self {
            Self::Local(ty) => *ty as *const RuntimeType as usize,
            Self::Wire(data) => Arc::as_ptr(data) as usize,
        }
    }

    pub fn is_sealed(&self) -> bool {
        match self {
            Self::Local(ty) => ty.is_sealed(),
            Self::Wire(data) => data.is_sealed(),
        }
    }

    pub fn is_reference(&self) -> bool {
        match self {
            Self::Local(ty) => ty.is_reference(),
            Self::Wire(data) => data.is_reference(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Local(ty) => ty.is_nullable(),
            Self::Wire(data) => data.is_nullable(),
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Local(ty) => ty.kind(),
            Self::Wire(data) => data.kind(),
        }
    }

    pub fn collection(&self) -> CollectionKind {
        match self {
            Self::Local(ty) => ty.collection(),
            Self::Wire(data) => data.collection(),
        }
    }

    /// A displayable path for diagnostics.
    pub fn path(&self) -> &str {
        match self {
            Self::Local(ty) => ty.path(),
            Self::Wire(data) => data.name().unwrap_or("<unsupported>"),
        }
    }

    pub fn as_local(&self) -> Option<&'static RuntimeType> {
        match self {
            Self::Local(ty) => Some(ty),
            Self::Wire(_) => None,
        }
    }

    /// Whether a value of the given local type satisfies this expected
    /// type. Foreign handles and abstract local types accept anything.
    pub fn accepts(&self, ty: &RuntimeType) -> bool {
        match self {
            Self::Local(expected) => expected.accepts(ty),
            Self::Wire(_) => true,
        }
    }
}

/// The outcome of matching a stream descriptor against local types.
pub enum Resolution {
    /// A local type claims this descriptor. Values deserialize into it.
    Resolved(&'static RuntimeType),
    /// Nothing local matches. Values deserialize into placeholder
    /// objects that keep the descriptor for lossless re-emission.
    Placeholder(Arc<TypeData>),
}

/// Matches a stream descriptor against the registry.
///
/// The descriptor and its base chain are tried in order, first by full
/// path and then by unambiguous bare name, so a renamed module still
/// resolves and an unknown subclass degrades to its nearest known
/// ancestor. A registry hit must also satisfy the expected-type hint;
/// when nothing matches, a concrete hint is trusted, and otherwise the
/// value becomes a placeholder.
pub fn resolve(data: &Arc<TypeData>, registry: &TypeRegistry, hint: &TypeHandle) -> Resolution {
    let target = match data.cached_target() {
        Some(cached) => *cached,
        None => {
            let found = lookup_chain(data, registry);
            data.cache_target(found);
            found
        }
    };

    if let Some(ty) = target
        && hint.accepts(ty)
    {
        return Resolution::Resolved(ty);
    }

    // Primitive payloads have one natural local home even when the
    // writer's path for them is foreign.
    if data.kind().is_primitive()
        && let Some(ty) = registry.primitive_for(data.kind())
        && hint.accepts(ty)
    {
        return Resolution::Resolved(ty);
    }

    if let TypeHandle::Local(expected) = hint
        && !expected.is_abstract()
    {
        return Resolution::Resolved(expected);
    }

    Resolution::Placeholder(data.clone())
}

fn lookup_chain(data: &Arc<TypeData>, registry: &TypeRegistry) -> Option<&'static RuntimeType> {
    let mut current = Some(data.clone());
    while let Some(link) = current {
        if let Some(path) = link.name() {
            if let Some(ty) = registry.type_by_path(path) {
                return Some(ty);
            }
            let bare = path.rsplit("::").next().unwrap_or(path);
            if let Some(ty) = registry.type_by_name(bare) {
                return Some(ty);
            }
        }
        current = link.body().and_then(|body| body.base.clone());
    }
    None
}
