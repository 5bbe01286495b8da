//! Source stubs for stream types with no local counterpart.
//!
//! When a reader keeps running into placeholders, the fastest way out
//! is to add the missing types to the local model. [`generate_stubs`]
//! turns the foreign descriptors into `#[derive(Reflect)]` skeletons
//! that can be pasted into a module and filled in.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::model::{PrimitiveKind, TypeData};

/// Renders derive-ready Rust stubs for the given descriptors.
///
/// Primitive and unnamed descriptors are skipped, as are duplicates.
/// Enum variants are not part of the wire format, so generated enums
/// start with a single placeholder variant.
pub fn generate_stubs(descriptors: &[Arc<TypeData>]) -> String {
    let mut out = String::new();
    out.push_str("// Stubs generated from stream type descriptors.\n");
    out.push_str("// Field types are best-effort reconstructions; review before use.\n\n");
    out.push_str("use permafrost::derive::Reflect;\n");
    out.push_str("use permafrost::Shared;\n");

    let mut emitted = HashSet::new();
    for data in descriptors {
        let Some(path) = data.name() else {
            continue;
        };
        if data.kind().is_primitive() || data.is_nullable() || data.is_array() {
            continue;
        }
        let ident = type_ident(path);
        if !emitted.insert(ident.clone()) {
            continue;
        }
        out.push('\n');
        if data.is_enum() {
            let _ = write!(
                out,
                "#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]\n\
                 #[reflect(rename = \"{path}\")]\n\
                 #[reflect(default)]\n\
                 pub enum {ident} {{\n\
                 \x20   // The stream does not carry variant names; fill these in.\n\
                 \x20   #[default]\n\
                 \x20   Unknown = 0,\n\
                 }}\n"
            );
            continue;
        }
        let _ = write!(
            out,
            "#[derive(Debug, Default, Reflect)]\n\
             #[reflect(rename = \"{path}\")]\n\
             #[reflect(default)]\n\
             pub struct {ident} {{\n"
        );
        if let Some(body) = data.body() {
            for member in &body.members {
                let field = field_ident(&member.name);
                if field != member.name.as_ref() {
                    let _ = writeln!(out, "    #[reflect(name = \"{}\")]", member.name);
                }
                let _ = writeln!(out, "    pub {field}: {},", field_type(member.ty.as_ref()));
            }
        }
        out.push_str("}\n");
    }
    out
}

/// The Rust type to put in a stub field for a descriptor slot.
fn field_type(slot: Option<&Arc<TypeData>>) -> String {
    let Some(data) = slot else {
        return "Box<dyn permafrost::Reflect>".to_owned();
    };
    match data.kind() {
        PrimitiveKind::None => {}
        PrimitiveKind::Unit => return "()".to_owned(),
        PrimitiveKind::Bool => return "bool".to_owned(),
        PrimitiveKind::Char => return "char".to_owned(),
        PrimitiveKind::I8 => return "i8".to_owned(),
        PrimitiveKind::I16 => return "i16".to_owned(),
        PrimitiveKind::I32 => return "i32".to_owned(),
        PrimitiveKind::I64 => return "i64".to_owned(),
        PrimitiveKind::U8 => return "u8".to_owned(),
        PrimitiveKind::U16 => return "u16".to_owned(),
        PrimitiveKind::U32 => return "u32".to_owned(),
        PrimitiveKind::U64 => return "u64".to_owned(),
        PrimitiveKind::F32 => return "f32".to_owned(),
        PrimitiveKind::F64 => return "f64".to_owned(),
        PrimitiveKind::Decimal => return "rust_decimal::Decimal".to_owned(),
        PrimitiveKind::Str => return "String".to_owned(),
        PrimitiveKind::Bytes => return "permafrost::Blob".to_owned(),
        PrimitiveKind::Guid => return "uuid::Uuid".to_owned(),
    }

    let element = || {
        data.body()
            .and_then(|b| b.element.as_ref())
            .map(field_type_slot)
            .unwrap_or_else(|| "Box<dyn permafrost::Reflect>".to_owned())
    };
    if data.is_nullable() {
        return format!("Option<{}>", element());
    }
    if data.is_array() {
        // Array lengths are not part of the descriptor.
        return format!("Vec<{}>", element());
    }
    if data.collection().is_map() {
        let key = data
            .body()
            .and_then(|b| b.collection_key.as_ref())
            .map(field_type_slot)
            .unwrap_or_else(|| "Box<dyn permafrost::Reflect>".to_owned());
        let value = data
            .body()
            .and_then(|b| b.collection_value.as_ref())
            .map(field_type_slot)
            .unwrap_or_else(|| "Box<dyn permafrost::Reflect>".to_owned());
        return format!("std::collections::HashMap<{key}, {value}>");
    }
    if data.collection().is_collection() {
        let value = data
            .body()
            .and_then(|b| b.collection_value.as_ref())
            .map(field_type_slot)
            .unwrap_or_else(|| "Box<dyn permafrost::Reflect>".to_owned());
        return format!("Vec<{value}>");
    }

    let ident = data.name().map(type_ident).unwrap_or_else(|| "Unnamed".to_owned());
    if data.is_reference() {
        format!("Shared<{ident}>")
    } else {
        ident
    }
}

fn field_type_slot(slot: &Arc<TypeData>) -> String {
    field_type(Some(slot))
}

/// A Rust type identifier derived from a wire path.
fn type_ident(path: &str) -> String {
    let bare = path.rsplit("::").next().unwrap_or(path);
    let mut ident = String::with_capacity(bare.len());
    for (index, c) in bare.chars().enumerate() {
        if c.is_alphanumeric() {
            if index == 0 {
                ident.extend(c.to_uppercase());
            } else {
                ident.push(c);
            }
        } else if !ident.is_empty() && !ident.ends_with('_') {
            ident.push('_');
        }
    }
    let ident = ident.trim_end_matches('_').to_owned();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("T{ident}")
    } else {
        ident
    }
}

/// A Rust field identifier derived from a wire member name.
fn field_ident(name: &str) -> String {
    let mut ident = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            // Wire names often come in PascalCase.
            if c.is_uppercase() {
                if !ident.is_empty() && !ident.ends_with('_') {
                    ident.push('_');
                }
                ident.extend(c.to_lowercase());
            } else {
                ident.push(c);
            }
        } else if !ident.is_empty() && !ident.ends_with('_') {
            ident.push('_');
        }
    }
    let ident = ident.trim_end_matches('_').to_owned();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("field_{ident}")
    } else {
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CollectionKind, TypeDataBody, TypeDataFlags, TypeDataMember};
    use crate::reflection::Typed;

    fn named_object(path: &str, members: Vec<TypeDataMember>) -> Arc<TypeData> {
        let data = TypeData::new(
            TypeDataFlags::SUPPORTED | TypeDataFlags::HAS_NAME | TypeDataFlags::REFERENCE,
            PrimitiveKind::None,
            CollectionKind::None,
            Some(path.into()),
            Some("demo".into()),
            0,
            0,
        );
        data.attach_body(TypeDataBody {
            members,
            ..TypeDataBody::default()
        })
        .unwrap();
        Arc::new(data)
    }

    #[test]
    fn struct_stub_carries_rename_and_fields() {
        let descriptor = named_object(
            "demo::models::PlayerState",
            vec![
                TypeDataMember {
                    name: "Health".into(),
                    ty: Some(TypeData::describe(<i32 as Typed>::runtime_type())),
                },
                TypeDataMember {
                    name: "DisplayName".into(),
                    ty: Some(TypeData::describe(<String as Typed>::runtime_type())),
                },
            ],
        );
        let stubs = generate_stubs(&[descriptor]);
        assert!(stubs.contains("#[reflect(rename = \"demo::models::PlayerState\")]"));
        assert!(stubs.contains("pub struct PlayerState {"));
        assert!(stubs.contains("#[reflect(name = \"Health\")]"));
        assert!(stubs.contains("pub health: i32,"));
        assert!(stubs.contains("pub display_name: String,"));
    }

    #[test]
    fn enum_stub_gets_a_placeholder_variant() {
        let data = TypeData::new(
            TypeDataFlags::SUPPORTED | TypeDataFlags::HAS_NAME | TypeDataFlags::ENUM,
            PrimitiveKind::None,
            CollectionKind::None,
            Some("demo::Mode".into()),
            Some("demo".into()),
            0,
            0,
        );
        data.attach_body(TypeDataBody::default()).unwrap();
        let stubs = generate_stubs(&[Arc::new(data)]);
        assert!(stubs.contains("pub enum Mode {"));
        assert!(stubs.contains("Unknown = 0,"));
    }

    #[test]
    fn duplicates_and_primitives_are_skipped() {
        let a = named_object("demo::Same", Vec::new());
        let b = named_object("demo::Same", Vec::new());
        let primitive = TypeData::describe(<u64 as Typed>::runtime_type());
        let stubs = generate_stubs(&[a, b, primitive]);
        assert_eq!(stubs.matches("pub struct Same").count(), 1);
        assert!(!stubs.contains("u64 {"));
    }
}
