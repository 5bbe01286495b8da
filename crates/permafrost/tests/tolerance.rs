//! Schema drift: renamed modules, added and removed members, and types
//! one side has never heard of.

use permafrost::de::Reader;
use permafrost::derive::Reflect;
use permafrost::dynamic::UnknownObject;
use permafrost::wire::BinaryDecoder;
use permafrost::{Shared, TypeRegistry};

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(rename = "demo::Widget")]
#[reflect(default)]
struct WidgetV1 {
    health: u32,
    name: String,
}

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(rename = "demo::Widget")]
#[reflect(default)]
struct WidgetV2 {
    health: u32,
    name: String,
    level: u64,
}

fn registry_for_v1() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<WidgetV1>();
    registry
}

fn registry_for_v2() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<WidgetV2>();
    registry
}

#[test]
fn added_members_keep_their_defaults() {
    let bytes = permafrost::to_bytes(
        &WidgetV1 {
            health: 80,
            name: "old".into(),
        },
        &registry_for_v1(),
    )
    .unwrap();

    let restored: WidgetV2 = permafrost::from_bytes_as(&bytes, &registry_for_v2()).unwrap();
    assert_eq!(restored.health, 80);
    assert_eq!(restored.name, "old");
    assert_eq!(restored.level, 0);
}

#[test]
fn removed_members_land_in_the_lost_channel() {
    let bytes = permafrost::to_bytes(
        &WidgetV2 {
            health: 80,
            name: "new".into(),
            level: 9,
        },
        &registry_for_v2(),
    )
    .unwrap();

    let registry = registry_for_v1();
    let mut reader = Reader::new(BinaryDecoder::new(bytes.as_slice()), &registry).unwrap();
    let restored = reader.read().unwrap();
    let restored = restored.take::<Shared<WidgetV1>>().unwrap();
    assert_eq!(restored.read().health, 80);

    let lost = reader.lost_members();
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].member, "level");
    assert_eq!(lost[0].value.downcast_ref::<u64>(), Some(&9));
}

#[test]
fn a_moved_type_resolves_by_bare_name() {
    #[derive(Debug, Default, PartialEq, Reflect)]
    #[reflect(rename = "old_crate::deep::Gizmo")]
    #[reflect(default)]
    struct GizmoBefore {
        spin: i32,
    }

    #[derive(Debug, Default, PartialEq, Reflect)]
    #[reflect(rename = "new_crate::Gizmo")]
    #[reflect(default)]
    struct GizmoAfter {
        spin: i32,
    }

    let mut writer_registry = TypeRegistry::new();
    writer_registry.register::<GizmoBefore>();
    let bytes = permafrost::to_bytes(&GizmoBefore { spin: 17 }, &writer_registry).unwrap();

    let mut reader_registry = TypeRegistry::new();
    reader_registry.register::<GizmoAfter>();
    let restored: GizmoAfter = permafrost::from_bytes_as(&bytes, &reader_registry).unwrap();
    assert_eq!(restored.spin, 17);
}

#[test]
fn reordered_members_match_by_name() {
    #[derive(Debug, Default, Reflect)]
    #[reflect(rename = "demo::Swapped")]
    #[reflect(default)]
    struct Writes {
        first: u32,
        second: String,
    }

    #[derive(Debug, Default, Reflect)]
    #[reflect(rename = "demo::Swapped")]
    #[reflect(default)]
    struct Reads {
        second: String,
        first: u32,
    }

    let mut writer_registry = TypeRegistry::new();
    writer_registry.register::<Writes>();
    let bytes = permafrost::to_bytes(
        &Writes {
            first: 5,
            second: "five".into(),
        },
        &writer_registry,
    )
    .unwrap();

    let mut reader_registry = TypeRegistry::new();
    reader_registry.register::<Reads>();
    let restored: Reads = permafrost::from_bytes_as(&bytes, &reader_registry).unwrap();
    assert_eq!(restored.first, 5);
    assert_eq!(restored.second, "five");
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(rename = "demo::Mode")]
#[reflect(default)]
enum ModeV1 {
    #[default]
    Off = 0,
    On = 1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(rename = "demo::Mode")]
#[reflect(default)]
enum ModeV2 {
    #[default]
    Off = 0,
    On = 1,
    Turbo = 2,
}

#[test]
fn unknown_discriminants_fall_back_to_the_default() {
    #[derive(Debug, Default, Reflect)]
    #[reflect(rename = "demo::Machine")]
    #[reflect(default)]
    struct MachineV2 {
        mode: ModeV2,
    }

    #[derive(Debug, Default, Reflect)]
    #[reflect(rename = "demo::Machine")]
    #[reflect(default)]
    struct MachineV1 {
        mode: ModeV1,
    }

    let mut writer_registry = TypeRegistry::new();
    writer_registry.register::<MachineV2>();
    let bytes = permafrost::to_bytes(
        &MachineV2 {
            mode: ModeV2::Turbo,
        },
        &writer_registry,
    )
    .unwrap();

    let mut reader_registry = TypeRegistry::new();
    reader_registry.register::<MachineV1>();
    let mut reader = Reader::new(BinaryDecoder::new(bytes.as_slice()), &reader_registry).unwrap();
    let restored = reader.read().unwrap().take::<Shared<MachineV1>>().unwrap();
    assert_eq!(restored.read().mode, ModeV1::Off);

    let lost = reader.lost_members();
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].member, "<discriminant>");
    assert_eq!(lost[0].value.downcast_ref::<i64>(), Some(&2));
}

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(rename = "demo::Exotic")]
#[reflect(default)]
struct Exotic {
    code: u32,
    tags: Vec<String>,
}

#[test]
fn unknown_types_become_placeholders() {
    let mut writer_registry = TypeRegistry::new();
    writer_registry.register::<Exotic>();
    let bytes = permafrost::to_bytes(
        &Exotic {
            code: 7,
            tags: vec!["rare".into()],
        },
        &writer_registry,
    )
    .unwrap();

    let blank = TypeRegistry::new();
    let placeholder = permafrost::from_bytes(&bytes, &blank).unwrap();
    let placeholder = placeholder.take::<Shared<UnknownObject>>().unwrap();
    {
        let value = placeholder.read();
        assert_eq!(value.descriptor().name(), Some("demo::Exotic"));
        use permafrost::reflection::Struct;
        assert_eq!(value.member("code").and_then(|m| m.downcast_ref::<u32>()), Some(&7));
    }

    // The placeholder re-serializes, and a reader that does know the
    // type gets the original value back.
    let replayed = permafrost::to_bytes(&placeholder, &blank).unwrap();
    let restored: Exotic = permafrost::from_bytes_as(&replayed, &writer_registry).unwrap();
    assert_eq!(
        restored,
        Exotic {
            code: 7,
            tags: vec!["rare".into()],
        }
    );
}

#[test]
fn read_only_collections_carry_no_elements() {
    use permafrost::dynamic::UnknownPayload;
    use permafrost::model::{CollectionKind, PrimitiveKind, TypeData, TypeDataBody, TypeDataFlags};
    use std::sync::Arc;

    let data = TypeData::new(
        TypeDataFlags::SUPPORTED | TypeDataFlags::HAS_NAME,
        PrimitiveKind::None,
        CollectionKind::TypedList,
        Some("demo::Frozen".into()),
        Some("demo".into()),
        0,
        0,
    );
    data.attach_body(TypeDataBody {
        collection_value: Some(TypeData::describe(
            <String as permafrost::Typed>::runtime_type(),
        )),
        ..TypeDataBody::default()
    })
    .unwrap();
    let mut frozen = UnknownObject::structural(Arc::new(data));
    match frozen.payload_mut() {
        UnknownPayload::Structural(payload) => payload.items.read_only = true,
        _ => unreachable!(),
    }

    let blank = TypeRegistry::new();
    let bytes = permafrost::to_bytes(&frozen, &blank).unwrap();
    let restored = permafrost::from_bytes(&bytes, &blank).unwrap();
    let restored = restored.take::<Shared<UnknownObject>>().unwrap();
    let held = restored.read();
    match held.payload() {
        UnknownPayload::Structural(payload) => {
            assert!(payload.items.read_only);
            assert!(payload.items.items.is_empty());
        }
        _ => panic!("expected a structural payload"),
    }
}

#[test]
fn placeholder_descriptors_feed_stub_generation() {
    let mut writer_registry = TypeRegistry::new();
    writer_registry.register::<Exotic>();
    let bytes = permafrost::to_bytes(&Exotic::default(), &writer_registry).unwrap();

    let blank = TypeRegistry::new();
    let placeholder = permafrost::from_bytes(&bytes, &blank).unwrap();
    let placeholder = placeholder.take::<Shared<UnknownObject>>().unwrap();

    let stubs = permafrost::stubgen::generate_stubs(&[placeholder.read().descriptor().clone()]);
    assert!(stubs.contains("pub struct Exotic {"));
    assert!(stubs.contains("#[reflect(rename = \"demo::Exotic\")]"));
    assert!(stubs.contains("pub code: u32,"));
}
