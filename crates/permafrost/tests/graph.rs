//! Identity, aliasing and cyclic graphs.

use permafrost::derive::Reflect;
use permafrost::{Shared, TypeRegistry};

#[derive(Debug, Default, Reflect)]
#[reflect(default)]
struct Node {
    label: String,
    next: Option<Shared<Node>>,
}

#[derive(Debug, Default, Reflect)]
#[reflect(default)]
struct Pair {
    left: Shared<Node>,
    right: Shared<Node>,
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<Node>();
    registry.register::<Pair>();
    registry
}

#[test]
fn aliased_handles_stay_aliased() {
    let registry = registry();
    let shared = Shared::new(Node {
        label: "one".into(),
        next: None,
    });
    let pair = Pair {
        left: shared.clone(),
        right: shared,
    };

    let bytes = permafrost::to_bytes(&pair, &registry).unwrap();
    let restored: Pair = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert!(restored.left.ptr_eq(&restored.right));

    restored.left.write().label = "renamed".into();
    assert_eq!(restored.right.read().label, "renamed");
}

#[test]
fn distinct_targets_stay_distinct() {
    let registry = registry();
    let pair = Pair {
        left: Shared::new(Node {
            label: "a".into(),
            next: None,
        }),
        right: Shared::new(Node {
            label: "b".into(),
            next: None,
        }),
    };

    let bytes = permafrost::to_bytes(&pair, &registry).unwrap();
    let restored: Pair = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert!(!restored.left.ptr_eq(&restored.right));
    assert_eq!(restored.left.read().label, "a");
    assert_eq!(restored.right.read().label, "b");
}

#[test]
fn cycles_survive_the_stream() {
    let registry = registry();
    let a = Shared::new(Node {
        label: "a".into(),
        next: None,
    });
    let b = Shared::new(Node {
        label: "b".into(),
        next: Some(a.clone()),
    });
    a.write().next = Some(b.clone());

    let bytes = permafrost::to_bytes(&a, &registry).unwrap();
    let restored = permafrost::from_bytes(&bytes, &registry).unwrap();
    let restored = restored.take::<Shared<Node>>().unwrap();

    assert_eq!(restored.read().label, "a");
    let second = restored.read().next.clone().unwrap();
    assert_eq!(second.read().label, "b");
    let third = second.read().next.clone().unwrap();
    assert!(third.ptr_eq(&restored));
}

#[test]
fn self_reference_round_trips() {
    let registry = registry();
    let node = Shared::new(Node {
        label: "loop".into(),
        next: None,
    });
    node.write().next = Some(node.clone());

    let bytes = permafrost::to_bytes(&node, &registry).unwrap();
    let restored = permafrost::from_bytes(&bytes, &registry).unwrap();
    let restored = restored.take::<Shared<Node>>().unwrap();
    let next = restored.read().next.clone().unwrap();
    assert!(next.ptr_eq(&restored));
}

#[test]
fn identity_spans_multiple_roots() {
    use permafrost::de::Reader;
    use permafrost::ser::Writer;
    use permafrost::wire::{BinaryDecoder, BinaryEncoder};

    let registry = registry();
    let shared = Shared::new(Node {
        label: "root".into(),
        next: None,
    });

    let mut writer = Writer::new(BinaryEncoder::new(Vec::new()), &registry).unwrap();
    writer.write(&shared).unwrap();
    writer.write(&shared).unwrap();
    let bytes = writer.into_encoder().into_inner();

    let mut reader = Reader::new(BinaryDecoder::new(bytes.as_slice()), &registry).unwrap();
    let first = reader.read().unwrap().take::<Shared<Node>>().unwrap();
    let second = reader.read().unwrap().take::<Shared<Node>>().unwrap();
    assert!(first.ptr_eq(&second));
}
