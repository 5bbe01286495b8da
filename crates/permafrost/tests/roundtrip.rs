//! End-to-end round trips through the binary and text codecs.

use std::collections::{BTreeMap, HashMap};

use permafrost::derive::Reflect;
use permafrost::{Blob, Shared, TypeRegistry};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(default)]
struct Primitives {
    flag: bool,
    letter: char,
    small: i8,
    wide: i64,
    unsigned: u64,
    single: f32,
    double: f64,
    exact: Decimal,
    text: String,
    raw: Blob,
    id: Uuid,
}

fn sample_primitives() -> Primitives {
    Primitives {
        flag: true,
        letter: '\u{1F980}',
        small: i8::MIN,
        wide: i64::MAX,
        unsigned: u64::MAX,
        single: f32::MIN_POSITIVE,
        double: -0.0,
        exact: Decimal::new(-123456789, 4),
        text: String::new(),
        raw: Blob(vec![0, 255, 7]),
        id: Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef),
    }
}

#[test]
fn primitives_are_bit_exact() {
    let mut registry = TypeRegistry::new();
    registry.register::<Primitives>();

    let bytes = permafrost::to_bytes(&sample_primitives(), &registry).unwrap();
    let restored: Primitives = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, sample_primitives());
    assert_eq!(restored.double.to_bits(), (-0.0f64).to_bits());
}

#[test]
fn nan_survives_the_stream() {
    let mut registry = TypeRegistry::new();
    registry.register::<Primitives>();

    let mut value = sample_primitives();
    value.double = f64::NAN;
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Primitives = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert!(restored.double.is_nan());
}

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(default)]
struct Collections {
    ordered: Vec<u32>,
    names: Vec<String>,
    by_name: HashMap<String, u32>,
    sorted: BTreeMap<i32, String>,
    fixed: [u8; 4],
    maybe: Option<String>,
    missing: Option<u64>,
}

#[test]
fn collections_keep_their_contents() {
    let mut registry = TypeRegistry::new();
    registry.register::<Collections>();

    let value = Collections {
        ordered: vec![3, 1, 4, 1, 5],
        names: vec!["a".into(), "b".into()],
        by_name: HashMap::from([("x".into(), 1), ("y".into(), 2)]),
        sorted: BTreeMap::from([(-1, "neg".into()), (1, "pos".into())]),
        fixed: [9, 8, 7, 6],
        maybe: Some("present".into()),
        missing: None,
    };
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Collections = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, value);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(default)]
enum Phase {
    #[default]
    Idle = 0,
    Running = 3,
    Done = -2,
}

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(default)]
struct Job {
    phase: Phase,
    #[reflect(name = "Steps")]
    steps: u32,
}

#[test]
fn enums_round_trip_by_discriminant() {
    let mut registry = TypeRegistry::new();
    registry.register::<Job>();

    let value = Job {
        phase: Phase::Done,
        steps: 12,
    };
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Job = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, value);
}

#[test]
fn text_codec_matches_binary_semantics() {
    let mut registry = TypeRegistry::new();
    registry.register::<Collections>();

    let value = Collections {
        ordered: vec![1, 2],
        maybe: Some("text".into()),
        ..Collections::default()
    };
    let text = permafrost::to_text(&value, &registry).unwrap();
    let restored: Collections = permafrost::from_text_as(&text, &registry).unwrap();
    assert_eq!(restored, value);
}

#[test]
fn read_into_repopulates_in_place() {
    let mut registry = TypeRegistry::new();
    registry.register::<Job>();

    let bytes = permafrost::to_bytes(
        &Job {
            phase: Phase::Running,
            steps: 7,
        },
        &registry,
    )
    .unwrap();

    let mut target = Job {
        phase: Phase::Idle,
        steps: 99,
    };
    permafrost::read_into(&bytes, &registry, &mut target).unwrap();
    assert_eq!(target.phase, Phase::Running);
    assert_eq!(target.steps, 7);
}

#[test]
fn clone_value_deep_copies() {
    let mut registry = TypeRegistry::new();
    registry.register::<Job>();

    let original = Job {
        phase: Phase::Running,
        steps: 3,
    };
    let copy = permafrost::clone_value(&original, &registry).unwrap();
    let copy = copy.take::<Shared<Job>>().unwrap();
    assert_eq!(*copy.read(), original);
}

#[test]
fn untyped_slots_carry_concrete_values() {
    #[derive(Debug, Reflect)]
    #[reflect(default)]
    struct Envelope {
        tag: String,
        payload: Box<dyn permafrost::Reflect>,
    }

    impl Default for Envelope {
        fn default() -> Self {
            Self {
                tag: String::new(),
                payload: Box::new(()),
            }
        }
    }

    let mut registry = TypeRegistry::new();
    registry.register::<Envelope>();
    registry.register::<Job>();

    let value = Envelope {
        tag: "job".into(),
        payload: Box::new(Job {
            phase: Phase::Done,
            steps: 4,
        }),
    };
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Envelope = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored.tag, "job");
    let inner = restored.payload.downcast_ref::<Shared<Job>>().unwrap();
    assert_eq!(inner.read().steps, 4);
    assert_eq!(inner.read().phase, Phase::Done);
}
