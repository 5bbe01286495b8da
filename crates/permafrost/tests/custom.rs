//! Surrogates, converters, the custom save/load protocol and the
//! after-read hook.

use core::fmt;
use core::str::FromStr;

use permafrost::derive::Reflect;
use permafrost::dynamic::{PropertyBag, UnknownObject, UnknownPayload};
use permafrost::{AfterRead, CustomSerialize, Error, Shared, TypeRegistry, WriteOptions};

// -----------------------------------------------------------------------------
// Surrogates

#[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
#[reflect(default)]
struct Temperature {
    celsius: f64,
}

fn surrogate_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_surrogate::<Temperature, f64>(|t| t.celsius, |celsius| Temperature {
        celsius,
    });
    registry
}

#[test]
fn surrogates_replace_the_wire_form() {
    let registry = surrogate_registry();
    let bytes = permafrost::to_bytes(&Temperature { celsius: 21.5 }, &registry).unwrap();
    let restored: Temperature = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, Temperature { celsius: 21.5 });
}

#[test]
fn a_surrogate_payload_survives_an_ignorant_relay() {
    let registry = surrogate_registry();
    let bytes = permafrost::to_bytes(&Temperature { celsius: 21.5 }, &registry).unwrap();

    // A reader with no local type keeps the surrogate value as-is.
    let blank = TypeRegistry::new();
    let placeholder = permafrost::from_bytes(&bytes, &blank).unwrap();
    let placeholder = placeholder.take::<Shared<UnknownObject>>().unwrap();
    {
        let value = placeholder.read();
        match value.payload() {
            UnknownPayload::Surrogate(inner) => {
                assert_eq!(inner.downcast_ref::<f64>(), Some(&21.5));
            }
            _ => panic!("expected a surrogate payload"),
        }
    }

    let replayed = permafrost::to_bytes(&placeholder, &blank).unwrap();
    let restored: Temperature = permafrost::from_bytes_as(&replayed, &registry).unwrap();
    assert_eq!(restored, Temperature { celsius: 21.5 });
}

#[test]
fn surrogate_cycles_are_rejected() {
    let mut registry = TypeRegistry::new();
    registry.register_surrogate::<Temperature, Temperature>(|t| *t, |t| t);

    let error = permafrost::to_bytes(&Temperature { celsius: 1.0 }, &registry).unwrap_err();
    assert!(matches!(error, Error::SurrogateCycle { .. }));
}

// -----------------------------------------------------------------------------
// Converters

#[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
#[reflect(default)]
struct Fraction {
    numerator: i64,
    denominator: i64,
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Fraction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (numerator, denominator) = s.split_once('/').ok_or("missing `/`")?;
        Ok(Self {
            numerator: numerator.parse().map_err(|_| "bad numerator")?,
            denominator: denominator.parse().map_err(|_| "bad denominator")?,
        })
    }
}

fn converter_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_converter::<Fraction>();
    registry
}

#[test]
fn converters_round_trip_through_text() {
    let registry = converter_registry();
    let value = Fraction {
        numerator: 3,
        denominator: 4,
    };
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Fraction = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, value);
}

#[test]
fn converter_text_survives_without_a_parser() {
    let value = Fraction {
        numerator: 3,
        denominator: 4,
    };
    let bytes = permafrost::to_bytes(&value, &converter_registry()).unwrap();

    // This side has the type but never registered the converter.
    let mut plain = TypeRegistry::new();
    plain.register::<Fraction>();
    let placeholder = permafrost::from_bytes(&bytes, &plain).unwrap();
    let placeholder = placeholder.take::<Shared<UnknownObject>>().unwrap();
    {
        let value = placeholder.read();
        match value.payload() {
            UnknownPayload::Text(text) => assert_eq!(text.as_deref(), Some("3/4")),
            _ => panic!("expected a text payload"),
        }
    }

    let replayed = permafrost::to_bytes(&placeholder, &plain).unwrap();
    let restored: Fraction = permafrost::from_bytes_as(&replayed, &converter_registry()).unwrap();
    assert_eq!(restored, value);
}

#[test]
fn ignoring_the_converter_writes_structure() {
    let registry = converter_registry();
    let value = Fraction {
        numerator: -7,
        denominator: 2,
    };
    let bytes =
        permafrost::to_bytes_with(&value, &registry, WriteOptions::IGNORE_CONVERTER).unwrap();
    let restored: Fraction = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, value);
}

// -----------------------------------------------------------------------------
// Custom protocol

#[derive(Debug, Default, PartialEq, Reflect)]
#[reflect(default)]
struct Manifest {
    entries: Vec<String>,
    fingerprint: u64,
}

fn fingerprint_of(entries: &[String]) -> u64 {
    entries
        .iter()
        .fold(17u64, |acc, entry| acc.wrapping_mul(31).wrapping_add(entry.len() as u64))
}

impl CustomSerialize for Manifest {
    fn save(&self, bag: &mut PropertyBag) -> Result<(), Error> {
        // The fingerprint is derived, so only the entries go out.
        bag.set("entries", Box::new(self.entries.clone()));
        Ok(())
    }

    fn load(bag: &mut PropertyBag) -> Result<Self, Error> {
        let entries: Vec<String> =
            bag.remove("entries").ok_or_else(|| Error::Conversion {
                type_path: "custom::Manifest".to_owned(),
                message: "bag is missing `entries`".to_owned(),
            })?;
        Ok(Self {
            fingerprint: fingerprint_of(&entries),
            entries,
        })
    }
}

fn manifest_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_custom::<Manifest>();
    registry
}

fn sample_manifest() -> Manifest {
    let entries = vec!["alpha".to_owned(), "beta".to_owned()];
    Manifest {
        fingerprint: fingerprint_of(&entries),
        entries,
    }
}

#[test]
fn custom_protocols_speak_in_bags() {
    let registry = manifest_registry();
    let value = sample_manifest();
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Manifest = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, value);
    assert_eq!(restored.fingerprint, fingerprint_of(&restored.entries));
}

#[test]
fn a_bag_degrades_to_members_without_a_loader() {
    let bytes = permafrost::to_bytes(&sample_manifest(), &manifest_registry()).unwrap();

    // The type exists here but its custom protocol does not, so bag
    // entries land member by member and the rest stays default.
    let mut plain = TypeRegistry::new();
    plain.register::<Manifest>();
    let restored: Manifest = permafrost::from_bytes_as(&bytes, &plain).unwrap();
    assert_eq!(restored.entries, vec!["alpha".to_owned(), "beta".to_owned()]);
    assert_eq!(restored.fingerprint, 0);
}

#[test]
fn bags_survive_a_blind_relay() {
    let value = sample_manifest();
    let bytes = permafrost::to_bytes(&value, &manifest_registry()).unwrap();

    let blank = TypeRegistry::new();
    let placeholder = permafrost::from_bytes(&bytes, &blank).unwrap();
    let placeholder = placeholder.take::<Shared<UnknownObject>>().unwrap();
    {
        let held = placeholder.read();
        match held.payload() {
            UnknownPayload::Bag(bag) => assert_eq!(bag.len(), 1),
            _ => panic!("expected a bag payload"),
        }
    }

    let replayed = permafrost::to_bytes(&placeholder, &blank).unwrap();
    let restored: Manifest = permafrost::from_bytes_as(&replayed, &manifest_registry()).unwrap();
    assert_eq!(restored, value);
}

#[test]
fn ignoring_the_custom_protocol_writes_structure() {
    let registry = manifest_registry();
    let mut value = sample_manifest();
    value.fingerprint = 0xDEAD;
    let bytes = permafrost::to_bytes_with(&value, &registry, WriteOptions::IGNORE_CUSTOM).unwrap();

    // Structural payloads carry every member verbatim, so the doctored
    // fingerprint survives instead of being recomputed by `load`.
    let restored: Manifest = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored, value);
    assert_eq!(restored.fingerprint, 0xDEAD);
}

// -----------------------------------------------------------------------------
// After-read

#[derive(Debug, Default, Reflect)]
#[reflect(default)]
struct Catalog {
    words: Vec<String>,
    #[reflect(skip)]
    total_len: usize,
}

impl AfterRead for Catalog {
    fn after_read(&mut self) {
        self.total_len = self.words.iter().map(String::len).sum();
    }
}

#[test]
fn after_read_rebuilds_derived_state() {
    let mut registry = TypeRegistry::new();
    registry.register_after_read::<Catalog>();

    let value = Catalog {
        words: vec!["one".to_owned(), "three".to_owned()],
        total_len: 0,
    };
    let bytes = permafrost::to_bytes(&value, &registry).unwrap();
    let restored: Catalog = permafrost::from_bytes_as(&bytes, &registry).unwrap();
    assert_eq!(restored.words, value.words);
    assert_eq!(restored.total_len, 8);
}
