use managed_layout::{
    classify, classify_with, contains_references, reference_map, FieldDesc, FieldProvider,
    ObjectRef, TypeDesc, TypeDescBuilder, TypeKey,
};
use std::collections::HashMap;

fn object_desc() -> &'static TypeDesc {
    Box::leak(Box::new(TypeDesc::reference("Object")))
}

fn primitive(name: &str, size: usize) -> &'static TypeDesc {
    Box::leak(Box::new(TypeDesc::primitive(name, size, size)))
}

/// Builds a chain of `depth` single-field value types ending in `leaf`.
fn nested_chain(depth: usize, leaf: &'static TypeDesc) -> &'static TypeDesc {
    let mut current = leaf;
    for level in 0..depth {
        current = TypeDescBuilder::value(format!("Level{level}"))
            .size(current.size())
            .align(current.align())
            .field("inner", 0, current)
            .finish();
    }
    current
}

#[test]
fn classification_follows_the_structural_rule() {
    assert!(!classify(primitive("Int32", 4)));
    assert!(!classify(Box::leak(Box::new(TypeDesc::pointer("Byte*", 8, 8)))));
    assert!(!classify(Box::leak(Box::new(TypeDesc::enumeration("Kind", 4, 4)))));
    assert!(classify(object_desc()));

    let all_primitive = TypeDescBuilder::value("Vec2")
        .size(16)
        .align(8)
        .field("x", 0, primitive("Float64", 8))
        .field("y", 8, primitive("Float64", 8))
        .finish();
    assert!(!classify(all_primitive));

    let with_handle = TypeDescBuilder::value("Entry")
        .size(16)
        .align(8)
        .field("value", 0, primitive("Int64", 8))
        .field("target", 8, object_desc())
        .finish();
    assert!(classify(with_handle));
}

#[test]
fn deeply_nested_shapes_classify_by_their_leaf() {
    let with_reference = nested_chain(5, object_desc());
    assert!(classify(with_reference));

    let with_primitive = nested_chain(5, primitive("Int64", 8));
    assert!(!classify(with_primitive));
}

#[test]
fn statically_known_nested_tuples_classify_by_their_leaf() {
    type RefLeaf = (u64, (u32, (u16, (u8, (usize, ObjectRef)))));
    type PrimLeaf = (u64, (u32, (u16, (u8, (usize, usize)))));
    assert!(contains_references::<RefLeaf>());
    assert!(!contains_references::<PrimLeaf>());
    assert!(contains_references::<ObjectRef>());
    assert!(!contains_references::<f64>());
    assert!(!contains_references::<*mut u8>());
}

#[test]
fn classification_is_deterministic_within_the_process() {
    let ty = nested_chain(3, object_desc());
    let first = classify(ty);
    for _ in 0..100 {
        assert_eq!(classify(ty), first);
    }
}

/// A provider standing in for the host's reflection layer: field tables live
/// beside the descriptors instead of inside them.
struct SideTableProvider {
    tables: HashMap<TypeKey, &'static [FieldDesc]>,
}

impl FieldProvider for SideTableProvider {
    fn instance_fields(&self, ty: &'static TypeDesc) -> &'static [FieldDesc] {
        self.tables.get(&ty.key()).copied().unwrap_or(&[])
    }
}

#[test]
fn external_field_providers_drive_classification() {
    let holder = TypeDescBuilder::value("OpaqueHolder").size(8).align(8).finish();
    let fields: &'static [FieldDesc] = Box::leak(Box::new([FieldDesc {
        name: "handle".to_string(),
        offset: 0,
        ty: object_desc(),
    }]));
    let provider = SideTableProvider {
        tables: HashMap::from([(holder.key(), fields)]),
    };
    assert!(classify_with(&provider, holder));
}

#[test]
fn reference_maps_locate_every_traced_slot() {
    let word = size_of::<usize>();
    let pair = TypeDescBuilder::value("HandlePair")
        .size(3 * word)
        .align(word)
        .field("first", 0, object_desc())
        .field("gap", word, primitive("NativeInt", word))
        .field("second", 2 * word, object_desc())
        .finish();

    let map = reference_map(pair);
    assert!(!map.is_empty());
    assert_eq!(map.offsets().collect::<Vec<_>>(), vec![0, 2 * word]);

    let plain = TypeDescBuilder::value("Plain")
        .size(word)
        .align(word)
        .field("value", 0, primitive("NativeInt", word))
        .finish();
    assert!(reference_map(plain).is_empty());
}
