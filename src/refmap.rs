//! Reference maps: where the managed references live.
//!
//! Classification answers *whether* a type embeds managed references; a
//! [`RefMap`] records *where*, as a word-indexed bitmap over the instance
//! layout. Derived entirely from descriptors, it is a fact about the host
//! object model, not a collector of its own.

use crate::desc::{align_up, TypeDesc, TypeKind};
use bitvec::prelude::*;

/// Word-indexed bitmap of managed-reference slots within an instance layout.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RefMap {
    bitmap: BitVec<usize, Lsb0>,
}

impl RefMap {
    /// Marks the word at `word_index` as holding a managed reference.
    pub fn set(&mut self, word_index: usize) {
        if word_index >= self.bitmap.len() {
            self.bitmap.resize(word_index + 1, false);
        }
        self.bitmap.set(word_index, true);
    }

    /// Unions another map into this one.
    pub fn merge(&mut self, other: &RefMap) {
        if other.bitmap.len() > self.bitmap.len() {
            self.bitmap.resize(other.bitmap.len(), false);
        }
        self.bitmap |= &other.bitmap;
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.not_any()
    }

    /// Byte offsets of every reference slot, in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.bitmap.iter_ones().map(|word| word * size_of::<usize>())
    }
}

/// Invokes `visitor` with the byte offset of every managed-reference slot in
/// an instance of `ty`, starting from `offset`.
pub fn visit_reference_offsets(ty: &'static TypeDesc, offset: usize, visitor: &mut dyn FnMut(usize)) {
    match ty.kind() {
        TypeKind::Reference => visitor(offset),
        TypeKind::Value => match ty.nullable_of() {
            // repr(C) optional layout: one flag byte, then the payload at its
            // natural alignment.
            Some(inner) => {
                visit_reference_offsets(inner, offset + align_up(1, inner.align()), visitor)
            }
            None => {
                for field in ty.instance_fields() {
                    visit_reference_offsets(field.ty, offset + field.offset, visitor);
                }
            }
        },
        TypeKind::Primitive | TypeKind::Pointer | TypeKind::Enum => {}
    }
}

/// Builds the word-indexed reference map for instances of `ty`.
///
/// Reference slots are word-aligned in any layout the host produces; an
/// unaligned slot indicates a corrupt descriptor.
pub fn reference_map(ty: &'static TypeDesc) -> RefMap {
    let word = size_of::<usize>();
    let mut map = RefMap::default();
    visit_reference_offsets(ty, 0, &mut |offset| {
        debug_assert!(
            offset % word == 0,
            "managed reference at unaligned offset {offset} in `{}`",
            ty.name()
        );
        map.set(offset / word);
    });
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::TypeDescBuilder;

    fn object_desc() -> &'static TypeDesc {
        Box::leak(Box::new(TypeDesc::reference("Object")))
    }

    #[test]
    fn primitive_layouts_have_empty_maps() {
        let prim = Box::leak(Box::new(TypeDesc::primitive("Int64", 8, 8)));
        assert!(reference_map(prim).is_empty());
    }

    #[test]
    fn nested_reference_offsets_accumulate() {
        let obj = object_desc();
        let int64 = Box::leak(Box::new(TypeDesc::primitive("Int64", 8, 8)));
        let inner = TypeDescBuilder::value("Inner")
            .size(16)
            .align(8)
            .field("count", 0, int64)
            .field("handle", 8, obj)
            .finish();
        let outer = TypeDescBuilder::value("Outer")
            .size(32)
            .align(8)
            .field("head", 0, obj)
            .field("nested", 8, inner)
            .finish();

        let map = reference_map(outer);
        let offsets: Vec<_> = map.offsets().collect();
        // head at 0, inner.handle at 8 + 8.
        assert_eq!(offsets, vec![0, 16]);
    }

    #[test]
    fn merge_unions_slots() {
        let mut a = RefMap::default();
        a.set(0);
        let mut b = RefMap::default();
        b.set(3);
        a.merge(&b);
        let offsets: Vec<_> = a.offsets().collect();
        assert_eq!(offsets, vec![0, 3 * size_of::<usize>()]);
    }

    #[test]
    fn nullable_payload_slot_is_flag_aligned() {
        let obj = object_desc();
        let wrapped = TypeDescBuilder::value("Nullable<Object>")
            .size(2 * size_of::<usize>())
            .align(align_of::<usize>())
            .nullable_of(obj)
            .finish();
        let offsets: Vec<_> = reference_map(wrapped).offsets().collect();
        assert_eq!(offsets, vec![size_of::<usize>()]);
    }
}
