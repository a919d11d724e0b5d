//! Reference-containment classification.
//!
//! Answers the one structural question the rest of the crate is built on:
//! does an instance of this type embed any managed reference? The answer is a
//! pure function of the type's structure, so it is memoized process-wide and
//! never invalidated.

use crate::desc::{FieldDesc, TypeDesc, TypeKey, TypeKind};
use crate::described::Described;
use dashmap::DashMap;
use std::sync::LazyLock;
use tracing::trace;

/// Process-wide classification cache. Keys are descriptor identities; values
/// are written once and never change. Concurrent population is harmless:
/// redundant computation converges to the same result.
static CACHE: LazyLock<DashMap<TypeKey, bool>> = LazyLock::new(DashMap::new);

/// Value-type field graphs are acyclic under the host type system's ordinary
/// rules; a graph deeper than this was constructed by unchecked means and is
/// out of contract.
const MAX_CLASSIFY_DEPTH: usize = 512;

/// Enumerates the instance fields of a type: the classifier's only call into
/// the surrounding runtime's type system.
///
/// The returned set must contain all declared instance fields, public and
/// non-public, inherited fields included, each with its field type.
pub trait FieldProvider {
    fn instance_fields(&self, ty: &'static TypeDesc) -> &'static [FieldDesc];
}

/// Default provider: reads the field table embedded in the descriptor, which
/// the host's reflection layer populated at descriptor-construction time.
pub struct EmbeddedFields;

impl FieldProvider for EmbeddedFields {
    fn instance_fields(&self, ty: &'static TypeDesc) -> &'static [FieldDesc] {
        ty.instance_fields()
    }
}

/// Whether instances of the described type are, or transitively contain,
/// managed references. Memoized per distinct type for the process lifetime.
pub fn classify(ty: &'static TypeDesc) -> bool {
    classify_with(&EmbeddedFields, ty)
}

/// [`classify`] with an explicit field provider.
pub fn classify_with<P: FieldProvider>(provider: &P, ty: &'static TypeDesc) -> bool {
    compute(provider, ty, 0)
}

/// Whether `T` is, or transitively contains, managed references.
///
/// The statically specialized path: the answer is an associated const of the
/// instantiation, computed at compile time, with no cache lookup at all.
pub fn contains_references<T: Described>() -> bool {
    T::CONTAINS_REFS
}

fn compute<P: FieldProvider>(provider: &P, ty: &'static TypeDesc, depth: usize) -> bool {
    if let Some(hit) = CACHE.get(&ty.key()) {
        return *hit;
    }
    if depth > MAX_CLASSIFY_DEPTH {
        panic!(
            "type graph deeper than {} while classifying `{}`; value-type layouts are assumed acyclic",
            MAX_CLASSIFY_DEPTH,
            ty.name()
        );
    }

    let result = match ty.kind() {
        TypeKind::Primitive | TypeKind::Pointer | TypeKind::Enum => false,
        TypeKind::Reference => true,
        TypeKind::Value => match ty.nullable_of() {
            Some(inner) => compute(provider, inner, depth + 1),
            None => provider
                .instance_fields(ty)
                .iter()
                .any(|field| compute(provider, field.ty, depth + 1)),
        },
    };

    CACHE.insert(ty.key(), result);
    trace!(ty = ty.name(), contains_refs = result, "classified type");
    result
}
