//! Statically known types and their descriptors.
//!
//! [`Described`] bridges Rust types into the descriptor model: every
//! implementation carries its reference-containment answer as an associated
//! const (computed per instantiation at compile time) and can produce the
//! interned [`TypeDesc`] for the dynamic paths. [`Blittable`] additionally
//! marks types whose every bit pattern is a valid value.

use crate::desc::{TypeDesc, TypeDescBuilder};
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::LazyLock;

/// A type with a process-wide descriptor and a compile-time
/// reference-containment answer.
///
/// # Safety
///
/// `CONTAINS_REFS` must be `true` whenever instances of the type are, or
/// transitively contain, managed references ([`crate::ObjectRef`]); the
/// checked region casts rely on it. `descriptor()` must describe the actual
/// layout of the type. Implement through [`describe_struct!`] and
/// [`describe_enum!`] rather than by hand.
///
/// [`describe_struct!`]: crate::describe_struct
/// [`describe_enum!`]: crate::describe_enum
pub unsafe trait Described: 'static {
    /// Whether the type is, or transitively contains, managed references.
    const CONTAINS_REFS: bool;

    /// The interned descriptor for this type. Repeated calls return the same
    /// `&'static TypeDesc`, so descriptor identity is type identity.
    fn descriptor() -> &'static TypeDesc;
}

/// A type whose bit representation contains no managed references and for
/// which every bit pattern of the right size is a valid value.
///
/// # Safety
///
/// Implementors guarantee both properties above. `bool` and `char` are
/// deliberately not blittable: their representations are restricted.
pub unsafe trait Blittable: Described + Copy {}

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, &'static TypeDesc>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Interns one descriptor per distinct `T` for the process lifetime.
///
/// The descriptor is built outside the lock (field descriptors intern
/// recursively); a lost race leaks one duplicate and the first insert wins,
/// so identity stays stable.
#[doc(hidden)]
pub fn intern<T: 'static>(build: impl FnOnce() -> TypeDesc) -> &'static TypeDesc {
    let id = TypeId::of::<T>();
    if let Some(desc) = REGISTRY.read().get(&id).copied() {
        return desc;
    }
    let built: &'static TypeDesc = Box::leak(Box::new(build()));
    let mut map = REGISTRY.write();
    *map.entry(id).or_insert(built)
}

macro_rules! primitive_impls {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        unsafe impl Described for $ty {
            const CONTAINS_REFS: bool = false;

            fn descriptor() -> &'static TypeDesc {
                intern::<$ty>(|| {
                    TypeDesc::primitive($name, size_of::<$ty>(), align_of::<$ty>())
                })
            }
        }
    )*};
}

primitive_impls! {
    bool => "Boolean",
    char => "Char",
    i8 => "Int8",
    u8 => "UInt8",
    i16 => "Int16",
    u16 => "UInt16",
    i32 => "Int32",
    u32 => "UInt32",
    i64 => "Int64",
    u64 => "UInt64",
    f32 => "Float32",
    f64 => "Float64",
    isize => "NativeInt",
    usize => "NativeUInt",
}

macro_rules! blittable_impls {
    ($($ty:ty),* $(,)?) => {$(
        unsafe impl Blittable for $ty {}
    )*};
}

blittable_impls! {
    i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, isize, usize,
}

unsafe impl Described for () {
    const CONTAINS_REFS: bool = false;

    fn descriptor() -> &'static TypeDesc {
        intern::<()>(|| TypeDescBuilder::value("Unit").size(0).align(1).build())
    }
}

unsafe impl<T: 'static> Described for *const T {
    const CONTAINS_REFS: bool = false;

    fn descriptor() -> &'static TypeDesc {
        intern::<*const T>(|| {
            TypeDesc::pointer(
                type_name::<*const T>(),
                size_of::<*const T>(),
                align_of::<*const T>(),
            )
        })
    }
}

unsafe impl<T: 'static> Described for *mut T {
    const CONTAINS_REFS: bool = false;

    fn descriptor() -> &'static TypeDesc {
        intern::<*mut T>(|| {
            TypeDesc::pointer(
                type_name::<*mut T>(),
                size_of::<*mut T>(),
                align_of::<*mut T>(),
            )
        })
    }
}

unsafe impl<T: 'static> Blittable for *const T {}
unsafe impl<T: 'static> Blittable for *mut T {}

unsafe impl<T: Described, const N: usize> Described for [T; N] {
    const CONTAINS_REFS: bool = T::CONTAINS_REFS;

    fn descriptor() -> &'static TypeDesc {
        intern::<[T; N]>(|| {
            let mut builder = TypeDescBuilder::value(type_name::<[T; N]>())
                .size(size_of::<[T; N]>())
                .align(align_of::<[T; N]>());
            for i in 0..N {
                builder = builder.field(format!("[{i}]"), i * size_of::<T>(), T::descriptor());
            }
            builder.build()
        })
    }
}

unsafe impl<T: Blittable, const N: usize> Blittable for [T; N] {}

macro_rules! tuple_impls {
    ($( ($($idx:tt $name:ident),+) ),+ $(,)?) => {$(
        unsafe impl<$($name: Described),+> Described for ($($name,)+) {
            const CONTAINS_REFS: bool = false $(|| $name::CONTAINS_REFS)+;

            fn descriptor() -> &'static TypeDesc {
                intern::<($($name,)+)>(|| {
                    let builder = TypeDescBuilder::value(type_name::<($($name,)+)>())
                        .size(size_of::<($($name,)+)>())
                        .align(align_of::<($($name,)+)>());
                    $(
                        let builder = builder.field(
                            stringify!($idx),
                            core::mem::offset_of!(Self, $idx),
                            $name::descriptor(),
                        );
                    )+
                    builder.build()
                })
            }
        }

        unsafe impl<$($name: Blittable),+> Blittable for ($($name,)+) {}
    )+};
}

tuple_impls! {
    (0 A),
    (0 A, 1 B),
    (0 A, 1 B, 2 C),
    (0 A, 1 B, 2 C, 3 D),
}

/// Implements [`Described`] for a user value type from its field list.
///
/// ```
/// use managed_layout::describe_struct;
///
/// #[derive(Copy, Clone)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
/// describe_struct!(Point { x: f64, y: f64 });
/// ```
#[macro_export]
macro_rules! describe_struct {
    ($ty:ty { $($field:ident: $fty:ty),* $(,)? }) => {
        unsafe impl $crate::Described for $ty {
            const CONTAINS_REFS: bool = false $(|| <$fty as $crate::Described>::CONTAINS_REFS)*;

            fn descriptor() -> &'static $crate::TypeDesc {
                $crate::described::intern::<$ty>(|| {
                    #[allow(unused_mut)]
                    let mut builder = $crate::TypeDescBuilder::value(::core::any::type_name::<$ty>())
                        .size(::core::mem::size_of::<$ty>())
                        .align(::core::mem::align_of::<$ty>());
                    $(
                        builder = builder.field(
                            stringify!($field),
                            ::core::mem::offset_of!($ty, $field),
                            <$fty as $crate::Described>::descriptor(),
                        );
                    )*
                    builder.build()
                })
            }
        }
    };
}

/// Implements [`Described`] for a C-like enum (never reference-containing).
#[macro_export]
macro_rules! describe_enum {
    ($ty:ty) => {
        unsafe impl $crate::Described for $ty {
            const CONTAINS_REFS: bool = false;

            fn descriptor() -> &'static $crate::TypeDesc {
                $crate::described::intern::<$ty>(|| {
                    $crate::TypeDesc::enumeration(
                        ::core::any::type_name::<$ty>(),
                        ::core::mem::size_of::<$ty>(),
                        ::core::mem::align_of::<$ty>(),
                    )
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::TypeKind;

    fn assert_blittable<T: Blittable>() {}

    #[test]
    fn primitive_descriptors_are_interned_once() {
        let a = u32::descriptor();
        let b = u32::descriptor();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.name(), "UInt32");
        assert_eq!(a.kind(), TypeKind::Primitive);
        assert_eq!(a.size(), 4);
    }

    #[test]
    fn pointer_types_are_pointer_kind() {
        let d = <*const u8>::descriptor();
        assert_eq!(d.kind(), TypeKind::Pointer);
        assert_eq!(d.size(), size_of::<usize>());
        assert!(!<*mut u64>::CONTAINS_REFS);
    }

    #[test]
    fn tuple_descriptors_carry_field_offsets() {
        let d = <(u8, u64)>::descriptor();
        assert_eq!(d.kind(), TypeKind::Value);
        assert_eq!(d.size(), size_of::<(u8, u64)>());
        let fields = d.instance_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].offset, core::mem::offset_of!((u8, u64), 0));
        assert_eq!(fields[1].offset, core::mem::offset_of!((u8, u64), 1));
        assert!(!<(u8, u64)>::CONTAINS_REFS);
    }

    #[test]
    fn array_descriptors_enumerate_elements() {
        let d = <[u16; 3]>::descriptor();
        assert_eq!(d.instance_fields().len(), 3);
        assert_eq!(d.instance_fields()[2].offset, 4);
        assert!(!<[u16; 3]>::CONTAINS_REFS);
    }

    #[test]
    fn blittable_markers_cover_the_scalar_set() {
        assert_blittable::<u8>();
        assert_blittable::<f64>();
        assert_blittable::<*mut u8>();
        assert_blittable::<(u32, u32)>();
        assert_blittable::<[i64; 4]>();
    }

    #[derive(Copy, Clone)]
    struct Pair {
        lo: u32,
        hi: u32,
    }
    describe_struct!(Pair { lo: u32, hi: u32 });

    #[test]
    fn described_structs_expose_their_fields() {
        let d = Pair::descriptor();
        assert_eq!(d.instance_fields().len(), 2);
        assert_eq!(d.instance_fields()[1].name, "hi");
        assert_eq!(d.instance_fields()[1].offset, core::mem::offset_of!(Pair, hi));
        assert!(!Pair::CONTAINS_REFS);
    }

    #[derive(Copy, Clone)]
    #[repr(u8)]
    enum Tone {
        Low,
        High,
    }
    describe_enum!(Tone);

    #[test]
    fn described_enums_are_enum_kind() {
        let _ = (Tone::Low, Tone::High);
        let d = Tone::descriptor();
        assert_eq!(d.kind(), TypeKind::Enum);
        assert_eq!(d.size(), 1);
        assert!(!Tone::CONTAINS_REFS);
    }
}
