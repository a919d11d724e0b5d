//! Optional-value containers with a pinned layout.
//!
//! [`Nullable<T>`] is the in-memory "optional T": a presence flag followed by
//! a payload slot. The layout is pinned with `repr(C)` rather than inferred
//! from declaration order, because declaration-order layout is not a portable
//! guarantee. The flag is stored as a byte, not `bool`, so the container is
//! itself bit-pattern tolerant and regions of `Nullable<T>` can participate
//! in casts.
//!
//! The payload accessors [`Nullable::value_ref`] and [`Nullable::value_mut`]
//! bypass the presence flag entirely: when presence is false the payload
//! bits are leftover data (zero-filled at construction, or a previous value
//! after [`Nullable::clear`]), not a guaranteed zero.

use crate::desc::{align_up, TypeDesc, TypeDescBuilder};
use crate::described::{intern, Blittable, Described};
use std::any::type_name;
use std::fmt::{self, Debug, Formatter};
use std::mem::MaybeUninit;

/// A presence flag and a payload slot, in that order.
#[repr(C)]
pub struct Nullable<T: Copy> {
    has_value: u8,
    value: MaybeUninit<T>,
}

// The flag slot precedes the payload slot, which sits at its natural
// alignment after the single flag byte.
const _: () = assert!(core::mem::offset_of!(Nullable<u64>, has_value) == 0);
const _: () = assert!(core::mem::offset_of!(Nullable<u64>, value) == align_up(1, align_of::<u64>()));
const _: () = assert!(size_of::<Nullable<u32>>() == 8);

impl<T: Copy> Nullable<T> {
    pub fn some(value: T) -> Self {
        Self {
            has_value: 1,
            value: MaybeUninit::new(value),
        }
    }

    /// An absent value. The payload slot is zero-filled, the default bit
    /// pattern of the host object model.
    pub fn none() -> Self
    where
        T: Blittable,
    {
        Self {
            has_value: 0,
            value: MaybeUninit::zeroed(),
        }
    }

    pub fn has_value(&self) -> bool {
        self.has_value != 0
    }

    pub fn get(&self) -> Option<&T> {
        if self.has_value() {
            // SAFETY: the flag is only raised by paths that wrote the payload.
            Some(unsafe { self.value.assume_init_ref() })
        } else {
            None
        }
    }

    pub fn set(&mut self, value: T) {
        self.has_value = 1;
        self.value = MaybeUninit::new(value);
    }

    /// Clears the presence flag. The payload keeps its previous bits.
    pub fn clear(&mut self) {
        self.has_value = 0;
    }

    /// Copies the payload out when present, the zero value otherwise.
    pub fn value_or_default(&self) -> T
    where
        T: Blittable,
    {
        if self.has_value() {
            *self.value_ref()
        } else {
            // SAFETY: the zero pattern is a valid value for blittable T.
            unsafe { MaybeUninit::zeroed().assume_init() }
        }
    }

    /// Reference to the payload slot, irrespective of the presence flag.
    ///
    /// When presence is false the referent is whatever the slot holds:
    /// zero-filled at construction, or a previous value after
    /// [`clear`](Self::clear).
    pub fn value_ref(&self) -> &T
    where
        T: Blittable,
    {
        // SAFETY: the slot is always fully written (some/set) or zero-filled
        // (none); every bit pattern is a valid T for blittable payloads.
        unsafe { self.value.assume_init_ref() }
    }

    /// Mutable reference to the payload slot, irrespective of the presence
    /// flag. The flag is not touched.
    ///
    /// # Safety
    ///
    /// Writing through the returned reference without independently raising
    /// presence (via [`set`](Self::set)) leaves the container's flag and
    /// payload logically inconsistent; callers own that hazard, and the
    /// library never detects it.
    pub unsafe fn value_mut(&mut self) -> &mut T
    where
        T: Blittable,
    {
        // SAFETY: as for value_ref.
        unsafe { self.value.assume_init_mut() }
    }
}

impl<T: Copy> Clone for Nullable<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Copy> Copy for Nullable<T> {}

impl<T: Copy> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Self::some(value)
    }
}

impl<T: Blittable> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::some(v),
            None => Self::none(),
        }
    }
}

impl<T: Copy + Debug> Debug for Nullable<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => write!(f, "{v:?}"),
            None => f.write_str("null"),
        }
    }
}

unsafe impl<T: Described + Copy> Described for Nullable<T> {
    const CONTAINS_REFS: bool = T::CONTAINS_REFS;

    fn descriptor() -> &'static TypeDesc {
        intern::<Nullable<T>>(|| {
            TypeDescBuilder::value(type_name::<Nullable<T>>())
                .size(size_of::<Nullable<T>>())
                .align(align_of::<Nullable<T>>())
                .nullable_of(T::descriptor())
                .build()
        })
    }
}

unsafe impl<T: Blittable> Blittable for Nullable<T> {}
