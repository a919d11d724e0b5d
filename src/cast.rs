//! Region reinterpretation.
//!
//! One explicit reinterpret primitive, exposed through two tiers: checked
//! entry points that consult the type classifier and fail descriptively, and
//! unchecked entry points whose preconditions are the caller's contract.
//!
//! Element types are assumed bit-pattern tolerant: reinterpreting a region
//! into a type with a restricted representation (a `bool`-like payload) is
//! the caller's hazard, exactly like writing through any other dangerous
//! entry point.

use crate::described::Described;
use crate::error::CastError;
use crate::span::{ReadOnlySpan, Span};
use std::any::type_name;
use std::ptr::NonNull;
use tracing::debug;

/// The reinterpret primitive every cast routes through: same base address,
/// element count recomputed for the new element size (floor division; the
/// remainder bytes become unreachable through the new region).
///
/// # Safety
///
/// `ptr` must be the base of a region of `len` initialized `F` elements, and
/// the reinterpreted region must uphold `T`'s alignment and bit-validity
/// requirements.
unsafe fn reinterpret<F, T>(ptr: NonNull<F>, len: usize) -> (NonNull<T>, usize) {
    let new_len = if size_of::<T>() == 0 {
        0
    } else {
        len * size_of::<F>() / size_of::<T>()
    };
    (ptr.cast(), new_len)
}

fn check_cast<F: Described, T: Described>(base: usize, len: usize) -> Result<(), CastError> {
    if F::CONTAINS_REFS {
        return Err(CastError::ReferenceContaining(type_name::<F>()));
    }
    if T::CONTAINS_REFS {
        return Err(CastError::ReferenceContaining(type_name::<T>()));
    }
    if size_of::<F>() == 0 {
        return Err(CastError::ZeroSized(type_name::<F>()));
    }
    if size_of::<T>() == 0 {
        return Err(CastError::ZeroSized(type_name::<T>()));
    }
    // An empty region has no base worth checking; the result is empty too.
    if len > 0 && base % align_of::<T>() != 0 {
        return Err(CastError::Misaligned {
            ty: type_name::<T>(),
            align: align_of::<T>(),
        });
    }
    Ok(())
}

/// Checked reinterpretation of a mutable region from `F` elements to `T`
/// elements.
///
/// Rejects reference-containing element types on either side (punning a
/// traced reference exposes raw bytes where the collector expects a
/// reference), zero-sized element types, and a base address misaligned for
/// `T`. Applies uniformly to optional-wrapped element types; the size used
/// is the full wrapped layout, presence flag included.
pub fn cast<'a, F: Described, T: Described>(span: Span<'a, F>) -> Result<Span<'a, T>, CastError> {
    match check_cast::<F, T>(span.data_ptr().as_ptr() as usize, span.len()) {
        Ok(()) if span.is_empty() => Ok(Span::empty()),
        Ok(()) => {
            // SAFETY: preconditions validated above; the source region is a
            // live exclusive borrow which the result inherits.
            let (ptr, len) = unsafe { reinterpret::<F, T>(span.data_ptr(), span.len()) };
            Ok(unsafe { Span::from_ptr_len(ptr, len) })
        }
        Err(err) => {
            debug!(from = type_name::<F>(), to = type_name::<T>(), %err, "rejected region cast");
            Err(err)
        }
    }
}

/// Checked reinterpretation of a read-only region; see [`cast`].
pub fn cast_read_only<'a, F: Described, T: Described>(
    span: ReadOnlySpan<'a, F>,
) -> Result<ReadOnlySpan<'a, T>, CastError> {
    match check_cast::<F, T>(span.data_ptr().as_ptr() as usize, span.len()) {
        Ok(()) if span.is_empty() => Ok(ReadOnlySpan::empty()),
        Ok(()) => {
            // SAFETY: preconditions validated above.
            let (ptr, len) = unsafe { reinterpret::<F, T>(span.data_ptr(), span.len()) };
            Ok(unsafe { ReadOnlySpan::from_ptr_len(ptr, len) })
        }
        Err(err) => {
            debug!(from = type_name::<F>(), to = type_name::<T>(), %err, "rejected region cast");
            Err(err)
        }
    }
}

/// Unchecked reinterpretation of a mutable region. No validation of any
/// kind is performed.
///
/// # Safety
///
/// Neither `F` nor `T` may be reference-containing, both must have nonzero
/// size, the base address must be aligned for `T`, and the reinterpreted
/// bytes must form valid `T` values.
pub unsafe fn cast_unchecked<'a, F, T>(span: Span<'a, F>) -> Span<'a, T> {
    let (ptr, len) = unsafe { reinterpret::<F, T>(span.data_ptr(), span.len()) };
    unsafe { Span::from_ptr_len(ptr, len) }
}

/// Unchecked reinterpretation of a read-only region.
///
/// # Safety
///
/// As for [`cast_unchecked`].
pub unsafe fn cast_read_only_unchecked<'a, F, T>(span: ReadOnlySpan<'a, F>) -> ReadOnlySpan<'a, T> {
    let (ptr, len) = unsafe { reinterpret::<F, T>(span.data_ptr(), span.len()) };
    unsafe { ReadOnlySpan::from_ptr_len(ptr, len) }
}
