//! Type-erased managed heap boxes.
//!
//! An [`ObjectRef`] is a shared reference to one heap-allocated value stored
//! after a fixed-size header. The header pins the payload's exact runtime
//! type, so a reference can later be reinterpreted as a typed
//! [`Boxed<T>`](crate::Boxed) view: checked against the header, or unchecked
//! on the caller's word.

use crate::boxed::Boxed;
use crate::desc::TypeDesc;
use crate::described::{intern, Described};
use crate::error::CastError;
use std::alloc::{self, Layout};
use std::any::TypeId;
use std::fmt::{self, Debug, Formatter};
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::trace;

#[cfg(any(feature = "memory-validation", debug_assertions))]
const BOX_MAGIC: u64 = 0x5AFE_B0CE_D000_0000;

/// Owner of one manually allocated, properly aligned block of payload bytes.
pub(crate) struct RawStorage {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl RawStorage {
    fn alloc(layout: Layout) -> Self {
        let ptr = if layout.size() == 0 {
            // Zero-sized payloads get a well-aligned dangling pointer;
            // nothing is allocated or freed.
            NonNull::new(layout.align() as *mut u8).expect("alignment is nonzero")
        } else {
            let raw = unsafe { alloc::alloc(layout) };
            NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout))
        };
        Self { ptr, layout }
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for RawStorage {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated in `alloc` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

/// The fixed-size header every boxed value carries, as dictated by this
/// runtime's object model.
struct BoxHeader {
    #[cfg(any(feature = "memory-validation", debug_assertions))]
    magic: u64,
    type_id: TypeId,
    desc: &'static TypeDesc,
    drop_in_place: unsafe fn(*mut u8),
}

pub(crate) struct ObjectInner {
    header: BoxHeader,
    storage: RawStorage,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        // Payload drops before the backing block frees (RawStorage::drop
        // runs after this).
        unsafe { (self.header.drop_in_place)(self.storage.as_ptr()) };
    }
}

unsafe fn drop_payload<T>(ptr: *mut u8) {
    unsafe { std::ptr::drop_in_place(ptr.cast::<T>()) };
}

/// A managed reference: shared handle to one boxed value on the heap.
///
/// Ownership is the normal heap-object kind: every clone aliases the same
/// storage, and the object is reclaimed when the last reference drops.
/// Reads and writes through any alias are mutually visible; the library
/// performs no synchronization of its own (callers serialize mutation).
pub struct ObjectRef(Arc<ObjectInner>);

// we assume this type is pointer-sized basically everywhere (for layout and
// reference-map purposes)
const _: () = assert!(size_of::<ObjectRef>() == ObjectRef::SIZE);

// SAFETY: payload types are constrained `Send + Sync` at allocation, the
// header is immutable after construction, and all payload mutation goes
// through unsafe accessors whose contract includes external synchronization.
unsafe impl Send for ObjectRef {}
unsafe impl Sync for ObjectRef {}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectRef {}

impl ObjectRef {
    /// The size of a managed reference when embedded in a layout: always a
    /// single machine word.
    pub const SIZE: usize = size_of::<usize>();

    pub(crate) fn allocate<T: Described + Send + Sync>(value: T) -> Self {
        let layout = Layout::new::<T>();
        let storage = RawStorage::alloc(layout);
        // SAFETY: freshly allocated for T's layout; write takes ownership.
        unsafe { storage.as_ptr().cast::<T>().write(value) };
        trace!(
            ty = T::descriptor().name(),
            size = layout.size(),
            "allocated boxed value"
        );
        Self(Arc::new(ObjectInner {
            header: BoxHeader {
                #[cfg(any(feature = "memory-validation", debug_assertions))]
                magic: BOX_MAGIC,
                type_id: TypeId::of::<T>(),
                desc: T::descriptor(),
                drop_in_place: drop_payload::<T>,
            },
            storage,
        }))
    }

    fn validate_magic(&self) {
        #[cfg(any(feature = "memory-validation", debug_assertions))]
        {
            if self.0.header.magic != BOX_MAGIC {
                panic!(
                    "box header magic corrupted: {:#x}",
                    self.0.header.magic
                );
            }
        }
    }

    /// Whether the boxed value's runtime type is exactly `T`.
    pub fn is<T: Described>(&self) -> bool {
        self.0.header.type_id == TypeId::of::<T>()
    }

    pub fn descriptor(&self) -> &'static TypeDesc {
        self.0.header.desc
    }

    pub fn type_name(&self) -> &'static str {
        self.0.header.desc.name()
    }

    /// Checked reinterpretation as a typed box view.
    ///
    /// The boxed value's runtime type must equal `T` exactly; subtyping does
    /// not apply. On success the view aliases this object's storage.
    pub fn as_boxed<T: Described>(&self) -> Result<Boxed<T>, CastError> {
        self.validate_magic();
        if self.is::<T>() {
            Ok(Boxed::from_object_unchecked(self.clone()))
        } else {
            Err(CastError::InvalidCast {
                actual: self.type_name().to_string(),
                requested: T::descriptor().name().to_string(),
            })
        }
    }

    /// Like [`as_boxed`](Self::as_boxed), but returns `None` on mismatch
    /// instead of failing.
    pub fn try_as_boxed<T: Described>(&self) -> Option<Boxed<T>> {
        self.validate_magic();
        self.is::<T>()
            .then(|| Boxed::from_object_unchecked(self.clone()))
    }

    /// Unchecked reinterpretation as a typed box view. No runtime type check
    /// is performed.
    ///
    /// # Safety
    ///
    /// The boxed value's runtime type must equal `T` exactly. A mismatch is
    /// undefined behavior, not a reported error.
    pub unsafe fn as_boxed_unchecked<T: Described>(&self) -> Boxed<T> {
        self.validate_magic();
        Boxed::from_object_unchecked(self.clone())
    }

    pub(crate) fn payload_ptr(&self) -> NonNull<u8> {
        // SAFETY: storage pointer is non-null for the object's lifetime.
        unsafe { NonNull::new_unchecked(self.0.storage.as_ptr()) }
    }
}

unsafe impl Described for ObjectRef {
    const CONTAINS_REFS: bool = true;

    fn descriptor() -> &'static TypeDesc {
        intern::<ObjectRef>(|| TypeDesc::reference("Object"))
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "boxed {} @ {:p}", self.type_name(), self.0.storage.as_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::TypeKind;

    #[test]
    fn boxed_values_report_their_runtime_type() {
        let obj = ObjectRef::allocate(7u64);
        assert!(obj.is::<u64>());
        assert!(!obj.is::<u32>());
        assert_eq!(obj.type_name(), "UInt64");
    }

    #[test]
    fn object_ref_is_a_reference_kind() {
        let d = <ObjectRef as Described>::descriptor();
        assert_eq!(d.kind(), TypeKind::Reference);
        assert_eq!(d.size(), ObjectRef::SIZE);
        assert!(ObjectRef::CONTAINS_REFS);
    }

    #[test]
    fn clones_alias_the_same_object() {
        let a = ObjectRef::allocate(1u32);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, ObjectRef::allocate(1u32));
    }

    #[test]
    fn zero_sized_payloads_allocate_nothing() {
        let obj = ObjectRef::allocate(());
        assert!(obj.is::<()>());
    }
}
