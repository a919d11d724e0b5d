//! # managed-layout
//!
//! Low-level memory-layout toolkit for a managed-memory host runtime. It
//! answers one structural question, "does an instance of this type embed any
//! managed reference?", and exploits the answer (plus raw pointer
//! arithmetic) to reinterpret boxed values, memory regions, and
//! optional-value containers in place.
//!
//! ## Core Types
//!
//! - **[`TypeDesc`]**: closed-world descriptor of one runtime type.
//! - **[`Described`]** / **[`Blittable`]**: statically known types and their
//!   compile-time classification.
//! - **[`ObjectRef`]** / **[`Boxed`]**: a boxed value on the managed heap and
//!   its typed in-place view.
//! - **[`Span`]** / **[`ReadOnlySpan`]**: non-owning typed regions, with
//!   checked and unchecked reinterpretation through [`cast`].
//! - **[`Nullable`]**: presence flag plus payload slot, with
//!   presence-independent accessors.
//!
//! Safe entry points validate eagerly and fail with a [`CastError`];
//! `unsafe` entry points perform no validation at all, and violating their
//! documented preconditions is memory corruption, not a reported error. The
//! library takes no locks of its own outside the process-wide classification
//! cache: concurrent writers to the same storage must be serialized by the
//! caller.

pub mod boxed;
pub mod cast;
pub mod classify;
pub mod desc;
pub mod described;
pub mod error;
pub mod nullable;
pub mod object;
pub mod refmap;
pub mod span;

pub use boxed::Boxed;
pub use cast::{cast, cast_read_only, cast_read_only_unchecked, cast_unchecked};
pub use classify::{classify, classify_with, contains_references, EmbeddedFields, FieldProvider};
pub use desc::{align_up, FieldDesc, TypeDesc, TypeDescBuilder, TypeKey, TypeKind};
pub use described::{Blittable, Described};
pub use error::CastError;
pub use nullable::Nullable;
pub use object::ObjectRef;
pub use refmap::{reference_map, visit_reference_offsets, RefMap};
pub use span::{slice_data_ptr, ReadOnlySpan, Span};
