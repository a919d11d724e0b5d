use thiserror::Error;

/// Errors reported by the checked reinterpretation entry points.
///
/// Dangerous (`unsafe`) entry points never construct these; violating their
/// preconditions is undefined behavior, not a reported error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CastError {
    /// A checked box reinterpretation whose source object's runtime type does
    /// not exactly match the requested value type.
    #[error("invalid cast: boxed value is `{actual}`, requested `{requested}`")]
    InvalidCast { actual: String, requested: String },

    /// A checked region reinterpretation whose source or destination element
    /// type is reference-containing.
    #[error("cannot reinterpret a region over reference-containing type `{0}`")]
    ReferenceContaining(&'static str),

    /// A checked region reinterpretation involving a zero-sized element type.
    #[error("cannot reinterpret a region over zero-sized type `{0}`")]
    ZeroSized(&'static str),

    /// A checked region reinterpretation whose base address is not aligned
    /// for the destination element type.
    #[error("region base is not aligned for element type `{ty}` (alignment {align})")]
    Misaligned { ty: &'static str, align: usize },
}
