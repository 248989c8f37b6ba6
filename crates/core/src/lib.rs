//! `valwrap-core` — validated, immutable single-value wrappers.
//!
//! - [`value_object`]: the [`Predicate`] trait and the [`Wrapped`] container.
//! - [`wrap`]: normalizing cells and maps of raw-or-wrapped candidates.
//! - [`codec`]: the compact and legacy persisted forms.

pub mod codec;
pub mod error;
pub mod value_object;
pub mod wrap;

pub use codec::{DecodeOptions, EncodedForm};
pub use error::{DomainError, DomainResult, InvalidReason};
pub use value_object::{Candidate, Predicate, Wrapped};
