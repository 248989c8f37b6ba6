//! Validated value objects: one scalar, checked once, immutable afterwards.
//!
//! A value object here is defined by two things:
//!
//! - a [`Predicate`] naming the underlying value type and deciding which raw
//!   values are acceptable, and
//! - the [`Wrapped`] container, which can only be obtained by passing that
//!   predicate (or by cloning a wrapper that already did).
//!
//! Two wrappers of the same predicate with the same value are equal. Wrappers
//! of different predicates are different types and never compare equal, even
//! when their underlying values are.
//!
//! ```ignore
//! value_object!(
//!     /// Five-digit card prefix starting with a 4.
//!     pub CardNumber(String) via CardNumberRule,
//!     |candidate| candidate.len() == 5 && candidate.starts_with('4')
//! );
//!
//! let card = CardNumber::new("41111".to_string())?;
//! assert!(card.equals_value(&"41111".to_string()));
//! assert!(CardNumber::new("811".to_string()).is_err());
//! ```

use core::any::{Any, TypeId};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

use crate::error::{DomainError, DomainResult, InvalidReason, render_typed};

/// Validation rule for one kind of value object.
///
/// Implementors are usually uninhabited marker types (`enum CardNumberRule {}`);
/// the wrapper carries the value, the predicate only carries behavior.
pub trait Predicate: 'static {
    /// Underlying scalar type.
    type Value: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static;

    /// Name used in error messages, logs and `Debug` output.
    const NAME: &'static str;

    /// Whether `candidate` may be held by a `Wrapped<Self>`.
    fn is_valid(candidate: &Self::Value) -> bool;
}

/// An immutable value that satisfied `P` when it was built.
///
/// There is no way to obtain a `&mut P::Value` from a wrapper; to "change" a
/// value object, build a new one.
pub struct Wrapped<P: Predicate> {
    value: P::Value,
    _predicate: PhantomData<fn() -> P>,
}

/// Either a raw value or an already-validated wrapper.
///
/// This is the input accepted by the wrap helpers: callers holding a mix of
/// the two can normalize them without re-validating what is already wrapped.
pub enum Candidate<P: Predicate> {
    Raw(P::Value),
    Wrapped(Wrapped<P>),
}

impl<P: Predicate> Wrapped<P> {
    /// Validate `value` against `P` and wrap it.
    pub fn new(value: P::Value) -> DomainResult<Self> {
        if P::is_valid(&value) {
            return Ok(Self::trusted(value));
        }

        tracing::debug!(
            value_object = P::NAME,
            reason = %InvalidReason::Rejected,
            "candidate rejected"
        );
        Err(DomainError::InvalidValue {
            value_object: P::NAME,
            value: render_typed(&value),
            reason: InvalidReason::Rejected,
        })
    }

    /// Like [`Wrapped::new`], but `None` passes through without validation.
    pub fn optional(value: Option<P::Value>) -> DomainResult<Option<Self>> {
        value.map(Self::new).transpose()
    }

    /// Build from a raw value or an existing wrapper.
    ///
    /// An existing `Wrapped<P>` is taken as is; its value is not checked again.
    pub fn from_candidate(candidate: Candidate<P>) -> DomainResult<Self> {
        match candidate {
            Candidate::Wrapped(wrapped) => Ok(wrapped),
            Candidate::Raw(value) => Self::new(value),
        }
    }

    /// Build from a wrapper of another predicate over the same value type.
    ///
    /// Passing `Q`'s predicate says nothing about `P`, so the raw value is
    /// checked against `P`. When `Q` is `P` the check is skipped.
    pub fn rewrap<Q>(other: &Wrapped<Q>) -> DomainResult<Self>
    where
        Q: Predicate<Value = P::Value>,
    {
        if TypeId::of::<P>() == TypeId::of::<Q>() {
            return Ok(Self::trusted(other.value.clone()));
        }
        Self::new(other.value.clone())
    }

    /// Build from a loosely-typed JSON value.
    ///
    /// A candidate that does not even decode into `P::Value` (a number handed
    /// to a string type, say) fails the same way a rejected one does.
    pub fn from_json(candidate: &Json) -> DomainResult<Self> {
        match <P::Value as Deserialize>::deserialize(candidate) {
            Ok(value) => Self::new(value),
            Err(_) => {
                tracing::debug!(
                    value_object = P::NAME,
                    reason = %InvalidReason::WrongType,
                    "candidate rejected"
                );
                Err(DomainError::invalid(P::NAME, candidate, InvalidReason::WrongType))
            }
        }
    }

    /// Wrap a value that is already known to satisfy `P`.
    pub(crate) fn trusted(value: P::Value) -> Self {
        Self {
            value,
            _predicate: PhantomData,
        }
    }

    pub fn value(&self) -> &P::Value {
        &self.value
    }

    pub fn into_value(self) -> P::Value {
        self.value
    }

    /// Compare against a bare raw value, without coercion.
    ///
    /// Borrowed forms are accepted wherever `P::Value` borrows as them, so a
    /// `String`-backed wrapper compares against a `&str` too.
    pub fn equals_value<Q>(&self, raw: &Q) -> bool
    where
        P::Value: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        <P::Value as Borrow<Q>>::borrow(&self.value) == raw
    }

    /// Compare against anything.
    ///
    /// - another `Wrapped<P>`: equal when the values are equal;
    /// - a bare `P::Value`: equal when it is the held value;
    /// - anything else, including wrappers of other predicates: not equal.
    ///
    /// The match is on the exact type: a `String`-backed wrapper is not equal
    /// to a `&str` here. Use [`Wrapped::equals_value`] for borrowed forms.
    pub fn equals(&self, other: &dyn Any) -> bool {
        if let Some(wrapped) = other.downcast_ref::<Self>() {
            return self.value == wrapped.value;
        }
        if let Some(raw) = other.downcast_ref::<P::Value>() {
            return &self.value == raw;
        }
        false
    }

    /// The value as a string, for concatenation.
    pub fn to_display_string(&self) -> String
    where
        P::Value: fmt::Display,
    {
        self.value.to_string()
    }
}

impl<P: Predicate> Clone for Wrapped<P> {
    fn clone(&self) -> Self {
        Self::trusted(self.value.clone())
    }
}

impl<P: Predicate> fmt::Debug for Wrapped<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(P::NAME).field(&self.value).finish()
    }
}

impl<P: Predicate> fmt::Display for Wrapped<P>
where
    P::Value: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<P: Predicate> PartialEq for Wrapped<P> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<P: Predicate> Eq for Wrapped<P> where P::Value: Eq {}

impl<P: Predicate> Hash for Wrapped<P>
where
    P::Value: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<P: Predicate> AsRef<P::Value> for Wrapped<P> {
    fn as_ref(&self) -> &P::Value {
        &self.value
    }
}

/// Encodes as the bare value, so structured encoders see a scalar rather
/// than an envelope.
impl<P: Predicate> Serialize for Wrapped<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// Decodes the bare value and runs the predicate on it.
impl<'de, P: Predicate> Deserialize<'de> for Wrapped<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <P::Value as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

impl<P: Predicate> Candidate<P> {
    pub fn raw(value: P::Value) -> Self {
        Self::Raw(value)
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, Candidate::Wrapped(_))
    }

    pub fn as_wrapped(&self) -> Option<&Wrapped<P>> {
        match self {
            Candidate::Wrapped(wrapped) => Some(wrapped),
            Candidate::Raw(_) => None,
        }
    }

    /// Validate without consuming: wrappers are cloned, raw values checked.
    pub(crate) fn to_wrapped(&self) -> DomainResult<Wrapped<P>> {
        match self {
            Candidate::Wrapped(wrapped) => Ok(wrapped.clone()),
            Candidate::Raw(value) => Wrapped::new(value.clone()),
        }
    }
}

impl<P: Predicate> From<Wrapped<P>> for Candidate<P> {
    fn from(value: Wrapped<P>) -> Self {
        Self::Wrapped(value)
    }
}

impl<P: Predicate> TryFrom<Candidate<P>> for Wrapped<P> {
    type Error = DomainError;

    fn try_from(candidate: Candidate<P>) -> Result<Self, Self::Error> {
        Self::from_candidate(candidate)
    }
}

impl<P: Predicate> Clone for Candidate<P> {
    fn clone(&self) -> Self {
        match self {
            Candidate::Raw(value) => Candidate::Raw(value.clone()),
            Candidate::Wrapped(wrapped) => Candidate::Wrapped(wrapped.clone()),
        }
    }
}

impl<P: Predicate> fmt::Debug for Candidate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Raw(value) => f.debug_tuple("Raw").field(value).finish(),
            Candidate::Wrapped(wrapped) => f.debug_tuple("Wrapped").field(wrapped).finish(),
        }
    }
}

impl<P: Predicate> PartialEq for Candidate<P> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Candidate::Raw(a), Candidate::Raw(b)) => a == b,
            (Candidate::Wrapped(a), Candidate::Wrapped(b)) => a == b,
            _ => false,
        }
    }
}

/// Declare a value object: a predicate marker type plus a `Wrapped` alias.
///
/// ```ignore
/// value_object!(pub Percentage(u8) via PercentageRule, |candidate| *candidate <= 100);
/// ```
#[macro_export]
macro_rules! value_object {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident($value:ty) via $rule:ident,
        |$candidate:ident| $body:expr
    ) => {
        #[doc = concat!("Validation rule for [`", stringify!($name), "`].")]
        $vis enum $rule {}

        impl $crate::Predicate for $rule {
            type Value = $value;
            const NAME: &'static str = stringify!($name);

            fn is_valid($candidate: &$value) -> bool {
                $body
            }
        }

        $(#[$meta])*
        $vis type $name = $crate::Wrapped<$rule>;
    };
}
