//! Normalizing cells and collections of "raw or wrapped" candidates.
//!
//! Two flavors are offered:
//!
//! - **in place** (`wrap`, `wrap_all`, ...): take `&mut` to the caller's cell
//!   or map and replace raw values with wrappers;
//! - **by value** (`wrapped_all`, `wrap_each`, ...): borrow the input and
//!   return a new, fully wrapped collection.
//!
//! Both are all-or-nothing. A batch is validated before anything is written,
//! so on error the caller's input is exactly what it was before the call.
//! Entries that already hold a wrapper are never validated again, and the
//! in-place helpers leave them where they are.

use core::hash::Hash;

use indexmap::IndexMap;

use crate::error::{DomainError, DomainResult};
use crate::value_object::{Candidate, Predicate, Wrapped};

/// Ensure `cell` holds a wrapper and return it.
///
/// A cell that already holds a `Wrapped<P>` is returned untouched. Otherwise
/// the raw value is validated and the cell overwritten with the wrapper. On
/// failure the cell is left as it was.
pub fn wrap<P: Predicate>(cell: &mut Candidate<P>) -> DomainResult<&Wrapped<P>> {
    match cell {
        Candidate::Wrapped(wrapped) => Ok(wrapped),
        Candidate::Raw(value) => {
            let wrapped = Wrapped::new(value.clone())?;
            *cell = Candidate::Wrapped(wrapped);
            wrap(cell)
        }
    }
}

/// Like [`wrap`], but an empty cell stays empty and is not validated.
pub fn wrap_optional<P: Predicate>(
    cell: &mut Option<Candidate<P>>,
) -> DomainResult<Option<&Wrapped<P>>> {
    match cell {
        Some(candidate) => wrap(candidate).map(Some),
        None => Ok(None),
    }
}

fn rejected<P: Predicate, K: core::fmt::Debug>(key: &K) -> impl FnOnce(&DomainError) + '_ {
    move |err| {
        tracing::debug!(value_object = P::NAME, key = ?key, reason = ?err.reason(), "batch wrap rejected");
    }
}

/// Validate the raw entries of `entries`, returning the new wrappers by
/// position. Entries already wrapped are skipped.
fn stage_raw<'a, K, P, I>(entries: I) -> DomainResult<Vec<(usize, Wrapped<P>)>>
where
    K: core::fmt::Debug + 'a,
    P: Predicate,
    I: Iterator<Item = (&'a K, Option<&'a Candidate<P>>)>,
{
    let mut staged = Vec::new();
    for (index, (key, candidate)) in entries.enumerate() {
        if let Some(Candidate::Raw(value)) = candidate {
            let wrapped = Wrapped::new(value.clone()).inspect_err(rejected::<P, K>(key))?;
            staged.push((index, wrapped));
        }
    }
    Ok(staged)
}

/// Validate every entry of `entries` into a new map, preserving key order.
///
/// `entries` is only read.
pub fn wrapped_all<K, P>(entries: &IndexMap<K, Candidate<P>>) -> DomainResult<IndexMap<K, Wrapped<P>>>
where
    K: Clone + Eq + Hash + core::fmt::Debug,
    P: Predicate,
{
    let mut out = IndexMap::with_capacity(entries.len());
    for (key, candidate) in entries {
        let wrapped = candidate.to_wrapped().inspect_err(rejected::<P, K>(key))?;
        out.insert(key.clone(), wrapped);
    }
    Ok(out)
}

/// Like [`wrapped_all`], but `None` entries are kept as `None` without
/// validation.
pub fn wrapped_optional_all<K, P>(
    entries: &IndexMap<K, Option<Candidate<P>>>,
) -> DomainResult<IndexMap<K, Option<Wrapped<P>>>>
where
    K: Clone + Eq + Hash + core::fmt::Debug,
    P: Predicate,
{
    let mut out = IndexMap::with_capacity(entries.len());
    for (key, candidate) in entries {
        let wrapped = candidate
            .as_ref()
            .map(Candidate::to_wrapped)
            .transpose()
            .inspect_err(rejected::<P, K>(key))?;
        out.insert(key.clone(), wrapped);
    }
    Ok(out)
}

/// Replace every raw value in `entries` with its wrapper.
///
/// Either every raw entry validates and all of them are committed, or the
/// first error is returned and `entries` is unchanged. Keys and their order
/// are preserved; entries already wrapped are not touched.
pub fn wrap_all<K, P>(entries: &mut IndexMap<K, Candidate<P>>) -> DomainResult<()>
where
    K: Eq + Hash + core::fmt::Debug,
    P: Predicate,
{
    let staged = stage_raw(entries.iter().map(|(key, candidate)| (key, Some(candidate))))?;
    for (index, wrapped) in staged {
        if let Some((_, slot)) = entries.get_index_mut(index) {
            *slot = Candidate::Wrapped(wrapped);
        }
    }
    Ok(())
}

/// Like [`wrap_all`], but `None` entries are kept as `None`.
pub fn wrap_optional_all<K, P>(entries: &mut IndexMap<K, Option<Candidate<P>>>) -> DomainResult<()>
where
    K: Eq + Hash + core::fmt::Debug,
    P: Predicate,
{
    let staged = stage_raw(entries.iter().map(|(key, candidate)| (key, candidate.as_ref())))?;
    for (index, wrapped) in staged {
        if let Some((_, slot)) = entries.get_index_mut(index) {
            *slot = Some(Candidate::Wrapped(wrapped));
        }
    }
    Ok(())
}

/// Validate a positional list of candidates into wrappers.
pub fn wrap_each<P: Predicate>(candidates: &[Candidate<P>]) -> DomainResult<Vec<Wrapped<P>>> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| candidate.to_wrapped().inspect_err(rejected::<P, usize>(&index)))
        .collect()
}
