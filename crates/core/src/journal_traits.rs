//! Journal traits: capability negotiation between providers and consumers
//!
//! A provider declares a value for each trait kind it knows about. A consumer
//! asks for traits; the request passes when every requested kind is declared
//! and each requested value is either `Indeterminate` or equal to the
//! declared value.
//!
//! | declared \ requested | True | False | Indeterminate |
//! |----------------------|------|-------|---------------|
//! | True                 | pass | fail  | pass          |
//! | False                | fail | pass  | pass          |
//! | Indeterminate        | fail | fail  | pass          |
//! | (undeclared)         | fail | fail  | fail          |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Three-valued trait value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// Property holds
    True,
    /// Property does not hold
    False,
    /// Unknown, or "don't care" when requested
    Indeterminate,
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

/// Kind of capability a provider may declare
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    /// Batches commit all-or-nothing
    Atomic,
    /// Committed entries survive process restarts
    Durable,
    /// Backed by a relational store
    Relational,
    /// Provider-specific capability
    Custom(String),
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitKind::Atomic => write!(f, "atomic"),
            TraitKind::Durable => write!(f, "durable"),
            TraitKind::Relational => write!(f, "relational"),
            TraitKind::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// A (kind, value) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JournalTrait {
    /// Capability kind
    pub kind: TraitKind,
    /// Declared or requested value
    pub value: TriState,
}

impl JournalTrait {
    /// Create a trait
    pub fn new(kind: TraitKind, value: TriState) -> Self {
        JournalTrait { kind, value }
    }

    /// `Atomic` with the given value
    pub fn atomic(value: TriState) -> Self {
        Self::new(TraitKind::Atomic, value)
    }

    /// `Durable` with the given value
    pub fn durable(value: TriState) -> Self {
        Self::new(TraitKind::Durable, value)
    }

    /// `Relational` with the given value
    pub fn relational(value: TriState) -> Self {
        Self::new(TraitKind::Relational, value)
    }
}

/// Traits declared by a provider, one value per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalTraits {
    declared: BTreeMap<TraitKind, TriState>,
}

impl JournalTraits {
    /// Create an empty declaration
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a trait unless its kind is already declared
    ///
    /// Returns `false` when the kind was already present; the first
    /// declaration wins.
    pub fn declare(&mut self, journal_trait: JournalTrait) -> bool {
        if self.declared.contains_key(&journal_trait.kind) {
            return false;
        }
        self.declared.insert(journal_trait.kind, journal_trait.value);
        true
    }

    /// Declared value for a kind
    pub fn get(&self, kind: &TraitKind) -> Option<TriState> {
        self.declared.get(kind).copied()
    }

    /// Number of declared kinds
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// True if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Declared traits in kind order
    pub fn iter(&self) -> impl Iterator<Item = JournalTrait> + '_ {
        self.declared
            .iter()
            .map(|(kind, value)| JournalTrait::new(kind.clone(), *value))
    }

    /// Check whether every requested trait is satisfied
    pub fn has_traits<'a, I>(&self, requested: I) -> bool
    where
        I: IntoIterator<Item = &'a JournalTrait>,
    {
        requested.into_iter().all(|wanted| match self.get(&wanted.kind) {
            None => false,
            Some(declared) => wanted.value == TriState::Indeterminate || wanted.value == declared,
        })
    }
}

impl FromIterator<JournalTrait> for JournalTraits {
    fn from_iter<I: IntoIterator<Item = JournalTrait>>(iter: I) -> Self {
        let mut traits = JournalTraits::new();
        for journal_trait in iter {
            traits.declare(journal_trait);
        }
        traits
    }
}
