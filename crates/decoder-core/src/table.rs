//! Decode-table construction, precedence policy, and lookup.
//!
//! A table is built once from the instruction-set definition's descriptor
//! list and is immutable afterwards. Matcher order is the precedence rule:
//! lookup returns the first match, so construction must order overlapping
//! forms deterministically. Two stages do that:
//!
//! 1. a stable sort by descending specificity, so forms with more fixed bits
//!    are tried before broader forms whose wildcard ranges also cover them;
//! 2. a stable partition that moves a short, named exception set to the
//!    front, for the handful of encodings where bit count alone picks the
//!    wrong winner among overlapping wildcard ranges.
//!
//! Both stages preserve the descriptor list's relative order among ties, so
//! the definition order stays the final tie-break.

use std::sync::OnceLock;

use crate::matcher::Matcher;
use crate::pattern::{BitPattern, PatternError};

/// One entry of an instruction-set definition: the form name, its bitstring,
/// and the handler selected when the form matches.
#[derive(Debug, Clone)]
pub struct PatternDescriptor<H> {
    /// Human-readable form name.
    pub name: &'static str,
    /// Per-bit encoding description, most-significant bit first.
    pub bitstring: &'static str,
    /// Handler selected when this form wins the lookup.
    pub handler: H,
}

impl<H> PatternDescriptor<H> {
    /// Creates a descriptor entry.
    #[must_use]
    pub const fn new(name: &'static str, bitstring: &'static str, handler: H) -> Self {
        Self {
            name,
            bitstring,
            handler,
        }
    }
}

/// Ordered, immutable collection of matchers for one instruction set.
#[derive(Debug)]
pub struct DecodeTable<H> {
    width: u32,
    matchers: Vec<Matcher<H>>,
}

impl<H> DecodeTable<H> {
    /// Builds the table from descriptor entries.
    ///
    /// `comes_first` names the forms that must precede everything else
    /// regardless of specificity. The two-stage ordering described in the
    /// module docs is applied here, once; the result never changes.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when any descriptor bitstring fails to parse
    /// against `width`.
    pub fn build(
        width: u32,
        descriptors: Vec<PatternDescriptor<H>>,
        comes_first: &[&str],
    ) -> Result<Self, PatternError> {
        let mut matchers = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let pattern = BitPattern::parse(descriptor.name, descriptor.bitstring, width)?;
            matchers.push(Matcher::from_pattern(
                pattern,
                descriptor.name,
                descriptor.handler,
            ));
        }

        // Stable: equal-specificity forms keep their definition order.
        matchers.sort_by(|a, b| b.specificity().cmp(&a.specificity()));

        // Stable partition; relative order inside each group is preserved.
        let (front, rest): (Vec<_>, Vec<_>) = matchers
            .into_iter()
            .partition(|matcher| comes_first.contains(&matcher.name()));
        let mut matchers = front;
        matchers.extend(rest);

        Ok(Self { width, matchers })
    }

    /// Returns the first matcher, in table order, whose fixed bits appear in
    /// `word`.
    ///
    /// `None` is the normal outcome for an unrecognized instruction word,
    /// not a fault; the caller decides how to handle it.
    #[must_use]
    pub fn decode(&self, word: u32) -> Option<&Matcher<H>> {
        self.matchers.iter().find(|matcher| matcher.matches(word))
    }

    /// Word width the table was built against.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// The matchers in lookup order.
    #[must_use]
    pub fn matchers(&self) -> &[Matcher<H>] {
        &self.matchers
    }

    /// Number of matchers in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Returns `true` for a table with no matchers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Once-built, process-lifetime decode table.
///
/// One of these is owned per handler-capability type, usually as a `static`
/// next to the instruction-set definition. Concurrent first use runs the
/// build closure exactly once and every caller observes the completed table;
/// steady-state lookups are plain reads with no locking.
#[derive(Debug)]
pub struct LazyDecodeTable<H> {
    cell: OnceLock<DecodeTable<H>>,
}

impl<H> LazyDecodeTable<H> {
    /// Creates an empty, not-yet-built slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the built table, running `build` first if no caller has
    /// built it yet.
    pub fn get_or_build<F>(&self, build: F) -> &DecodeTable<H>
    where
        F: FnOnce() -> DecodeTable<H>,
    {
        self.cell.get_or_init(build)
    }

    /// Returns the table if some caller has already built it.
    #[must_use]
    pub fn get(&self) -> Option<&DecodeTable<H>> {
        self.cell.get()
    }
}

impl<H> Default for LazyDecodeTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
