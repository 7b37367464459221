//! Instruction decode front-end for the Kestrel dynamic recompiler.
//!
//! Maps fixed-width guest instruction words to handler references through an
//! ordered table of mask/value matchers. Construction applies the precedence
//! policy (specificity ordering plus a named exception set) exactly once;
//! lookup is a read-only scan safe for any number of concurrent translator
//! threads.

/// Bitstring parsing for instruction-form descriptors.
pub mod pattern;
pub use pattern::{BitPattern, PatternError, MAX_WORD_WIDTH};

/// Mask/value matchers derived from one descriptor each.
pub mod matcher;
pub use matcher::Matcher;

/// Decode-table construction, precedence policy, and lookup.
pub mod table;
pub use table::{DecodeTable, LazyDecodeTable, PatternDescriptor};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
