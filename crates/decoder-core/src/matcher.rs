//! Mask/value matchers derived from instruction-form descriptors.

use crate::pattern::BitPattern;

/// One decodable instruction form: a fixed-bit test plus the handler
/// reference selected when the test passes.
///
/// The handler type `H` is opaque to the decode front-end. It is stored at
/// table construction and handed back on a successful lookup; the front-end
/// never invokes it, so tests can substitute any stand-in they like.
#[derive(Debug, Clone)]
pub struct Matcher<H> {
    mask: u32,
    value: u32,
    name: &'static str,
    handler: H,
}

impl<H> Matcher<H> {
    /// Builds a matcher from a parsed bit pattern.
    #[must_use]
    pub fn from_pattern(pattern: BitPattern, name: &'static str, handler: H) -> Self {
        Self {
            mask: pattern.mask(),
            value: pattern.value(),
            name,
            handler,
        }
    }

    /// Returns `true` when `word` carries this form's required bit values at
    /// every constrained position.
    #[must_use]
    pub const fn matches(&self, word: u32) -> bool {
        (word & self.mask) == self.value
    }

    /// Number of constrained bits in this form.
    ///
    /// A higher count means a narrower, more exactly-constrained pattern;
    /// the table builder sorts on this so broad catch-all forms never shadow
    /// specific ones.
    #[must_use]
    pub const fn specificity(&self) -> u32 {
        self.mask.count_ones()
    }

    /// Human-readable form name, used for precedence exceptions and
    /// diagnostics only.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Bitmask of constrained positions.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    /// Required bit values at constrained positions.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// The stored handler reference.
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::Matcher;
    use crate::pattern::BitPattern;

    fn matcher(bitstring: &str) -> Matcher<u32> {
        let pattern = BitPattern::parse("form", bitstring, 6).expect("valid pattern");
        Matcher::from_pattern(pattern, "form", 0)
    }

    #[test]
    fn fixed_bits_must_agree_for_a_match() {
        let form = matcher("1110 00");
        assert!(form.matches(0b11_1000));
        assert!(!form.matches(0b11_1001));
        assert!(!form.matches(0b01_1000));
    }

    #[test]
    fn wildcard_positions_accept_any_value() {
        let form = matcher("11 ????");
        for low in 0_u32..16 {
            assert!(form.matches(0b11_0000 | low));
        }
        assert!(!form.matches(0b10_0000));
    }

    #[test]
    fn specificity_counts_constrained_bits() {
        assert_eq!(matcher("111000").specificity(), 6);
        assert_eq!(matcher("11????").specificity(), 2);
        assert_eq!(matcher("??????").specificity(), 0);
    }

    #[test]
    fn handler_reference_is_returned_untouched() {
        let pattern = BitPattern::parse("form", "101010", 6).expect("valid pattern");
        let form = Matcher::from_pattern(pattern, "form", 0xDEAD_u32);
        assert_eq!(*form.handler(), 0xDEAD);
        assert_eq!(form.name(), "form");
    }
}
