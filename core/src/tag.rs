//! NaN-boxed value words.
//!
//! Every value of the target runtime is one 64-bit word that doubles as an
//! IEEE-754 double. Words that are NaN and carry one of six reserved 16-bit
//! prefixes are tagged references; every non-NaN word is a number. This module
//! is the only place that reinterprets the word as a float or back.

use std::fmt;

use crate::error::{InspectError, Result};

const TAG_SHIFT: u32 = 48;
const ORDINAL_MASK: u64 = 0xFFFF_FFFF;

// ============================================================================
// Tags
// ============================================================================

/// The closed set of reference tags, with their fixed top-16-bit encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Atom,
    Prim,
    Cons,
    Clos,
    Nil,
    Str,
}

impl Tag {
    pub const ALL: [Tag; 6] = [Tag::Atom, Tag::Prim, Tag::Cons, Tag::Clos, Tag::Nil, Tag::Str];

    /// The 16-bit prefix the target runtime uses for this tag.
    pub const fn bits(self) -> u16 {
        match self {
            Tag::Atom => 0x7ff8,
            Tag::Prim => 0x7ff9,
            Tag::Cons => 0x7ffa,
            Tag::Clos => 0x7ffb,
            Tag::Nil => 0x7ffc,
            Tag::Str => 0x7ffd,
        }
    }

    pub const fn from_bits(bits: u16) -> Option<Tag> {
        match bits {
            0x7ff8 => Some(Tag::Atom),
            0x7ff9 => Some(Tag::Prim),
            0x7ffa => Some(Tag::Cons),
            0x7ffb => Some(Tag::Clos),
            0x7ffc => Some(Tag::Nil),
            0x7ffd => Some(Tag::Str),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tag::Atom => "ATOM",
            Tag::Prim => "PRIM",
            Tag::Cons => "CONS",
            Tag::Clos => "CLOS",
            Tag::Nil => "NIL",
            Tag::Str => "STR",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Words
// ============================================================================

/// A raw value word, stored as its bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Lexp(u64);

impl Lexp {
    pub const fn from_bits(bits: u64) -> Self {
        Lexp(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Reinterpret a double's storage as a word. Bit-exact, NaN payloads included.
    pub fn from_f64(n: f64) -> Self {
        Lexp(n.to_bits())
    }

    /// Reinterpret the word's storage as a double. Bit-exact.
    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Build a tagged reference: `tag << 48 | ordinal`.
    pub const fn boxed(tag: Tag, ordinal: u32) -> Self {
        Lexp((tag.bits() as u64) << TAG_SHIFT | ordinal as u64)
    }

    pub const fn nil() -> Self {
        Lexp::boxed(Tag::Nil, 0)
    }

    /// The top 16 bits, where the tag lives.
    pub const fn top16(self) -> u16 {
        (self.0 >> TAG_SHIFT) as u16
    }

    /// The low 32 bits, where the ordinal lives.
    pub const fn ordinal(self) -> u32 {
        (self.0 & ORDINAL_MASK) as u32
    }

    pub fn classify(self) -> Classified {
        classify(self)
    }

    /// Classify, turning a malformed word into a decode error.
    pub fn decode(self) -> Result<Decoded> {
        match classify(self) {
            Classified::Number(n) => Ok(Decoded::Number(n)),
            Classified::Tagged(tag, ordinal) => Ok(Decoded::Tagged(tag, ordinal)),
            Classified::Malformed(_) => Err(InspectError::decode(self)),
        }
    }

    /// The tag if this word is a well-formed reference.
    pub fn tag(self) -> Option<Tag> {
        match classify(self) {
            Classified::Tagged(tag, _) => Some(tag),
            _ => None,
        }
    }

    pub fn is(self, tag: Tag) -> bool {
        self.tag() == Some(tag)
    }
}

impl From<f64> for Lexp {
    fn from(n: f64) -> Self {
        Lexp::from_f64(n)
    }
}

impl fmt::Display for Lexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Lexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Result of looking at a word without deciding whether malformed is an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classified {
    Number(f64),
    Tagged(Tag, u32),
    /// NaN whose top 16 bits name no tag; carries those bits.
    Malformed(u16),
}

/// A well-formed word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    Number(f64),
    Tagged(Tag, u32),
}

/// Classify a word.
///
/// NaN-ness is checked first: every reserved tag lies inside the NaN space,
/// so a non-NaN pattern is always a number. A NaN with any top-16 prefix
/// outside the tag table is malformed, never mapped to a nearby tag.
pub fn classify(word: Lexp) -> Classified {
    let n = word.to_f64();
    if !n.is_nan() {
        return Classified::Number(n);
    }
    match Tag::from_bits(word.top16()) {
        Some(tag) => Classified::Tagged(tag, word.ordinal()),
        None => Classified::Malformed(word.top16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_layout() {
        let w = Lexp::boxed(Tag::Cons, 0x39e);
        assert_eq!(w.bits(), 0x7ffa_0000_0000_039e);
        assert_eq!(w.to_string(), "0x7ffa00000000039e");
    }

    #[test]
    fn test_classify_each_tag() {
        for tag in Tag::ALL {
            let w = Lexp::boxed(tag, 0xdead_beef);
            assert_eq!(classify(w), Classified::Tagged(tag, 0xdead_beef));
        }
    }

    #[test]
    fn test_bits_round_trip_through_table() {
        for tag in Tag::ALL {
            assert_eq!(Tag::from_bits(tag.bits()), Some(tag));
        }
        assert_eq!(Tag::from_bits(0x7ffe), None);
        assert_eq!(Tag::from_bits(0x7ff7), None);
    }

    #[test]
    fn test_ordinary_numbers() {
        assert_eq!(classify(Lexp::from_f64(1.0)), Classified::Number(1.0));
        assert_eq!(classify(Lexp::from_f64(-0.0)), Classified::Number(-0.0));
        assert_eq!(
            classify(Lexp::from_f64(f64::INFINITY)),
            Classified::Number(f64::INFINITY)
        );
    }

    #[test]
    fn test_unknown_nan_is_malformed() {
        assert_eq!(
            classify(Lexp::from_bits(0x7ffe_0000_0000_0000)),
            Classified::Malformed(0x7ffe)
        );
        // x86 default NaN from 0.0/0.0
        assert_eq!(
            classify(Lexp::from_bits(0xfff8_0000_0000_0000)),
            Classified::Malformed(0xfff8)
        );
    }

    #[test]
    fn test_infinity_prefix_is_not_a_tag() {
        // 0x7ff0 prefix with zero mantissa is +inf, not a reference
        let w = Lexp::from_bits(0x7ff0_0000_0000_0000);
        assert!(matches!(classify(w), Classified::Number(n) if n == f64::INFINITY));
    }

    #[test]
    fn test_decode_reports_malformed() {
        let err = Lexp::from_bits(0x7fff_0000_0000_0001).decode().unwrap_err();
        assert_eq!(err.kind, crate::error::InspectErrorKind::Decode);
    }

    #[test]
    fn test_nil_constant() {
        assert!(Lexp::nil().is(Tag::Nil));
        assert_eq!(Lexp::nil().ordinal(), 0);
    }
}
