//! Builtin arithmetic types of the target type system (LP64 data model).

use std::fmt;

/// A builtin (non-class) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
}

impl PrimitiveKind {
    /// Every builtin kind, in declaration order.
    pub const ALL: [PrimitiveKind; 16] = [
        PrimitiveKind::Void,
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
        PrimitiveKind::SignedChar,
        PrimitiveKind::UnsignedChar,
        PrimitiveKind::Short,
        PrimitiveKind::UnsignedShort,
        PrimitiveKind::Int,
        PrimitiveKind::UnsignedInt,
        PrimitiveKind::Long,
        PrimitiveKind::UnsignedLong,
        PrimitiveKind::LongLong,
        PrimitiveKind::UnsignedLongLong,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::LongDouble,
    ];

    /// Canonical spelling.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::SignedChar => "signed char",
            PrimitiveKind::UnsignedChar => "unsigned char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UnsignedShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UnsignedInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::UnsignedLong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::UnsignedLongLong => "unsigned long long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::LongDouble => "long double",
        }
    }

    /// Whether `word` can participate in a builtin type spelling.
    pub fn is_builtin_word(word: &str) -> bool {
        matches!(
            word,
            "void" | "bool" | "char" | "short" | "int" | "long" | "signed" | "unsigned" | "float" | "double"
        )
    }

    /// Combine specifier words (`unsigned`, `long`, `int`, ...) in any order
    /// into a builtin kind. Returns `None` for invalid combinations.
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let (mut signed, mut unsigned, mut short, mut long, mut int) = (0u8, 0u8, 0u8, 0u8, 0u8);
        let mut base: Option<&str> = None;
        for word in words {
            match word {
                "signed" => signed += 1,
                "unsigned" => unsigned += 1,
                "short" => short += 1,
                "long" => long += 1,
                "int" => int += 1,
                "void" | "bool" | "char" | "float" | "double" => {
                    if base.replace(word).is_some() {
                        return None;
                    }
                }
                _ => return None,
            }
        }
        if signed + unsigned > 1 || int > 1 || short > 1 || long > 2 || (short > 0 && long > 0) {
            return None;
        }
        let is_unsigned = unsigned > 0;
        let has_sign = signed > 0 || is_unsigned;
        match base {
            Some("void") | Some("bool") | Some("float") if has_sign || short + long + int > 0 => None,
            Some("void") => Some(PrimitiveKind::Void),
            Some("bool") => Some(PrimitiveKind::Bool),
            Some("float") => Some(PrimitiveKind::Float),
            Some("double") if has_sign || short + int > 0 || long > 1 => None,
            Some("double") if long == 1 => Some(PrimitiveKind::LongDouble),
            Some("double") => Some(PrimitiveKind::Double),
            Some("char") if short + long + int > 0 => None,
            Some("char") if is_unsigned => Some(PrimitiveKind::UnsignedChar),
            Some("char") if signed > 0 => Some(PrimitiveKind::SignedChar),
            Some("char") => Some(PrimitiveKind::Char),
            Some(_) => None,
            None if short + long + int + signed + unsigned == 0 => None,
            None => Some(match (is_unsigned, short, long) {
                (false, 1, _) => PrimitiveKind::Short,
                (true, 1, _) => PrimitiveKind::UnsignedShort,
                (false, _, 1) => PrimitiveKind::Long,
                (true, _, 1) => PrimitiveKind::UnsignedLong,
                (false, _, 2) => PrimitiveKind::LongLong,
                (true, _, 2) => PrimitiveKind::UnsignedLongLong,
                (false, _, _) => PrimitiveKind::Int,
                (true, _, _) => PrimitiveKind::UnsignedInt,
            }),
        }
    }

    /// Parse a complete spelling such as `"unsigned long"`.
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        Self::from_words(spelling.split_whitespace())
    }

    pub const fn is_integral(self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Void | PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::LongDouble
        )
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::LongDouble)
    }

    pub const fn is_arithmetic(self) -> bool {
        !matches!(self, PrimitiveKind::Void)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Char
                | PrimitiveKind::SignedChar
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::LongLong
        ) || self.is_floating()
    }

    /// Storage width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            PrimitiveKind::Void => 0,
            PrimitiveKind::Bool
            | PrimitiveKind::Char
            | PrimitiveKind::SignedChar
            | PrimitiveKind::UnsignedChar => 8,
            PrimitiveKind::Short | PrimitiveKind::UnsignedShort => 16,
            PrimitiveKind::Int | PrimitiveKind::UnsignedInt | PrimitiveKind::Float => 32,
            PrimitiveKind::Long
            | PrimitiveKind::UnsignedLong
            | PrimitiveKind::LongLong
            | PrimitiveKind::UnsignedLongLong
            | PrimitiveKind::Double => 64,
            PrimitiveKind::LongDouble => 128,
        }
    }

    /// Inclusive value range of an integral kind.
    pub fn range(self) -> Option<(i128, i128)> {
        if !self.is_integral() {
            return None;
        }
        if self == PrimitiveKind::Bool {
            return Some((0, 1));
        }
        let bits = self.bits();
        Some(if self.is_signed() {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        })
    }

    /// Whether an integral kind represents `value` exactly.
    pub fn fits(self, value: i128) -> bool {
        self.range().is_some_and(|(lo, hi)| (lo..=hi).contains(&value))
    }

    /// Safe widening: every value of `self` is exactly representable in `target`.
    pub fn promotes_to(self, target: PrimitiveKind) -> bool {
        if self == target {
            return false;
        }
        match (self.range(), target.range()) {
            (Some((lo, hi)), Some((tlo, thi))) => tlo <= lo && hi <= thi,
            _ => self.is_floating() && target.is_floating() && self.bits() < target.bits(),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
