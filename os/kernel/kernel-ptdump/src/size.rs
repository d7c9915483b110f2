//! # Range sizes
//!
//! Sizes in the dump use the largest binary unit that represents them
//! exactly: 4 KiB stays `4K`, 2 MiB becomes `2M`, 6 MiB + 4 KiB stays `6148K`.

use core::fmt;

/// Binary size unit, from KiB to EiB.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum SizeUnit {
    Kilo,
    Mega,
    Giga,
    Tera,
    Peta,
    Exa,
}

impl SizeUnit {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Kilo => 'K',
            Self::Mega => 'M',
            Self::Giga => 'G',
            Self::Tera => 'T',
            Self::Peta => 'P',
            Self::Exa => 'E',
        }
    }

    #[must_use]
    const fn larger(self) -> Option<Self> {
        match self {
            Self::Kilo => Some(Self::Mega),
            Self::Mega => Some(Self::Giga),
            Self::Giga => Some(Self::Tera),
            Self::Tera => Some(Self::Peta),
            Self::Peta => Some(Self::Exa),
            Self::Exa => None,
        }
    }
}

/// A byte count scaled to `value` × `unit`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HumanSize {
    value: u64,
    unit: SizeUnit,
}

impl HumanSize {
    /// Scale `bytes` to the largest unit that divides it exactly.
    ///
    /// Bytes below 1 KiB are truncated; the dump only ever passes multiples
    /// of the page size.
    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        let mut value = bytes >> 10;
        let mut unit = SizeUnit::Kilo;
        while value != 0 && value.is_multiple_of(1024) {
            let Some(larger) = unit.larger() else {
                break;
            };
            value /= 1024;
            unit = larger;
        }
        Self { value, unit }
    }

    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.value
    }

    #[inline]
    #[must_use]
    pub const fn unit(self) -> SizeUnit {
        self.unit
    }
}

/// Renders as `<value><unit>`; the width applies to the number.
impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)?;
        write!(f, "{}", self.unit.letter())
    }
}
