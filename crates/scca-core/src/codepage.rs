//! Narrow-string codepages.
//!
//! Prefetch files store the executable name as UTF-16, but volume and path
//! strings read through the tools may be narrow. The tools let the user pick
//! the codepage used for those.

use crate::error::{ArgumentError, ErrorChain};
use std::fmt;
use std::str::FromStr;

/// Supported narrow-string codepages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Codepage {
    /// US-ASCII
    Ascii,
    /// ISO 8859-1, Latin 1
    Iso8859_1,
    /// ISO 8859-2, Latin 2
    Iso8859_2,
    /// ISO 8859-3, Latin 3
    Iso8859_3,
    /// ISO 8859-4, Latin 4
    Iso8859_4,
    /// ISO 8859-5, Cyrillic
    Iso8859_5,
    /// ISO 8859-6, Arabic
    Iso8859_6,
    /// ISO 8859-7, Greek
    Iso8859_7,
    /// ISO 8859-8, Hebrew
    Iso8859_8,
    /// ISO 8859-9, Latin 5
    Iso8859_9,
    /// ISO 8859-10, Latin 6
    Iso8859_10,
    /// ISO 8859-11, Thai
    Iso8859_11,
    /// ISO 8859-13, Latin 7
    Iso8859_13,
    /// ISO 8859-14, Latin 8
    Iso8859_14,
    /// ISO 8859-15, Latin 9
    Iso8859_15,
    /// ISO 8859-16, Latin 10
    Iso8859_16,
    /// KOI8-R, Russian
    Koi8R,
    /// KOI8-U, Ukrainian
    Koi8U,
    /// Windows 874, Thai
    Windows874,
    /// Windows 932, Japanese
    Windows932,
    /// Windows 936, Simplified Chinese
    Windows936,
    /// Windows 949, Korean
    Windows949,
    /// Windows 950, Traditional Chinese
    Windows950,
    /// Windows 1250, Central European
    Windows1250,
    /// Windows 1251, Cyrillic
    Windows1251,
    /// Windows 1252, Western European
    #[default]
    Windows1252,
    /// Windows 1253, Greek
    Windows1253,
    /// Windows 1254, Turkish
    Windows1254,
    /// Windows 1255, Hebrew
    Windows1255,
    /// Windows 1256, Arabic
    Windows1256,
    /// Windows 1257, Baltic
    Windows1257,
    /// Windows 1258, Vietnamese
    Windows1258,
}

const ISO_8859: [(u32, Codepage); 15] = [
    (1, Codepage::Iso8859_1),
    (2, Codepage::Iso8859_2),
    (3, Codepage::Iso8859_3),
    (4, Codepage::Iso8859_4),
    (5, Codepage::Iso8859_5),
    (6, Codepage::Iso8859_6),
    (7, Codepage::Iso8859_7),
    (8, Codepage::Iso8859_8),
    (9, Codepage::Iso8859_9),
    (10, Codepage::Iso8859_10),
    (11, Codepage::Iso8859_11),
    (13, Codepage::Iso8859_13),
    (14, Codepage::Iso8859_14),
    (15, Codepage::Iso8859_15),
    (16, Codepage::Iso8859_16),
];

const WINDOWS: [Codepage; 14] = [
    Codepage::Windows874,
    Codepage::Windows932,
    Codepage::Windows936,
    Codepage::Windows949,
    Codepage::Windows950,
    Codepage::Windows1250,
    Codepage::Windows1251,
    Codepage::Windows1252,
    Codepage::Windows1253,
    Codepage::Windows1254,
    Codepage::Windows1255,
    Codepage::Windows1256,
    Codepage::Windows1257,
    Codepage::Windows1258,
];

impl Codepage {
    /// The Windows codepage identifier
    pub fn number(self) -> u32 {
        match self {
            Self::Ascii => 20127,
            Self::Iso8859_1 => 28591,
            Self::Iso8859_2 => 28592,
            Self::Iso8859_3 => 28593,
            Self::Iso8859_4 => 28594,
            Self::Iso8859_5 => 28595,
            Self::Iso8859_6 => 28596,
            Self::Iso8859_7 => 28597,
            Self::Iso8859_8 => 28598,
            Self::Iso8859_9 => 28599,
            Self::Iso8859_10 => 28600,
            Self::Iso8859_11 => 28601,
            Self::Iso8859_13 => 28603,
            Self::Iso8859_14 => 28604,
            Self::Iso8859_15 => 28605,
            Self::Iso8859_16 => 28606,
            Self::Koi8R => 20866,
            Self::Koi8U => 21866,
            Self::Windows874 => 874,
            Self::Windows932 => 932,
            Self::Windows936 => 936,
            Self::Windows949 => 949,
            Self::Windows950 => 950,
            Self::Windows1250 => 1250,
            Self::Windows1251 => 1251,
            Self::Windows1252 => 1252,
            Self::Windows1253 => 1253,
            Self::Windows1254 => 1254,
            Self::Windows1255 => 1255,
            Self::Windows1256 => 1256,
            Self::Windows1257 => 1257,
            Self::Windows1258 => 1258,
        }
    }

    /// Looks up a codepage by its Windows identifier
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            20127 => Some(Self::Ascii),
            20866 => Some(Self::Koi8R),
            21866 => Some(Self::Koi8U),
            28591..=28606 => ISO_8859
                .iter()
                .map(|&(_, codepage)| codepage)
                .find(|codepage| codepage.number() == number),
            _ => WINDOWS.iter().copied().find(|codepage| codepage.number() == number),
        }
    }
}

impl fmt::Display for Codepage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            20127 => f.write_str("ascii"),
            20866 => f.write_str("koi8-r"),
            21866 => f.write_str("koi8-u"),
            number @ 28591..=28606 => write!(f, "iso-8859-{}", number - 28590),
            number => write!(f, "windows-{}", number),
        }
    }
}

impl FromStr for Codepage {
    type Err = ErrorChain;

    /// Parses the names accepted by the tools' `-c` option, e.g. `ascii`,
    /// `iso-8859-1`, `iso_8859_15`, `koi8-r` or `windows-1252`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        parse_name(&name).ok_or_else(|| {
            ErrorChain::new(
                ArgumentError::UnsupportedValue,
                format!("unsupported codepage: {}", s),
            )
        })
    }
}

fn parse_name(name: &str) -> Option<Codepage> {
    if name == "ascii" {
        return Some(Codepage::Ascii);
    }
    if let Some(rest) = strip_prefix_with_separator(name, "koi8") {
        return match rest {
            "r" => Some(Codepage::Koi8R),
            "u" => Some(Codepage::Koi8U),
            _ => None,
        };
    }
    if let Some(rest) = strip_prefix_with_separator(name, "iso") {
        let part = strip_prefix_with_separator(rest, "8859")?;
        let part: u32 = parse_digits(part)?;
        return ISO_8859
            .iter()
            .find(|&&(number, _)| number == part)
            .map(|&(_, codepage)| codepage);
    }
    if let Some(rest) = strip_prefix_with_separator(name, "windows") {
        let number = parse_digits(rest)?;
        return WINDOWS.iter().copied().find(|codepage| codepage.number() == number);
    }
    None
}

/// Strips `prefix` followed by `-` or `_`
fn strip_prefix_with_separator<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?
        .strip_prefix(|c: char| c == '-' || c == '_')
}

fn parse_digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
