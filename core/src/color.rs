//! Closed color alphabet and the token normalization that maps level text onto it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical colors a shooter or target can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorCode {
    /// Canonical code `R`.
    Red,
    /// Canonical code `G`.
    Green,
    /// Canonical code `B`.
    Blue,
    /// Canonical code `Y`.
    Yellow,
    /// Canonical code `O`.
    Orange,
    /// Canonical code `P`.
    Purple,
    /// Canonical code `C`.
    Cyan,
}

impl ColorCode {
    /// Every color in canonical letter order `R G B Y O P C`.
    pub const ALL: [ColorCode; 7] = [
        ColorCode::Red,
        ColorCode::Green,
        ColorCode::Blue,
        ColorCode::Yellow,
        ColorCode::Orange,
        ColorCode::Purple,
        ColorCode::Cyan,
    ];

    /// Single-letter code used in level files.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Green => 'G',
            Self::Blue => 'B',
            Self::Yellow => 'Y',
            Self::Orange => 'O',
            Self::Purple => 'P',
            Self::Cyan => 'C',
        }
    }

    /// Resolves an uppercase code letter.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'R' => Some(Self::Red),
            'G' => Some(Self::Green),
            'B' => Some(Self::Blue),
            'Y' => Some(Self::Yellow),
            'O' => Some(Self::Orange),
            'P' => Some(Self::Purple),
            'C' => Some(Self::Cyan),
            _ => None,
        }
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Normalized color token carried by shooters and target cells.
///
/// Tokens that do not resolve to a [`ColorCode`] are kept verbatim (folded and
/// uppercased) so they can be reported, but they never match anything,
/// including another unmatched token with the same spelling.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorToken {
    /// Token resolved to a canonical color.
    Code(ColorCode),
    /// Token that matched no entry of the normalization table.
    Unmatched(String),
}

impl ColorToken {
    /// Normalizes a raw level token. Blank input yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let folded = fold(trimmed);
        let mut chars = folded.chars();
        let first = chars.next()?;

        if chars.next().is_none() {
            if let Some(code) = ColorCode::from_letter(first) {
                return Some(Self::Code(code));
            }
        }

        for (word, code) in SYNONYMS {
            if folded.contains(word) {
                return Some(Self::Code(code));
            }
        }

        match ColorCode::from_letter(first) {
            Some(code) => Some(Self::Code(code)),
            None => Some(Self::Unmatched(folded)),
        }
    }

    /// Canonical color carried by the token, if it resolved to one.
    #[must_use]
    pub const fn code(&self) -> Option<ColorCode> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Unmatched(_) => None,
        }
    }

    /// Reports whether a projectile of this color may strike a cell of `other`.
    #[must_use]
    pub fn matches(&self, other: &ColorToken) -> bool {
        match (self.code(), other.code()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

impl From<ColorCode> for ColorToken {
    fn from(code: ColorCode) -> Self {
        Self::Code(code)
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Unmatched(token) => write!(f, "{token}"),
        }
    }
}

/// Synonym words checked in order after diacritic folding.
const SYNONYMS: [(&str, ColorCode); 15] = [
    ("KIRMIZI", ColorCode::Red),
    ("RED", ColorCode::Red),
    ("SARI", ColorCode::Yellow),
    ("YELLOW", ColorCode::Yellow),
    ("YESIL", ColorCode::Green),
    ("GREEN", ColorCode::Green),
    ("MAVI", ColorCode::Blue),
    ("BLUE", ColorCode::Blue),
    ("TURUNCU", ColorCode::Orange),
    ("ORANGE", ColorCode::Orange),
    ("MOR", ColorCode::Purple),
    ("PURPLE", ColorCode::Purple),
    ("MAGENTA", ColorCode::Purple),
    ("CYAN", ColorCode::Cyan),
    ("CAMGOBEGI", ColorCode::Cyan),
];

fn fold(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\u{0130}' | '\u{0131}' => folded.push('I'),
            '\u{015E}' | '\u{015F}' => folded.push('S'),
            '\u{011E}' | '\u{011F}' => folded.push('G'),
            '\u{00DC}' | '\u{00FC}' => folded.push('U'),
            '\u{00D6}' | '\u{00F6}' => folded.push('O'),
            '\u{00C7}' | '\u{00E7}' => folded.push('C'),
            other => folded.extend(other.to_uppercase()),
        }
    }
    folded
}
