//! Strand orientation for genomic features.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Strand orientation of a transcript. `Unknown` is only legal for monoexonic models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[default]
    #[serde(rename = ".", alias = "?")]
    Unknown,
}

impl Strand {
    /// Parse from GFF column 7. Anything other than "+" or "-" is unknown.
    #[must_use]
    pub fn from_gff(s: &str) -> Self {
        match s {
            "+" => Self::Plus,
            "-" => Self::Minus,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn is_reverse(self) -> bool {
        self == Self::Minus
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// The opposite orientation; unknown stays unknown.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Plus => Self::Minus,
            Self::Minus => Self::Plus,
            Self::Unknown => Self::Unknown,
        }
    }

    /// Two strands are compatible when equal or when either is unknown.
    #[must_use]
    pub fn compatible(self, other: Self) -> bool {
        self == other || !self.is_known() || !other.is_known()
    }
}

impl FromStr for Strand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Plus),
            "-" => Ok(Self::Minus),
            "." | "?" | "" => Ok(Self::Unknown),
            _ => Err(Error::Parse(format!("invalid strand: '{s}'"))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Unknown => write!(f, "."),
        }
    }
}
