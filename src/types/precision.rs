//! Subscription parameters for the `book` channel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-side price aggregation level
///
/// `P0` aggregates to five significant figures and each step after it drops
/// one figure, so `P4` is the coarsest. A change of precision needs a fresh
/// subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    /// Finest aggregation
    #[default]
    P0,
    /// One figure coarser than `P0`
    P1,
    /// Two figures coarser than `P0`
    P2,
    /// Three figures coarser than `P0`
    P3,
    /// Coarsest aggregation
    P4,
}

impl Precision {
    /// All supported levels, finest first
    pub const ALL: [Precision; 5] = [
        Precision::P0,
        Precision::P1,
        Precision::P2,
        Precision::P3,
        Precision::P4,
    ];

    /// Select a level by ordinal, clamped to the valid range
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Ordinal of this level (0 is finest)
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// One level finer, saturating at `P0`
    #[must_use]
    pub fn finer(self) -> Self {
        Self::from_index(self.index().saturating_sub(1))
    }

    /// One level coarser, saturating at `P4`
    #[must_use]
    pub fn coarser(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Wire code sent as `prec`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Precision::P0 => "P0",
            Precision::P1 => "P1",
            Precision::P2 => "P2",
            Precision::P3 => "P3",
            Precision::P4 => "P4",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Update frequency sent as `freq`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Frequency {
    /// Every change is pushed as it happens
    #[default]
    #[serde(rename = "F0")]
    Realtime,
    /// Changes are batched every two seconds
    #[serde(rename = "F1")]
    Batched,
}

/// Number of levels per side sent as `len`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookLength {
    /// Top of book only
    #[serde(rename = "1")]
    L1,
    /// 25 levels (server default)
    #[serde(rename = "25")]
    L25,
    /// 100 levels
    #[serde(rename = "100")]
    L100,
    /// 250 levels
    #[serde(rename = "250")]
    L250,
}
