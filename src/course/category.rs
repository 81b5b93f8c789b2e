//! Platform categories and per-category storage

use serde::{Deserialize, Serialize};

/// Gameplay effect of a platform, also its pooling bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformCategory {
    /// Player bounces on it
    #[serde(alias = "Good")]
    Safe,
    /// Touching it ends the run
    #[serde(alias = "Bad")]
    Hazard,
    /// Open slot the player drops through to score
    Gap,
}

impl PlatformCategory {
    pub const COUNT: usize = 3;
    pub const ALL: [PlatformCategory; Self::COUNT] = [Self::Safe, Self::Hazard, Self::Gap];

    /// Ordinal used to index [`PerCategory`]
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlatformCategory::Safe => 0,
            PlatformCategory::Hazard => 1,
            PlatformCategory::Gap => 2,
        }
    }

    /// Tag given to pooled instances of this category
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformCategory::Safe => "Safe",
            PlatformCategory::Hazard => "Hazard",
            PlatformCategory::Gap => "Gap",
        }
    }

    /// Parse an instance tag back into its category
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "safe" | "good" => Some(PlatformCategory::Safe),
            "hazard" | "bad" => Some(PlatformCategory::Hazard),
            "gap" => Some(PlatformCategory::Gap),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlatformCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size map keyed by category ordinal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerCategory<T> {
    slots: [T; PlatformCategory::COUNT],
}

impl<T: Default> Default for PerCategory<T> {
    fn default() -> Self {
        Self {
            slots: Default::default(),
        }
    }
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: PlatformCategory) -> &T {
        &self.slots[category.index()]
    }

    pub fn get_mut(&mut self, category: PlatformCategory) -> &mut T {
        &mut self.slots[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformCategory, &T)> {
        PlatformCategory::ALL.into_iter().zip(self.slots.iter())
    }
}
