//! Player statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How submitted samples fold into a stat's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StatKind {
    /// Counter; increments are rounded to whole numbers.
    Int,
    /// Accumulator.
    #[default]
    Float,
    /// Running mean of all samples.
    Average,
    /// Largest sample seen.
    Max,
    /// Smallest sample seen.
    Min,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub stat_id: String,
    pub display_name: String,
    pub kind: StatKind,
    pub value: f64,
    pub default_value: f64,
    /// Samples folded in since the last reset.
    #[serde(default)]
    pub samples: u64,
}

impl Stat {
    pub fn new(stat_id: impl Into<String>, display_name: impl Into<String>, kind: StatKind) -> Self {
        Self {
            stat_id: stat_id.into(),
            display_name: display_name.into(),
            kind,
            value: 0.0,
            default_value: 0.0,
            samples: 0,
        }
    }

    pub fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self.value = default_value;
        self
    }

    /// Fresh instance of a definition, holding its default value.
    pub(crate) fn instantiate(&self) -> Self {
        Self {
            value: self.default_value,
            samples: 0,
            ..self.clone()
        }
    }

    /// Overwrite the value.
    pub fn set(&mut self, value: f64) {
        self.value = value;
        self.samples = 1;
    }

    /// Fold `sample` into the value according to the stat's kind.
    pub fn increment(&mut self, sample: f64) {
        self.value = match self.kind {
            StatKind::Int => self.value + sample.round(),
            StatKind::Float => self.value + sample,
            StatKind::Average => {
                let count = self.samples as f64;
                (self.value * count + sample) / (count + 1.0)
            }
            StatKind::Max if self.samples == 0 => sample,
            StatKind::Max => self.value.max(sample),
            StatKind::Min if self.samples == 0 => sample,
            StatKind::Min => self.value.min(sample),
        };
        self.samples += 1;
    }

    pub fn reset(&mut self) {
        self.value = self.default_value;
        self.samples = 0;
    }
}

/// Every stat tracked for the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub stats: BTreeMap<String, Stat>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PlayerStats {
    pub fn get(&self, stat_id: &str) -> Option<&Stat> {
        self.stats.get(stat_id)
    }

    pub fn contains(&self, stat_id: &str) -> bool {
        self.stats.contains_key(stat_id)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
