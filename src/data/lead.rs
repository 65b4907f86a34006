//! ECG derivations and beat classes.

use serde::Serialize;
use std::fmt;

/// One of the 12 standard ECG derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Lead {
    I,
    II,
    III,
    #[serde(rename = "aVR")]
    AVR,
    #[serde(rename = "aVL")]
    AVL,
    #[serde(rename = "aVF")]
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

impl Lead {
    /// Plot and export order.
    pub const ALL: [Lead; 12] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            Lead::I => "I",
            Lead::II => "II",
            Lead::III => "III",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
        }
    }

    /// Computed from I and II rather than recorded.
    pub fn is_derived(&self) -> bool {
        matches!(self, Lead::III | Lead::AVR | Lead::AVL | Lead::AVF)
    }

    pub fn column_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|lead| lead.column_name()).collect()
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Classification of an annotated heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BeatClass {
    Normal,
    Anomalous,
}

impl BeatClass {
    /// Annotation code 0 is a normal beat, anything else is anomalous.
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            BeatClass::Normal
        } else {
            BeatClass::Anomalous
        }
    }
}
