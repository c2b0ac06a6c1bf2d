use serde::{Deserialize, Serialize};

/// The signature database the engine scanned with: engine version plus the
/// date its rules were published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definitions {
    pub engine_version: String,
    pub rules_date: String,
}

impl Definitions {
    pub fn unknown() -> Self {
        Definitions {
            engine_version: "unknown".to_string(),
            rules_date: "unknown".to_string(),
        }
    }
}

/// One signature match: the scanned item it was found in and the signature
/// name the engine reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infection {
    pub id: String,
    pub name: String,
}

/// Outcome of a scan. Every verdict carries the definitions in force when
/// it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean(Definitions),
    Infected {
        definitions: Definitions,
        infections: Vec<Infection>,
    },
}

impl ScanVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanVerdict::Clean(_))
    }

    pub fn definitions(&self) -> &Definitions {
        match self {
            ScanVerdict::Clean(definitions) => definitions,
            ScanVerdict::Infected { definitions, .. } => definitions,
        }
    }
}
