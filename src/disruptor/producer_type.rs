//! Producer Type
//!
//! Selects which sequencer a ring buffer is built on.

use serde::{Deserialize, Serialize};

/// Number of threads that will publish into a ring buffer
///
/// # Examples
/// ```
/// use ringlane::disruptor::ProducerType;
///
/// let producer_type: ProducerType = "single".parse().unwrap();
/// assert!(producer_type.is_single());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerType {
    /// Exactly one publishing thread; claims without atomic read-modify-write
    Single,

    /// Any number of publishing threads; claims with fetch-add/CAS and tracks
    /// publication per slot
    #[default]
    Multi,
}

impl ProducerType {
    /// Returns true if this is a single producer type
    pub fn is_single(&self) -> bool {
        matches!(self, ProducerType::Single)
    }

    /// Returns true if this is a multi producer type
    pub fn is_multi(&self) -> bool {
        matches!(self, ProducerType::Multi)
    }
}

impl std::fmt::Display for ProducerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerType::Single => write!(f, "single"),
            ProducerType::Multi => write!(f, "multi"),
        }
    }
}

impl std::str::FromStr for ProducerType {
    type Err = String;

    /// Parse `single` or `multi`, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(ProducerType::Single),
            "multi" => Ok(ProducerType::Multi),
            _ => Err(format!(
                "Invalid producer type: '{s}'. Valid values are 'single' or 'multi'"
            )),
        }
    }
}
