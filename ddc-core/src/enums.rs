//! Enum types for engine instances and their tiered stores

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// RUNTIME TYPE
// ============================================================================

/// Family of distributed cache engine backing a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Alluxio,
    Jindo,
    GooseFs,
    JuiceFs,
    Thin,
    Efc,
    Eac,
    Vineyard,
}

impl RuntimeType {
    /// All known runtime types, in declaration order.
    pub const ALL: [RuntimeType; 8] = [
        RuntimeType::Alluxio,
        RuntimeType::Jindo,
        RuntimeType::GooseFs,
        RuntimeType::JuiceFs,
        RuntimeType::Thin,
        RuntimeType::Efc,
        RuntimeType::Eac,
        RuntimeType::Vineyard,
    ];

    /// Canonical lowercase name, as used in resource labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Alluxio => "alluxio",
            RuntimeType::Jindo => "jindo",
            RuntimeType::GooseFs => "goosefs",
            RuntimeType::JuiceFs => "juicefs",
            RuntimeType::Thin => "thin",
            RuntimeType::Efc => "efc",
            RuntimeType::Eac => "eac",
            RuntimeType::Vineyard => "vineyard",
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuntimeType {
    type Err = RuntimeTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        RuntimeType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| RuntimeTypeParseError(s.to_string()))
    }
}

/// Error when parsing an invalid runtime type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeTypeParseError(pub String);

impl fmt::Display for RuntimeTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid runtime type: {}", self.0)
    }
}

impl std::error::Error for RuntimeTypeParseError {}

// ============================================================================
// CLEAN POLICY
// ============================================================================

/// When cached data on a runtime's paths is purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CleanPolicy {
    /// Purge when the consumer asks for it
    OnDemand,
    /// Purge when the runtime is deleted
    #[default]
    OnRuntimeDeleted,
    /// Purge on every unmount
    Always,
}

impl CleanPolicy {
    /// Convert to the declared string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanPolicy::OnDemand => "OnDemand",
            CleanPolicy::OnRuntimeDeleted => "OnRuntimeDeleted",
            CleanPolicy::Always => "Always",
        }
    }
}

impl fmt::Display for CleanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CleanPolicy {
    type Err = CleanPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ondemand" => Ok(CleanPolicy::OnDemand),
            "onruntimedeleted" => Ok(CleanPolicy::OnRuntimeDeleted),
            "always" => Ok(CleanPolicy::Always),
            _ => Err(CleanPolicyParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid clean policy string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPolicyParseError(pub String);

impl fmt::Display for CleanPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid clean policy: {}", self.0)
    }
}

impl std::error::Error for CleanPolicyParseError {}

// ============================================================================
// MEDIUM TYPE
// ============================================================================

/// Storage medium backing a tiered store level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediumType {
    #[serde(rename = "MEM")]
    Memory,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "HDD")]
    Hdd,
}

impl MediumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediumType::Memory => "MEM",
            MediumType::Ssd => "SSD",
            MediumType::Hdd => "HDD",
        }
    }
}

impl fmt::Display for MediumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediumType {
    type Err = MediumTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MEM" => Ok(MediumType::Memory),
            "SSD" => Ok(MediumType::Ssd),
            "HDD" => Ok(MediumType::Hdd),
            _ => Err(MediumTypeParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid medium type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediumTypeParseError(pub String);

impl fmt::Display for MediumTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid medium type: {}", self.0)
    }
}

impl std::error::Error for MediumTypeParseError {}
