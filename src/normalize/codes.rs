use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn as_code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Sex::Male),
            "F" => Some(Sex::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Insurance coverage type of a family card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageType {
    /// National health insurance (건강보험).
    #[serde(rename = "1")]
    HealthInsurance,
    /// Medical aid (의료급여).
    #[serde(rename = "2")]
    MedicalAid,
}

impl CoverageType {
    pub fn as_code(&self) -> &'static str {
        match self {
            CoverageType::HealthInsurance => "1",
            CoverageType::MedicalAid => "2",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "1" => Some(CoverageType::HealthInsurance),
            "2" => Some(CoverageType::MedicalAid),
            _ => None,
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}
