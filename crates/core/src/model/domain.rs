use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(pub String);

/// The four top-level topic areas questions are classified under.
///
/// Ordering follows the exam content outline and is used whenever domains are
/// iterated (sampling order, apportionment tie-breaks, report rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    Fundamentals,
    Predictive,
    Agile,
    BusinessAnalysis,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Fundamentals,
        Domain::Predictive,
        Domain::Agile,
        Domain::BusinessAnalysis,
    ];

    /// Short machine key, also used for storage and CLI arguments.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Domain::Fundamentals => "fundamentals",
            Domain::Predictive => "predictive",
            Domain::Agile => "agile",
            Domain::BusinessAnalysis => "business-analysis",
        }
    }

    /// Full human-readable domain title.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Domain::Fundamentals => "Project Management Fundamentals & Core Concepts",
            Domain::Predictive => "Predictive, Plan-Based Methodologies",
            Domain::Agile => "Agile Frameworks/Methodologies",
            Domain::BusinessAnalysis => "Business Analysis Frameworks",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Domain::ALL
            .into_iter()
            .find(|d| {
                d.key().eq_ignore_ascii_case(trimmed) || d.label().eq_ignore_ascii_case(trimmed)
            })
            .or_else(|| match trimmed.to_ascii_lowercase().as_str() {
                "ba" | "business_analysis" | "businessanalysis" => Some(Domain::BusinessAnalysis),
                _ => None,
            })
            .ok_or_else(|| UnknownDomain(trimmed.to_owned()))
    }
}
