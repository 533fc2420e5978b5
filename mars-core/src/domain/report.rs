//! Report domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::research::StageName;

/// Kind of PDF report that can be rendered from a research result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Comprehensive,
    Executive,
    Market,
    Technical,
}

impl ReportType {
    /// Every report type, in the order they are generated and attached
    pub const ALL: [ReportType; 4] = [
        ReportType::Comprehensive,
        ReportType::Executive,
        ReportType::Market,
        ReportType::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Comprehensive => "comprehensive",
            ReportType::Executive => "executive",
            ReportType::Market => "market",
            ReportType::Technical => "technical",
        }
    }

    /// Human readable document title
    pub fn title(&self) -> &'static str {
        match self {
            ReportType::Comprehensive => "Comprehensive Research Report",
            ReportType::Executive => "Executive Summary",
            ReportType::Market => "Market Analysis Report",
            ReportType::Technical => "Technical Analysis Report",
        }
    }

    /// Research stages whose sections make up this report
    pub fn stages(&self) -> &'static [StageName] {
        match self {
            ReportType::Comprehensive | ReportType::Executive => &StageName::RESEARCH,
            ReportType::Market => &[StageName::Market, StageName::Financial, StageName::Ux],
            ReportType::Technical => &[
                StageName::Technology,
                StageName::Technical,
                StageName::Patent,
                StageName::Regulatory,
            ],
        }
    }

    /// Executive reports only carry summaries and key findings
    pub fn is_summary(&self) -> bool {
        matches!(self, ReportType::Executive)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a report type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReportType(pub String);

impl fmt::Display for UnknownReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown report type '{}' (expected one of: comprehensive, executive, market, technical)",
            self.0
        )
    }
}

impl std::error::Error for UnknownReportType {}

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comprehensive" => Ok(ReportType::Comprehensive),
            "executive" => Ok(ReportType::Executive),
            "market" => Ok(ReportType::Market),
            "technical" => Ok(ReportType::Technical),
            _ => Err(UnknownReportType(s.to_string())),
        }
    }
}
