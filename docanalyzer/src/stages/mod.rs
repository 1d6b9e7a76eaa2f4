//! The four analysis stages and their display state.
//!
//! The service runs a fixed agent pipeline. The client never receives
//! per-stage status; it infers it from the job status and the outputs that
//! have arrived so far (see [`derive_pipeline`]).

mod derive;

pub use derive::{derive_pipeline, outputs_received, progress_percent, stage_state, PipelineView, StageView};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the analysis pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Checks that the upload is a financial document.
    Verification,
    /// Reads the statements.
    FinancialAnalysis,
    /// Turns the analysis into investment advice.
    InvestmentAnalysis,
    /// Lists the risks.
    RiskAssessment,
}

impl PipelineStage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::Verification,
        Self::FinancialAnalysis,
        Self::InvestmentAnalysis,
        Self::RiskAssessment,
    ];

    /// Number of stages.
    pub const COUNT: usize = Self::ALL.len();

    /// Key under which the stage's output appears in `agent_outputs`.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::FinancialAnalysis => "financial_analysis",
            Self::InvestmentAnalysis => "investment_analysis",
            Self::RiskAssessment => "risk_assessment",
        }
    }

    /// Name of the agent running the stage.
    #[must_use]
    pub const fn agent_name(&self) -> &'static str {
        match self {
            Self::Verification => "Financial Document Verifier",
            Self::FinancialAnalysis => "Senior Financial Analyst",
            Self::InvestmentAnalysis => "Investment Advisor",
            Self::RiskAssessment => "Risk Assessment Specialist",
        }
    }

    /// Zero-based position in the pipeline.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Verification => 0,
            Self::FinancialAnalysis => 1,
            Self::InvestmentAnalysis => 2,
            Self::RiskAssessment => 3,
        }
    }

    /// Two-digit label, `01` to `04`.
    #[must_use]
    pub fn number(&self) -> String {
        format!("{:02}", self.index() + 1)
    }

    /// Looks a stage up by its output key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.key() == key)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        for (i, stage) in PipelineStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(PipelineStage::COUNT, 4);
    }

    #[test]
    fn test_stage_numbers() {
        assert_eq!(PipelineStage::Verification.number(), "01");
        assert_eq!(PipelineStage::RiskAssessment.number(), "04");
    }

    #[test]
    fn test_from_key() {
        assert_eq!(
            PipelineStage::from_key("investment_analysis"),
            Some(PipelineStage::InvestmentAnalysis)
        );
        assert_eq!(PipelineStage::from_key("summary"), None);
    }

    #[test]
    fn test_serialize_uses_key() {
        let json = serde_json::to_string(&PipelineStage::FinancialAnalysis).unwrap();
        assert_eq!(json, r#""financial_analysis""#);
    }
}
