use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::models::{Analysis, AnalysisOutcome, Project};

pub const RESULTS_FILE_NAME: &str = "career-assessment-results.json";

/// The downloadable results document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsExport {
    pub analysis: Analysis,
    pub recommendations: Vec<Project>,
    pub timestamp: DateTime<Utc>,
}

impl ResultsExport {
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        Self {
            analysis: outcome.analysis.clone(),
            recommendations: outcome.projects.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_pretty()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write results to {}", path.display()))
    }
}
