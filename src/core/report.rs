use crate::core::{Finding, SeveritySummary, Stage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub apple_silicon: bool,
    pub current_arch: String,
    pub chip_model: String,
    pub os_version: String,
    pub rosetta_installed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub stage: Stage,
    pub facts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: String,
    pub host: HostProfile,
    pub sections: Vec<Section>,
    pub findings: Vec<Finding>,
    pub summary: SeveritySummary,
}

impl Report {
    pub fn has_critical(&self) -> bool {
        self.summary.has_critical()
    }
}
