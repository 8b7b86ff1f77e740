use serde::{Deserialize, Serialize};

/// Resolved identity of one submitted analyzed sample within a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DonorSample {
    /// Project the submission belongs to
    pub project_id: String,
    /// Donor id as submitted
    pub submitted_donor_id: String,
    /// Surrogate donor id
    pub donor_id: String,
    /// Analyzed sample id as submitted
    pub submitted_sample_id: String,
    /// Surrogate sample id
    pub sample_id: String,
}
