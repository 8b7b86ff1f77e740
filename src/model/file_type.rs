//! File types flowing through the join and their static relationships.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, JoinError};

/// Every record set the join reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    SsmM,
    SsmP,
    SsmPMaskedSurrogateKey,
    SsmS,
    CnsmM,
    CnsmP,
    CnsmS,
    SgvM,
    SgvPMasked,
    SgvS,
    StsmM,
    StsmP,
    StsmS,
    SampleSurrogateKey,
    Ssm,
    Observation,
    Cnsm,
    Sgv,
    Stsm,
}

impl FileType {
    pub const ALL: &'static [FileType] = &[
        FileType::SsmM,
        FileType::SsmP,
        FileType::SsmPMaskedSurrogateKey,
        FileType::SsmS,
        FileType::CnsmM,
        FileType::CnsmP,
        FileType::CnsmS,
        FileType::SgvM,
        FileType::SgvPMasked,
        FileType::SgvS,
        FileType::StsmM,
        FileType::StsmP,
        FileType::StsmS,
        FileType::SampleSurrogateKey,
        FileType::Ssm,
        FileType::Observation,
        FileType::Cnsm,
        FileType::Sgv,
        FileType::Stsm,
    ];

    /// Stable identifier, also used as the directory name of the record set
    pub fn id(&self) -> &'static str {
        match self {
            FileType::SsmM => "ssm_m",
            FileType::SsmP => "ssm_p",
            FileType::SsmPMaskedSurrogateKey => "ssm_p_masked_surrogate_key",
            FileType::SsmS => "ssm_s",
            FileType::CnsmM => "cnsm_m",
            FileType::CnsmP => "cnsm_p",
            FileType::CnsmS => "cnsm_s",
            FileType::SgvM => "sgv_m",
            FileType::SgvPMasked => "sgv_p_masked",
            FileType::SgvS => "sgv_s",
            FileType::StsmM => "stsm_m",
            FileType::StsmP => "stsm_p",
            FileType::StsmS => "stsm_s",
            FileType::SampleSurrogateKey => "sample_surrogate_key",
            FileType::Ssm => "ssm",
            FileType::Observation => "observation",
            FileType::Cnsm => "cnsm",
            FileType::Sgv => "sgv",
            FileType::Stsm => "stsm",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        self.id()
    }

    /// Meta record set paired with a primary type
    pub fn meta_type(&self) -> Result<FileType, JoinError> {
        match self {
            FileType::SsmP | FileType::SsmPMaskedSurrogateKey => Ok(FileType::SsmM),
            FileType::CnsmP => Ok(FileType::CnsmM),
            FileType::SgvPMasked => Ok(FileType::SgvM),
            FileType::StsmP => Ok(FileType::StsmM),
            other => Err(unrelated(*other, "meta")),
        }
    }

    /// Secondary (consequence) record set paired with a primary type
    pub fn secondary_type(&self) -> Result<FileType, JoinError> {
        match self {
            FileType::SsmP | FileType::SsmPMaskedSurrogateKey => Ok(FileType::SsmS),
            FileType::CnsmP => Ok(FileType::CnsmS),
            FileType::SgvPMasked => Ok(FileType::SgvS),
            FileType::StsmP => Ok(FileType::StsmS),
            other => Err(unrelated(*other, "secondary")),
        }
    }

    /// Output record set produced from a primary type by the secondary join
    pub fn output_type(&self) -> Result<FileType, JoinError> {
        match self {
            FileType::SsmP | FileType::SsmPMaskedSurrogateKey => Ok(FileType::Ssm),
            FileType::CnsmP => Ok(FileType::Cnsm),
            FileType::SgvPMasked => Ok(FileType::Sgv),
            FileType::StsmP => Ok(FileType::Stsm),
            other => Err(unrelated(*other, "output")),
        }
    }

    /// Primary record set an output type is derived from
    pub fn primary_for_output(&self) -> Result<FileType, JoinError> {
        match self {
            FileType::Ssm | FileType::Observation => Ok(FileType::SsmPMaskedSurrogateKey),
            FileType::Cnsm => Ok(FileType::CnsmP),
            FileType::Sgv => Ok(FileType::SgvPMasked),
            FileType::Stsm => Ok(FileType::StsmP),
            other => Err(unrelated(*other, "primary")),
        }
    }
}

fn unrelated(file_type: FileType, relation: &str) -> JoinError {
    JoinError::config_with_code(
        ErrorCode::CONFIG_INVALID_VALUE,
        format!("File type {} has no {} counterpart", file_type, relation),
    )
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FileType {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        FileType::ALL
            .iter()
            .copied()
            .find(|t| t.id() == normalized)
            .ok_or_else(|| {
                JoinError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("Unknown file type '{}'", s),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_ids() {
        for file_type in FileType::ALL {
            assert_eq!(file_type.id().parse::<FileType>().unwrap(), *file_type);
        }
        assert_eq!("SSM_P".parse::<FileType>().unwrap(), FileType::SsmP);
        assert!("ssm_x".parse::<FileType>().is_err());
    }

    #[test]
    fn test_related_types() {
        let primary = FileType::SsmPMaskedSurrogateKey;
        assert_eq!(primary.meta_type().unwrap(), FileType::SsmM);
        assert_eq!(primary.secondary_type().unwrap(), FileType::SsmS);
        assert_eq!(FileType::StsmP.output_type().unwrap(), FileType::Stsm);
        assert_eq!(
            FileType::Cnsm.primary_for_output().unwrap(),
            FileType::CnsmP
        );
        assert!(FileType::SsmM.secondary_type().is_err());
    }

    #[test]
    fn test_serde_uses_screaming_case() {
        let json = serde_json::to_string(&FileType::SgvPMasked).unwrap();
        assert_eq!(json, "\"SGV_P_MASKED\"");
    }
}
