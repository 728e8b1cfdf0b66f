use serde::{Deserialize, Serialize};

pub type Matrix = Vec<Vec<f64>>;

pub const CONST_NAME: &str = "const";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoCriterion {
    Ll,
    Aic,
    Bic,
    Hqic,
}

impl InfoCriterion {
    pub fn name(&self) -> &'static str {
        match self {
            InfoCriterion::Ll => "ll",
            InfoCriterion::Aic => "aic",
            InfoCriterion::Bic => "bic",
            InfoCriterion::Hqic => "hqic",
        }
    }
}

impl std::str::FromStr for InfoCriterion {
    type Err = crate::error::RobustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ll" => Ok(InfoCriterion::Ll),
            "aic" => Ok(InfoCriterion::Aic),
            "bic" => Ok(InfoCriterion::Bic),
            "hqic" => Ok(InfoCriterion::Hqic),
            other => Err(crate::error::RobustError::InvalidArgument(format!(
                "unknown information criterion {other}; expected ll, aic, bic or hqic"
            ))),
        }
    }
}
