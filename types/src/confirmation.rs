//! Confirmation types reported for an ad event.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// What the user did with the ad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationType {
    View,
    Click,
    Landed,
}

impl ConfirmationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::Landed => "landed",
        }
    }
}

impl fmt::Display for ConfirmationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "click" => Ok(Self::Click),
            "landed" => Ok(Self::Landed),
            _ => Err(TypesError::UnknownConfirmationType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        for t in [ConfirmationType::View, ConfirmationType::Click, ConfirmationType::Landed] {
            assert_eq!(t.as_str().parse::<ConfirmationType>().unwrap(), t);
        }
        assert!("dismiss".parse::<ConfirmationType>().is_err());
    }
}
