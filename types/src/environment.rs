//! Service environment selection.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::TypesError;

/// Which payment service deployment the client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// The production service.
    Production,
    /// The public staging service.
    Staging,
    /// Development deployment.
    #[default]
    Development,
}

impl Environment {
    /// Base URL of the payment service for this environment.
    pub fn default_service_url(&self) -> &'static str {
        match self {
            Self::Production => "https://ads-serve.brave.com",
            Self::Staging => "https://ads-serve.bravesoftware.com",
            Self::Development => "https://ads-serve.brave.software",
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        }
    }
}

impl FromStr for Environment {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(TypesError::UnknownEnvironment(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn each_environment_has_its_own_url() {
        let urls = [
            Environment::Production.default_service_url(),
            Environment::Staging.default_service_url(),
            Environment::Development.default_service_url(),
        ];
        assert_ne!(urls[0], urls[1]);
        assert_ne!(urls[1], urls[2]);
    }
}
