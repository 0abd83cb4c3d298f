use clap::ValueEnum;
use std::str::FromStr;

pub enum Auth {
    /// Service-role key, bypasses row level security
    ServiceKey(String),
    /// Public anonymous key, subject to row level security
    AnonKey(String),
    /// Don't send any key (local PostgREST without JWT)
    None,
}

impl Auth {
    pub fn new(r#type: &AuthType, service_key: Option<String>, anon_key: Option<String>) -> Self {
        match (r#type, service_key, anon_key) {
            (AuthType::Service, Some(key), _) => Self::ServiceKey(key),
            (AuthType::Anon, _, Some(key)) => Self::AnonKey(key),
            _ => Self::None,
        }
    }

    /// The key sent in both the `apikey` and bearer headers
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::ServiceKey(key) | Self::AnonKey(key) => Some(key),
            Self::None => None,
        }
    }
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceKey(_) => write!(f, "ServiceKey"),
            Self::AnonKey(_) => write!(f, "AnonKey"),
            Self::None => write!(f, "None"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AuthType {
    Service,
    Anon,
    None,
}

impl FromStr for AuthType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "anon" => Ok(Self::Anon),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}
