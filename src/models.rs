use serde::{Deserialize, Serialize};

/// Secret used to authenticate to a target.
///
/// A target carries either a password or a pre-computed authentication hash,
/// never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialMaterial {
    Password(String),
    Hash(String),
}

/// One remote host plus the identity used to authenticate to it.
///
/// Constructed once from input and read-only thereafter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub domain: String,
    pub username: String,
    pub material: CredentialMaterial,
}

impl Target {
    pub fn new(host: &str, domain: &str, username: &str, material: CredentialMaterial) -> Self {
        Self {
            host: host.to_string(),
            domain: domain.to_string(),
            username: username.to_string(),
            material,
        }
    }
}

/// One credential record recovered from a memory snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Security package or provider the record came from.
    pub ssp: String,
    pub domain: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Credential {
    /// Whether the record carries any secret at all.
    pub fn has_secret(&self) -> bool {
        self.password.is_some() || self.hash.is_some()
    }
}

/// Ordered sequence of extracted credential records.
pub type CredentialSet = Vec<Credential>;
