//! Subject name templates
//!
//! Every certificate in a bundle shares the same organisational suffix; only
//! the common name differs between the CA, the server and the user.

use rcgen::{DistinguishedName, DnType};
use serde::{Deserialize, Serialize};

/// Organisational suffix appended after the common name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectTemplate {
    /// Organization (O)
    pub organization: String,
    /// Organizational unit (OU)
    pub organizational_unit: String,
    /// Two-letter country code (C)
    pub country: String,
    /// State or province (ST)
    pub state: String,
    /// Locality (L)
    pub locality: String,
}

impl Default for SubjectTemplate {
    fn default() -> Self {
        Self::hub_profile()
    }
}

impl SubjectTemplate {
    /// Suffix used by the JupyterHub spawner
    #[must_use]
    pub fn hub_profile() -> Self {
        Self {
            organization: "coffea".to_string(),
            organizational_unit: "Coffea farm".to_string(),
            country: "US".to_string(),
            state: "Illinois".to_string(),
            locality: "Chicago".to_string(),
        }
    }

    /// Suffix used when credentials are minted inside the analysis image
    #[must_use]
    pub fn image_profile() -> Self {
        Self {
            organization: "coffea".to_string(),
            organizational_unit: "Coffea casa".to_string(),
            country: "US".to_string(),
            state: "Nebraska".to_string(),
            locality: "UNL".to_string(),
        }
    }

    /// Build the full name: CN first, then O, OU, C, ST, L
    #[must_use]
    pub fn distinguished_name(&self, common_name: &str) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        dn.push(DnType::OrganizationName, self.organization.as_str());
        dn.push(DnType::OrganizationalUnitName, self.organizational_unit.as_str());
        dn.push(DnType::CountryName, self.country.as_str());
        dn.push(DnType::StateOrProvinceName, self.state.as_str());
        dn.push(DnType::LocalityName, self.locality.as_str());
        dn
    }
}
