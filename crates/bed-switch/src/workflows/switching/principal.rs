use std::collections::BTreeSet;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::domain::{ApproverId, PropertyId, TenantId};
use super::error::SwitchError;

pub const ROLE_HEADER: &str = "x-principal-role";
pub const ID_HEADER: &str = "x-principal-id";
pub const PROPERTIES_HEADER: &str = "x-principal-properties";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Landlord,
    PropertyManager,
}

/// A landlord or manager together with the properties they may act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approver {
    pub id: ApproverId,
    pub role: ApproverRole,
    pub properties: BTreeSet<PropertyId>,
}

impl Approver {
    pub fn covers(&self, property_id: &PropertyId) -> bool {
        self.properties.contains(property_id)
    }
}

/// Authenticated caller. Resolved upstream and passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Tenant(TenantId),
    Approver(Approver),
}

impl Principal {
    pub fn tenant(id: impl Into<String>) -> Self {
        Self::Tenant(TenantId::new(id))
    }

    pub fn landlord<I, P>(id: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self::Approver(Approver {
            id: ApproverId::new(id),
            role: ApproverRole::Landlord,
            properties: properties.into_iter().map(PropertyId::new).collect(),
        })
    }

    /// Read the identity forwarded by the authentication gateway.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, SwitchError> {
        let role = header_value(headers, ROLE_HEADER)?;
        let id = header_value(headers, ID_HEADER)?;

        match role.to_ascii_lowercase().as_str() {
            "tenant" => Ok(Self::Tenant(TenantId::new(id))),
            "landlord" | "manager" | "property_manager" => {
                let role = if role.eq_ignore_ascii_case("landlord") {
                    ApproverRole::Landlord
                } else {
                    ApproverRole::PropertyManager
                };
                let properties = headers
                    .get(PROPERTIES_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|property| !property.is_empty())
                    .map(PropertyId::new)
                    .collect();
                Ok(Self::Approver(Approver {
                    id: ApproverId::new(id),
                    role,
                    properties,
                }))
            }
            other => Err(SwitchError::Unauthenticated(format!(
                "unknown principal role '{other}'"
            ))),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, SwitchError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SwitchError::Unauthenticated(format!("missing {name} header")))
}
