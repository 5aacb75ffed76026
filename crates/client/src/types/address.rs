//! Shipping address wire types (served by the orders service).

use redthread_core::AddressId;
use serde::{Deserialize, Serialize};

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    #[serde(default)]
    pub default: bool,
}

impl Address {
    /// Single-line rendering, e.g. `Av. Siempre Viva 742, Depto 3, Santiago, RM`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.as_str()];
        if let Some(line2) = self.line2.as_deref().filter(|l| !l.trim().is_empty()) {
            parts.push(line2);
        }
        parts.push(&self.city);
        parts.push(&self.state);
        parts.join(", ")
    }
}

/// Body for `POST addresses`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub default: bool,
}

/// Body for `PATCH addresses/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddressRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_skips_blank_line2() {
        let address = Address {
            id: AddressId::new(1),
            line1: "Av. Providencia 1234".to_string(),
            line2: Some("  ".to_string()),
            city: "Santiago".to_string(),
            state: "RM".to_string(),
            zip: "7500000".to_string(),
            country: "CL".to_string(),
            default: true,
        };
        assert_eq!(address.one_line(), "Av. Providencia 1234, Santiago, RM");
    }

    #[test]
    fn test_update_request_omits_absent_fields() {
        let req = UpdateAddressRequest {
            city: Some("Valparaíso".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"city":"Valparaíso"}"#);
    }
}
