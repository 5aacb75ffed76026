//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Delivery status of a shipment, as reported by the delivery service.
///
/// Values the client does not know deserialize to [`ShipmentStatus::Unknown`]
/// instead of failing the whole shipment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Created, waiting to be picked up at the warehouse.
    #[default]
    PendingPickup,
    /// Assigned to a driver (route taken or direct assignment).
    Assigned,
    /// On its way to the customer.
    InTransit,
    /// Delivered with evidence.
    Delivered,
    /// Could not be delivered; heading back.
    Failed,
    /// Back at the warehouse.
    Returned,
    /// Cancelled before completion.
    Cancelled,
    /// Anything this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl ShipmentStatus {
    /// Wire value of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPickup => "PENDING_PICKUP",
            Self::Assigned => "ASSIGNED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::Returned => "RETURNED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire value. Unrecognised strings map to `Unknown`.
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s {
            "PENDING_PICKUP" => Self::PendingPickup,
            "ASSIGNED" => Self::Assigned,
            "IN_TRANSIT" => Self::InTransit,
            "DELIVERED" => Self::Delivered,
            "FAILED" => Self::Failed,
            "RETURNED" => Self::Returned,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User role as reported by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Usuario,
    /// Delivery driver.
    Despachador,
    /// Store administrator.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usuario => write!(f, "USUARIO"),
            Self::Despachador => write!(f, "DESPACHADOR"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches("ROLE_").to_ascii_uppercase().as_str() {
            "USUARIO" | "USER" => Ok(Self::Usuario),
            "DESPACHADOR" | "DRIVER" => Ok(Self::Despachador),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_status_unknown_value() {
        let status: ShipmentStatus = serde_json::from_str("\"LOST_IN_SPACE\"").unwrap();
        assert_eq!(status, ShipmentStatus::Unknown);
    }

    #[test]
    fn test_shipment_status_wire_roundtrip() {
        for status in [
            ShipmentStatus::PendingPickup,
            ShipmentStatus::Assigned,
            ShipmentStatus::InTransit,
            ShipmentStatus::Delivered,
            ShipmentStatus::Failed,
            ShipmentStatus::Returned,
            ShipmentStatus::Cancelled,
        ] {
            assert_eq!(ShipmentStatus::from_wire(status.as_str()), status);
        }
    }

    #[test]
    fn test_role_from_str_accepts_spring_prefix() {
        assert_eq!("ROLE_ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("despachador".parse::<Role>().unwrap(), Role::Despachador);
        assert!("janitor".parse::<Role>().is_err());
    }
}
