//! Facility / station / charging point / charger entities

use serde::{Deserialize, Serialize};

/// Availability status shared by every level of the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Active,
    Inactive,
    /// A charging session is running on the resource (or on one of its children)
    Using,
    /// Held by a reservation (points and chargers only)
    Booked,
    /// Taken out of service by staff (points and chargers only)
    Maintenance,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Using => "using",
            Self::Booked => "booked",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "using" => Some(Self::Using),
            "booked" => Some(Self::Booked),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl Default for ResourceStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Level in the facility > station > point > charger hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Facility,
    Station,
    Point,
    Charger,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facility => "facility",
            Self::Station => "station",
            Self::Point => "point",
            Self::Charger => "charger",
        }
    }

    /// Whether a resource of this kind may ever hold `status`.
    pub fn supports(&self, status: ResourceStatus) -> bool {
        match status {
            ResourceStatus::Active | ResourceStatus::Inactive => true,
            ResourceStatus::Using => !matches!(self, Self::Facility),
            ResourceStatus::Booked | ResourceStatus::Maintenance => {
                matches!(self, Self::Point | Self::Charger)
            }
        }
    }
}

/// Id-based handle to any resource in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Facility(i32),
    Station(i32),
    Point(i32),
    Charger(i32),
}

impl ResourceRef {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Facility(_) => ResourceKind::Facility,
            Self::Station(_) => ResourceKind::Station,
            Self::Point(_) => ResourceKind::Point,
            Self::Charger(_) => ResourceKind::Charger,
        }
    }

    pub fn id(&self) -> i32 {
        match *self {
            Self::Facility(id) | Self::Station(id) | Self::Point(id) | Self::Charger(id) => id,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::Facility(_) => "Facility",
            Self::Station(_) => "Station",
            Self::Point(_) => "ChargingPoint",
            Self::Charger(_) => "Charger",
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind().as_str(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub id: i32,
    pub name: String,
    pub status: ResourceStatus,
    /// Soft-delete flag; rows stay for historical sessions
    pub deleted: bool,
}

impl Facility {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: ResourceStatus::Active,
            deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: i32,
    pub facility_id: i32,
    pub name: String,
    pub status: ResourceStatus,
    pub deleted: bool,
}

impl Station {
    pub fn new(id: i32, facility_id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            facility_id,
            name: name.into(),
            status: ResourceStatus::Active,
            deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargingPoint {
    pub id: i32,
    pub station_id: i32,
    pub name: String,
    /// Price per kWh in whole currency units
    pub price_per_kwh: i64,
    pub status: ResourceStatus,
    pub deleted: bool,
}

impl ChargingPoint {
    pub fn new(id: i32, station_id: i32, name: impl Into<String>, price_per_kwh: i64) -> Self {
        Self {
            id,
            station_id,
            name: name.into(),
            price_per_kwh,
            status: ResourceStatus::Active,
            deleted: false,
        }
    }

    /// A session may be admitted onto the point in its current status.
    pub fn accepts_session(&self) -> bool {
        !self.deleted && matches!(self.status, ResourceStatus::Active | ResourceStatus::Booked)
    }

    pub fn is_using(&self) -> bool {
        self.status == ResourceStatus::Using
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Charger {
    pub id: i32,
    pub point_id: i32,
    pub connector_type: String,
    pub status: ResourceStatus,
    pub deleted: bool,
}

impl Charger {
    pub fn new(id: i32, point_id: i32, connector_type: impl Into<String>) -> Self {
        Self {
            id,
            point_id,
            connector_type: connector_type.into(),
            status: ResourceStatus::Active,
            deleted: false,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facility_never_holds_point_only_statuses() {
        assert!(!ResourceKind::Facility.supports(ResourceStatus::Using));
        assert!(!ResourceKind::Facility.supports(ResourceStatus::Booked));
        assert!(!ResourceKind::Station.supports(ResourceStatus::Maintenance));
        assert!(ResourceKind::Station.supports(ResourceStatus::Using));
        assert!(ResourceKind::Point.supports(ResourceStatus::Booked));
        assert!(ResourceKind::Charger.supports(ResourceStatus::Maintenance));
    }

    #[test]
    fn point_accepts_session_only_when_active_or_booked() {
        let mut p = ChargingPoint::new(1, 1, "P1", 3000);
        assert!(p.accepts_session());
        p.status = ResourceStatus::Booked;
        assert!(p.accepts_session());
        p.status = ResourceStatus::Maintenance;
        assert!(!p.accepts_session());
        p.status = ResourceStatus::Active;
        p.deleted = true;
        assert!(!p.accepts_session());
    }

    #[test]
    fn resource_ref_display() {
        assert_eq!(ResourceRef::Point(12).to_string(), "point#12");
        assert_eq!(ResourceRef::Facility(1).kind(), ResourceKind::Facility);
    }

    #[test]
    fn unknown_status_string() {
        assert_eq!(ResourceStatus::from_str("using"), Some(ResourceStatus::Using));
        assert_eq!(ResourceStatus::from_str("broken"), None);
    }
}
