//! Property listing model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Availability of a unit; flips to booked on successful payment or an
/// admin override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Available,
    Booked,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Booked => "booked",
        }
    }
}

impl From<&str> for PropertyStatus {
    fn from(s: &str) -> Self {
        match s {
            "booked" => PropertyStatus::Booked,
            _ => PropertyStatus::Available,
        }
    }
}

/// Superadmin-controlled visibility gate, separate from availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl From<&str> for ApprovalStatus {
    fn from(s: &str) -> Self {
        match s {
            "approved" => ApprovalStatus::Approved,
            "rejected" => ApprovalStatus::Rejected,
            _ => ApprovalStatus::Pending,
        }
    }
}

/// Property entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub price: f64,
    pub images: Vec<String>,
    pub address: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
    pub description: String,
    pub facilities: Vec<String>,
    pub geolocation: String,
    pub status: PropertyStatus,
    pub approval_status: ApprovalStatus,
    pub rating: f64,
    pub reviews: Vec<Uuid>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated new-listing payload, parsed from multipart form fields
#[derive(Debug, Clone)]
pub struct PropertyDraft {
    pub name: String,
    pub property_type: String,
    pub price: f64,
    pub address: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
    pub description: String,
    pub facilities: Vec<String>,
    pub geolocation: String,
    pub phone: Option<String>,
}

impl PropertyDraft {
    /// Parse and validate the text fields of a listing submission.
    /// Required: name, type, price, address, bedrooms, bathrooms,
    /// description. Numeric fields must parse.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, String> {
        let required = |key: &str| -> Result<String, String> {
            fields
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("{} is required", key))
        };

        let name = required("name")?;
        let property_type = required("type")?;
        let price = parse_f64(&required("price")?, "price")?;
        let address = required("address")?;
        let bedrooms = parse_i32(&required("bedrooms")?, "bedrooms")?;
        let bathrooms = parse_i32(&required("bathrooms")?, "bathrooms")?;
        let description = required("description")?;

        let area = match fields.get("area").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => parse_f64(raw, "area")?,
            None => 0.0,
        };

        let facilities = parse_facilities(fields.get("facilities").map(String::as_str))?;

        Ok(PropertyDraft {
            name,
            property_type,
            price,
            address,
            bedrooms,
            bathrooms,
            area,
            description,
            facilities,
            geolocation: fields.get("geolocation").cloned().unwrap_or_default(),
            phone: fields.get("phone").cloned().filter(|p| !p.is_empty()),
        })
    }
}

/// A partial listing update; absent fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct PropertyPatch {
    pub name: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<f64>,
    pub address: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area: Option<f64>,
    pub description: Option<String>,
    pub facilities: Option<Vec<String>>,
    pub geolocation: Option<String>,
    pub status: Option<PropertyStatus>,
    pub phone: Option<String>,
}

impl PropertyPatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, String> {
        let text = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let price = match text("price") {
            Some(raw) => Some(parse_f64(&raw, "price")?),
            None => None,
        };
        let bedrooms = match text("bedrooms") {
            Some(raw) => Some(parse_i32(&raw, "bedrooms")?),
            None => None,
        };
        let bathrooms = match text("bathrooms") {
            Some(raw) => Some(parse_i32(&raw, "bathrooms")?),
            None => None,
        };
        let area = match text("area") {
            Some(raw) => Some(parse_f64(&raw, "area")?),
            None => None,
        };
        let facilities = match fields.get("facilities").map(String::as_str) {
            Some(raw) if !raw.trim().is_empty() => Some(parse_facilities(Some(raw))?),
            _ => None,
        };

        Ok(PropertyPatch {
            name: text("name"),
            property_type: text("type"),
            price,
            address: text("address"),
            bedrooms,
            bathrooms,
            area,
            description: text("description"),
            facilities,
            geolocation: text("geolocation"),
            status: text("status").map(|s| PropertyStatus::from(s.as_str())),
            phone: text("phone"),
        })
    }
}

fn parse_f64(raw: &str, field: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("{} must be a number", field))
}

fn parse_i32(raw: &str, field: &str) -> Result<i32, String> {
    raw.parse::<i32>()
        .map_err(|_| format!("{} must be a number", field))
}

/// Facilities arrive as a JSON array string from the mobile form
fn parse_facilities(raw: Option<&str>) -> Result<Vec<String>, String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(raw).map_err(|_| "facilities must be a JSON array".to_string())
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> HashMap<String, String> {
        [
            ("name", "Sunset Apartments"),
            ("type", "Apartment"),
            ("price", "1200.50"),
            ("address", "12 Ring Road, Accra"),
            ("bedrooms", "3"),
            ("bathrooms", "2"),
            ("description", "Spacious unit near the mall"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn draft_parses_valid_fields() {
        let mut fields = base_fields();
        fields.insert("area".into(), "85.5".into());
        fields.insert("facilities".into(), r#"["Wifi","Parking"]"#.into());

        let draft = PropertyDraft::from_fields(&fields).expect("valid draft");
        assert_eq!(draft.name, "Sunset Apartments");
        assert_eq!(draft.price, 1200.50);
        assert_eq!(draft.bedrooms, 3);
        assert_eq!(draft.area, 85.5);
        assert_eq!(draft.facilities, vec!["Wifi", "Parking"]);
    }

    #[test]
    fn draft_rejects_missing_required_field() {
        let mut fields = base_fields();
        fields.remove("price");
        let err = PropertyDraft::from_fields(&fields).unwrap_err();
        assert_eq!(err, "price is required");
    }

    #[test]
    fn draft_rejects_non_numeric_fields() {
        let mut fields = base_fields();
        fields.insert("bedrooms".into(), "three".into());
        let err = PropertyDraft::from_fields(&fields).unwrap_err();
        assert_eq!(err, "bedrooms must be a number");
    }

    #[test]
    fn patch_keeps_absent_fields_unset() {
        let mut fields = HashMap::new();
        fields.insert("price".to_string(), "999".to_string());
        let patch = PropertyPatch::from_fields(&fields).expect("valid patch");
        assert_eq!(patch.price, Some(999.0));
        assert!(patch.name.is_none());
        assert!(patch.facilities.is_none());
    }

    #[test]
    fn approval_status_round_trip() {
        assert_eq!(ApprovalStatus::from("approved"), ApprovalStatus::Approved);
        assert_eq!(ApprovalStatus::from("rejected"), ApprovalStatus::Rejected);
        assert_eq!(ApprovalStatus::from("anything"), ApprovalStatus::Pending);
        assert_eq!(ApprovalStatus::Approved.as_str(), "approved");
    }
}
