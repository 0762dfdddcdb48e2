//! Restaurant locations and their postal addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FeatureSet, LocationId, OperatingHours, RestaurantId};
use crate::validation::{
    FieldErrors, ValidationError, check_optional_phone, is_valid_cep, require_text,
    validate_url_slug,
};

/// Brazilian state codes (UF).
pub const STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Postal address of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_zip_code: String,
    pub address_street: String,
    pub address_number: String,
    #[serde(default)]
    pub address_complement: Option<String>,
    pub address_neighborhood: String,
    pub address_city: String,
    pub address_state: String,
}

impl Address {
    /// Validate into `errors` using `prefix` for field paths.
    pub fn validate_into(&self, prefix: &str, errors: &mut FieldErrors) {
        let path = |field: &str| format!("{prefix}.{field}");

        if self.address_zip_code.trim().is_empty() {
            errors.insert(path("address_zip_code"), ValidationError::Required);
        } else if !is_valid_cep(&self.address_zip_code) {
            errors.insert(path("address_zip_code"), ValidationError::InvalidCep);
        }
        for (field, value, max) in [
            ("address_street", &self.address_street, 200),
            ("address_number", &self.address_number, 20),
            ("address_neighborhood", &self.address_neighborhood, 100),
            ("address_city", &self.address_city, 100),
        ] {
            if let Err(e) = require_text(value, max) {
                errors.insert(path(field), e);
            }
        }
        if let Some(complement) = &self.address_complement
            && complement.chars().count() > 100
        {
            errors.insert(
                path("address_complement"),
                ValidationError::TooLong { max: 100 },
            );
        }
        if !STATES.contains(&self.address_state.as_str()) {
            errors.insert(
                path("address_state"),
                ValidationError::Other("Estado inválido".to_owned()),
            );
        }
    }
}

/// A physical location of a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub url_name: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub address: Address,
    pub operating_hours: OperatingHours,
    pub selected_features: FeatureSet,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub url_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    pub address: Address,
    #[serde(default)]
    pub operating_hours: OperatingHours,
    #[serde(default)]
    pub selected_features: FeatureSet,
}

impl LocationInput {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by field path (`address.*` and `operating_hours.*`
    /// for nested values).
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.validate_into("", &mut errors);
        errors.into_result()
    }

    /// Validate into `errors`, prefixing paths with `prefix` when non-empty.
    pub fn validate_into(&self, prefix: &str, errors: &mut FieldErrors) {
        let path = |field: &str| {
            if prefix.is_empty() {
                field.to_owned()
            } else {
                format!("{prefix}.{field}")
            }
        };

        if let Err(e) = require_text(&self.name, 100) {
            errors.insert(path("name"), e);
        }
        if let Err(e) = validate_url_slug(&self.url_name) {
            errors.insert(path("url_name"), e);
        }
        if let Err(e) = check_optional_phone(self.phone.as_deref()) {
            errors.insert(path("phone"), e);
        }
        if let Err(e) = check_optional_phone(self.whatsapp.as_deref()) {
            errors.insert(path("whatsapp"), e);
        }
        self.address.validate_into(&path("address"), errors);
        if let Err(hours) = self.operating_hours.validate() {
            errors.extend_prefixed(&path("operating_hours"), hours);
        }
    }
}

/// Partial update of a location. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<OperatingHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_features: Option<FeatureSet>,
}

impl LocationPatch {
    /// Validate the fields present in the patch.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by field path.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name
            && let Err(e) = require_text(name, 100)
        {
            errors.insert("name", e);
        }
        if let Some(url_name) = &self.url_name
            && let Err(e) = validate_url_slug(url_name)
        {
            errors.insert("url_name", e);
        }
        if let Err(e) = check_optional_phone(self.phone.as_deref()) {
            errors.insert("phone", e);
        }
        if let Err(e) = check_optional_phone(self.whatsapp.as_deref()) {
            errors.insert("whatsapp", e);
        }
        if let Some(address) = &self.address {
            address.validate_into("address", &mut errors);
        }
        if let Some(hours) = &self.operating_hours
            && let Err(e) = hours.validate()
        {
            errors.extend_prefixed("operating_hours", e);
        }
        errors.into_result()
    }

    /// Apply the patch to an existing location in memory.
    pub fn apply_to(self, location: &mut Location) {
        if let Some(name) = self.name {
            location.name = name;
        }
        if let Some(url_name) = self.url_name {
            location.url_name = url_name;
        }
        if self.phone.is_some() {
            location.phone = self.phone;
        }
        if self.whatsapp.is_some() {
            location.whatsapp = self.whatsapp;
        }
        if let Some(address) = self.address {
            location.address = address;
        }
        if let Some(hours) = self.operating_hours {
            location.operating_hours = hours;
        }
        if let Some(features) = self.selected_features {
            location.selected_features = features;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_address() -> Address {
        Address {
            address_zip_code: "01310-100".to_owned(),
            address_street: "Avenida Paulista".to_owned(),
            address_number: "1000".to_owned(),
            address_complement: None,
            address_neighborhood: "Bela Vista".to_owned(),
            address_city: "São Paulo".to_owned(),
            address_state: "SP".to_owned(),
        }
    }

    pub(crate) fn sample_input() -> LocationInput {
        LocationInput {
            name: "Centro".to_owned(),
            url_name: "centro".to_owned(),
            phone: Some("(11) 3456-7890".to_owned()),
            whatsapp: None,
            address: sample_address(),
            operating_hours: OperatingHours::default(),
            selected_features: FeatureSet::default(),
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(sample_input().validate().is_ok());
    }

    #[test]
    fn test_nested_error_paths() {
        let mut input = sample_input();
        input.address.address_zip_code = "123".to_owned();
        input.address.address_state = "XX".to_owned();
        input.operating_hours.monday.open = "99:00".to_owned();

        let mut errors = FieldErrors::new();
        input.validate_into("0", &mut errors);
        assert!(errors.get("0.address.address_zip_code").is_some());
        assert!(errors.get("0.address.address_state").is_some());
        assert!(errors.get("0.operating_hours.monday.open").is_some());
    }

    #[test]
    fn test_patch_validates_only_present_fields() {
        let patch = LocationPatch {
            name: Some("Filial".to_owned()),
            ..LocationPatch::default()
        };
        assert!(patch.validate().is_ok());

        let patch = LocationPatch {
            url_name: Some("X".to_owned()),
            ..LocationPatch::default()
        };
        assert!(patch.validate().unwrap_err().get("url_name").is_some());
    }
}
