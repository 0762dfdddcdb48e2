//! Restaurants, payment configuration and media assets.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BusinessType, Email, FeatureSet, Location, LocationInput, MediaAssetId, MediaKind,
    RestaurantId, RestaurantStatus, SubscriptionPlan, UserId,
};
use crate::validation::{
    FieldErrors, PixKeyType, ValidationError, check_optional_phone, is_valid_cnpj, require_text,
    validate_pix_key, validate_url_slug,
};

/// Payment method a restaurant accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Pix,
    MealVoucher,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Pix => "pix",
            Self::MealVoucher => "meal_voucher",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "credit_card" => Ok(Self::CreditCard),
            "debit_card" => Ok(Self::DebitCard),
            "pix" => Ok(Self::Pix),
            "meal_voucher" => Ok(Self::MealVoucher),
            _ => Err(format!("unknown payment method: {s}")),
        }
    }
}

/// A PIX key together with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixKey {
    pub key_type: PixKeyType,
    pub key: String,
}

/// Accepted payment methods and PIX configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    pub accepted_methods: BTreeSet<PaymentMethod>,
    #[serde(default)]
    pub pix: Option<PixKey>,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            accepted_methods: BTreeSet::from([PaymentMethod::Cash]),
            pix: None,
        }
    }
}

impl PaymentSettings {
    /// At least one method; a valid PIX key whenever PIX is accepted.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by `accepted_methods` or `pix.key`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.accepted_methods.is_empty() {
            errors.insert(
                "accepted_methods",
                ValidationError::Other("Selecione ao menos uma forma de pagamento".to_owned()),
            );
        }
        if self.accepted_methods.contains(&PaymentMethod::Pix) {
            match &self.pix {
                None => errors.insert("pix.key", ValidationError::Required),
                Some(pix) => {
                    if let Err(e) = validate_pix_key(pix.key_type, &pix.key) {
                        errors.insert("pix.key", e);
                    }
                }
            }
        }
        errors.into_result()
    }

    /// Method names for storage.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.accepted_methods
            .iter()
            .map(|m| m.as_str().to_owned())
            .collect()
    }
}

/// A restaurant (tenant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    /// Public slug; immutable once created.
    pub url_name: String,
    pub description: Option<String>,
    pub business_type: BusinessType,
    pub cuisine_type: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub website: Option<String>,
    pub cnpj: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub selected_features: FeatureSet,
    pub status: RestaurantStatus,
    pub payment: PaymentSettings,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn check_website(value: Option<&str>) -> Result<(), ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(v) if (v.starts_with("http://") || v.starts_with("https://")) && v.len() > 10 => {
            Ok(())
        }
        Some(_) => Err(ValidationError::Other("URL inválida".to_owned())),
    }
}

fn check_cnpj(value: Option<&str>) -> Result<(), ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(v) if is_valid_cnpj(v) => Ok(()),
        Some(_) => Err(ValidationError::InvalidCnpj),
    }
}

fn check_email(value: Option<&str>) -> Result<(), ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(v) => Email::parse(v)
            .map(|_| ())
            .map_err(|_| ValidationError::InvalidEmail),
    }
}

/// Validation shared by creation and update for the optional contact block.
fn validate_contact(
    errors: &mut FieldErrors,
    email: Option<&str>,
    phone: Option<&str>,
    whatsapp: Option<&str>,
    website: Option<&str>,
    cnpj: Option<&str>,
) {
    if let Err(e) = check_email(email) {
        errors.insert("email", e);
    }
    if let Err(e) = check_optional_phone(phone) {
        errors.insert("phone", e);
    }
    if let Err(e) = check_optional_phone(whatsapp) {
        errors.insert("whatsapp", e);
    }
    if let Err(e) = check_website(website) {
        errors.insert("website", e);
    }
    if let Err(e) = check_cnpj(cnpj) {
        errors.insert("cnpj", e);
    }
}

/// Data for creating a restaurant together with its first location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    pub url_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub business_type: BusinessType,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub subscription_plan: SubscriptionPlan,
    #[serde(default)]
    pub selected_features: FeatureSet,
    #[serde(default)]
    pub payment: PaymentSettings,
    /// Language code configured as the default menu language.
    #[serde(default)]
    pub default_language: Option<String>,
    pub location: LocationInput,
}

impl NewRestaurant {
    /// Validate every field, including the first location (`location.*`).
    ///
    /// # Errors
    ///
    /// Returns errors keyed by field path.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(e) = require_text(&self.name, 100) {
            errors.insert("name", e);
        }
        if let Err(e) = validate_url_slug(&self.url_name) {
            errors.insert("url_name", e);
        }
        if let Some(description) = &self.description
            && description.chars().count() > 1000
        {
            errors.insert("description", ValidationError::TooLong { max: 1000 });
        }
        if let Some(cuisine) = &self.cuisine_type
            && cuisine.chars().count() > 50
        {
            errors.insert("cuisine_type", ValidationError::TooLong { max: 50 });
        }
        validate_contact(
            &mut errors,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.whatsapp.as_deref(),
            self.website.as_deref(),
            self.cnpj.as_deref(),
        );
        if let Err(payment) = self.payment.validate() {
            errors.extend_prefixed("payment", payment);
        }
        self.location.validate_into("location", &mut errors);
        errors.into_result()
    }
}

/// Partial update of a restaurant's general information.
///
/// `url_name` is accepted only when it equals the current slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<BusinessType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
}

impl RestaurantPatch {
    /// Validate the fields present in the patch.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by field name.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name
            && let Err(e) = require_text(name, 100)
        {
            errors.insert("name", e);
        }
        if let Some(description) = &self.description
            && description.chars().count() > 1000
        {
            errors.insert("description", ValidationError::TooLong { max: 1000 });
        }
        validate_contact(
            &mut errors,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.whatsapp.as_deref(),
            self.website.as_deref(),
            self.cnpj.as_deref(),
        );
        errors.into_result()
    }
}

/// A media asset attached to a restaurant. The file itself lives elsewhere;
/// only its URL is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: MediaAssetId,
    pub restaurant_id: RestaurantId,
    pub kind: MediaKind,
    pub url: String,
    pub alt_text: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Data for attaching a media asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMediaAsset {
    pub kind: MediaKind,
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

impl NewMediaAsset {
    /// # Errors
    ///
    /// Returns errors keyed by `url` or `alt_text`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(e) = check_website(Some(&self.url)) {
            errors.insert("url", e);
        } else if self.url.trim().is_empty() {
            errors.insert("url", ValidationError::Required);
        }
        if let Some(alt) = &self.alt_text
            && alt.chars().count() > 200
        {
            errors.insert("alt_text", ValidationError::TooLong { max: 200 });
        }
        errors.into_result()
    }
}

/// Everything shown on the restaurant profile screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub restaurant: Restaurant,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub media: Vec<MediaAsset>,
}

/// Owner account created during public sign-up.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerAccount {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for OwnerAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerAccount")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Public sign-up: a restaurant plus its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub restaurant: NewRestaurant,
    pub owner: OwnerAccount,
}

impl Registration {
    pub const MIN_PASSWORD_LENGTH: usize = super::staff::MIN_PASSWORD_LENGTH;

    /// # Errors
    ///
    /// Returns restaurant errors under `restaurant.*` and owner errors
    /// under `owner.*`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(restaurant) = self.restaurant.validate() {
            errors.extend_prefixed("restaurant", restaurant);
        }
        if let Err(e) = require_text(&self.owner.full_name, 100) {
            errors.insert("owner.full_name", e);
        }
        if Email::parse(&self.owner.email).is_err() {
            errors.insert("owner.email", ValidationError::InvalidEmail);
        }
        if self.owner.password.chars().count() < Self::MIN_PASSWORD_LENGTH {
            errors.insert(
                "owner.password",
                ValidationError::Other(format!(
                    "A senha deve ter ao menos {} caracteres",
                    Self::MIN_PASSWORD_LENGTH
                )),
            );
        }
        errors.into_result()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::location::tests::sample_input;

    fn sample_new_restaurant() -> NewRestaurant {
        NewRestaurant {
            name: "Cantina do Zé".to_owned(),
            url_name: "cantina-do-ze".to_owned(),
            description: None,
            business_type: BusinessType::Single,
            cuisine_type: Some("italiana".to_owned()),
            email: Some("contato@cantina.com.br".to_owned()),
            phone: None,
            whatsapp: Some("11987654321".to_owned()),
            website: Some("https://cantina.com.br".to_owned()),
            cnpj: Some("11.222.333/0001-81".to_owned()),
            subscription_plan: SubscriptionPlan::Starter,
            selected_features: FeatureSet::default(),
            payment: PaymentSettings::default(),
            default_language: None,
            location: sample_input(),
        }
    }

    #[test]
    fn test_new_restaurant_valid() {
        assert!(sample_new_restaurant().validate().is_ok());
    }

    #[test]
    fn test_new_restaurant_errors_cover_location() {
        let mut data = sample_new_restaurant();
        data.cnpj = Some("123".to_owned());
        data.location.address.address_zip_code = String::new();
        let errors = data.validate().unwrap_err();
        assert!(errors.get("cnpj").is_some());
        assert!(errors.get("location.address.address_zip_code").is_some());
    }

    #[test]
    fn test_pix_requires_key() {
        let mut payment = PaymentSettings {
            accepted_methods: BTreeSet::from([PaymentMethod::Pix]),
            pix: None,
        };
        assert!(payment.validate().unwrap_err().get("pix.key").is_some());

        payment.pix = Some(PixKey {
            key_type: PixKeyType::Email,
            key: "pix@cantina.com.br".to_owned(),
        });
        assert!(payment.validate().is_ok());
    }

    #[test]
    fn test_payment_needs_a_method() {
        let payment = PaymentSettings {
            accepted_methods: BTreeSet::new(),
            pix: None,
        };
        assert!(payment.validate().is_err());
    }

    #[test]
    fn test_owner_password_redacted() {
        let owner = OwnerAccount {
            full_name: "Zé".to_owned(),
            email: "ze@cantina.com.br".to_owned(),
            password: "segredo123".to_owned(),
        };
        assert!(!format!("{owner:?}").contains("segredo123"));
    }

    #[test]
    fn test_registration_short_password() {
        let registration = Registration {
            restaurant: sample_new_restaurant(),
            owner: OwnerAccount {
                full_name: "Zé".to_owned(),
                email: "ze@cantina.com.br".to_owned(),
                password: "curta".to_owned(),
            },
        };
        let errors = registration.validate().unwrap_err();
        assert!(errors.get("owner.password").is_some());
        assert_eq!(errors.len(), 1);
    }
}
