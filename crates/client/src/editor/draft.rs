//! Editable shapes of each profile tab and the change sets saved from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tavola_core::{
    Address, BusinessType, Feature, FeatureSet, FieldErrors, Location, LocationId, LocationInput,
    LocationPatch, MediaAsset, MediaAssetId, MediaKind, NewMediaAsset, OperatingHours,
    PaymentSettings, Restaurant, RestaurantPatch, RestaurantProfile, ValidationError,
};

use super::Tab;

/// General information. The slug is not part of it: it never changes after
/// registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
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
}

impl From<&Restaurant> for GeneralDraft {
    fn from(restaurant: &Restaurant) -> Self {
        Self {
            name: restaurant.name.clone(),
            description: restaurant.description.clone(),
            business_type: restaurant.business_type,
            cuisine_type: restaurant.cuisine_type.clone(),
            email: restaurant.email.as_ref().map(ToString::to_string),
            phone: restaurant.phone.clone(),
            whatsapp: restaurant.whatsapp.clone(),
            website: restaurant.website.clone(),
            cnpj: restaurant.cnpj.clone(),
        }
    }
}

impl GeneralDraft {
    /// Every field, so that cleared values are cleared on the server too.
    #[must_use]
    pub fn to_patch(&self) -> RestaurantPatch {
        let text = |value: &Option<String>| Some(value.clone().unwrap_or_default());
        RestaurantPatch {
            name: Some(self.name.clone()),
            url_name: None,
            description: text(&self.description),
            business_type: Some(self.business_type),
            cuisine_type: text(&self.cuisine_type),
            email: text(&self.email),
            phone: text(&self.phone),
            whatsapp: text(&self.whatsapp),
            website: text(&self.website),
            cnpj: text(&self.cnpj),
        }
    }
}

/// One location row. `id` is `None` until the location is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDraft {
    #[serde(default)]
    pub id: Option<LocationId>,
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
    #[serde(default)]
    pub is_primary: bool,
}

impl From<&Location> for LocationDraft {
    fn from(location: &Location) -> Self {
        Self {
            id: Some(location.id),
            name: location.name.clone(),
            url_name: location.url_name.clone(),
            phone: location.phone.clone(),
            whatsapp: location.whatsapp.clone(),
            address: location.address.clone(),
            operating_hours: location.operating_hours.clone(),
            selected_features: location.selected_features.clone(),
            is_primary: location.is_primary,
        }
    }
}

impl LocationDraft {
    /// An empty row for a new location.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            id: None,
            name: String::new(),
            url_name: String::new(),
            phone: None,
            whatsapp: None,
            address: Address::default(),
            operating_hours: OperatingHours::default(),
            selected_features: FeatureSet::default(),
            is_primary: false,
        }
    }

    #[must_use]
    pub fn to_input(&self) -> LocationInput {
        LocationInput {
            name: self.name.clone(),
            url_name: self.url_name.clone(),
            phone: self.phone.clone(),
            whatsapp: self.whatsapp.clone(),
            address: self.address.clone(),
            operating_hours: self.operating_hours.clone(),
            selected_features: self.selected_features.clone(),
        }
    }

    /// Only the fields that differ from `saved`.
    fn patch_against(&self, saved: &Location) -> LocationPatch {
        fn changed<T: Clone + PartialEq>(draft: &T, saved: &T) -> Option<T> {
            (draft != saved).then(|| draft.clone())
        }
        // A cleared phone is sent as an empty string; `None` means untouched.
        let contact = |draft: &Option<String>, saved: &Option<String>| {
            (draft != saved).then(|| draft.clone().unwrap_or_default())
        };

        LocationPatch {
            name: changed(&self.name, &saved.name),
            url_name: changed(&self.url_name, &saved.url_name),
            phone: contact(&self.phone, &saved.phone),
            whatsapp: contact(&self.whatsapp, &saved.whatsapp),
            address: changed(&self.address, &saved.address),
            operating_hours: changed(&self.operating_hours, &saved.operating_hours),
            selected_features: changed(&self.selected_features, &saved.selected_features),
        }
    }
}

/// One media row. `id` is `None` until the asset is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDraft {
    #[serde(default)]
    pub id: Option<MediaAssetId>,
    pub kind: MediaKind,
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

impl From<&MediaAsset> for MediaDraft {
    fn from(asset: &MediaAsset) -> Self {
        Self {
            id: Some(asset.id),
            kind: asset.kind,
            url: asset.url.clone(),
            alt_text: asset.alt_text.clone(),
            display_order: asset.display_order,
        }
    }
}

impl MediaDraft {
    #[must_use]
    pub fn to_new(&self) -> NewMediaAsset {
        NewMediaAsset {
            kind: self.kind,
            url: self.url.clone(),
            alt_text: self.alt_text.clone(),
            display_order: self.display_order,
        }
    }

    fn matches(&self, saved: &MediaAsset) -> bool {
        self.kind == saved.kind
            && self.url == saved.url
            && self.alt_text == saved.alt_text
            && self.display_order == saved.display_order
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesDraft {
    pub selected_features: FeatureSet,
}

/// The index of the new primary location, if the primary changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryLocation {
    Existing(LocationId),
    /// Index into [`LocationChanges::added`].
    Added(usize),
}

/// Requests needed to turn the saved locations into the edited list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationChanges {
    pub added: Vec<LocationInput>,
    pub updated: Vec<(LocationId, LocationPatch)>,
    pub primary: Option<PrimaryLocation>,
    pub removed: Vec<LocationId>,
}

impl LocationChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.primary.is_none()
            && self.removed.is_empty()
    }
}

/// Compare the edited rows with the saved locations.
///
/// Rows whose id is not among `saved` are ignored.
#[must_use]
pub fn plan_location_changes(saved: &[Location], drafts: &[LocationDraft]) -> LocationChanges {
    let mut changes = LocationChanges::default();
    let saved_primary = saved.iter().find(|l| l.is_primary).map(|l| l.id);

    for draft in drafts {
        match draft.id {
            None => {
                if draft.is_primary {
                    changes.primary = Some(PrimaryLocation::Added(changes.added.len()));
                }
                changes.added.push(draft.to_input());
            }
            Some(id) => {
                let Some(current) = saved.iter().find(|l| l.id == id) else {
                    continue;
                };
                let patch = draft.patch_against(current);
                if patch != LocationPatch::default() {
                    changes.updated.push((id, patch));
                }
                if draft.is_primary && saved_primary != Some(id) {
                    changes.primary = Some(PrimaryLocation::Existing(id));
                }
            }
        }
    }

    changes.removed = saved
        .iter()
        .filter(|l| !drafts.iter().any(|d| d.id == Some(l.id)))
        .map(|l| l.id)
        .collect();
    changes
}

/// Requests needed to turn the saved media into the edited list. There is no
/// media update endpoint, so a changed asset is removed and added again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaChanges {
    pub removed: Vec<MediaAssetId>,
    pub added: Vec<NewMediaAsset>,
}

#[must_use]
pub fn plan_media_changes(saved: &[MediaAsset], drafts: &[MediaDraft]) -> MediaChanges {
    let mut changes = MediaChanges::default();
    for asset in saved {
        let kept = drafts
            .iter()
            .any(|d| d.id == Some(asset.id) && d.matches(asset));
        if !kept {
            changes.removed.push(asset.id);
        }
    }
    for draft in drafts {
        let unchanged = draft
            .id
            .and_then(|id| saved.iter().find(|a| a.id == id))
            .is_some_and(|asset| draft.matches(asset));
        if !unchanged {
            changes.added.push(draft.to_new());
        }
    }
    changes
}

/// The canonical value of a tab as a JSON buffer.
pub(crate) fn snapshot(tab: Tab, profile: &RestaurantProfile) -> Result<Value, serde_json::Error> {
    match tab {
        Tab::General => serde_json::to_value(GeneralDraft::from(&profile.restaurant)),
        Tab::Locations => serde_json::to_value(
            profile
                .locations
                .iter()
                .filter(|l| l.is_active)
                .map(LocationDraft::from)
                .collect::<Vec<_>>(),
        ),
        Tab::Media => serde_json::to_value(
            profile
                .media
                .iter()
                .map(MediaDraft::from)
                .collect::<Vec<_>>(),
        ),
        Tab::Features => serde_json::to_value(FeaturesDraft {
            selected_features: profile.restaurant.selected_features.clone(),
        }),
        Tab::Payment => serde_json::to_value(&profile.restaurant.payment),
    }
}

/// Every validation error in a tab's buffer.
///
/// # Errors
///
/// Returns the decoding error when the buffer no longer has the tab's shape.
pub(crate) fn validate(tab: Tab, buffer: &Value) -> Result<FieldErrors, serde_json::Error> {
    let mut errors = FieldErrors::new();
    match tab {
        Tab::General => {
            let draft: GeneralDraft = serde_json::from_value(buffer.clone())?;
            if let Err(e) = draft.to_patch().validate() {
                errors.merge(e);
            }
        }
        Tab::Locations => {
            let drafts: Vec<LocationDraft> = serde_json::from_value(buffer.clone())?;
            for (index, draft) in drafts.iter().enumerate() {
                draft.to_input().validate_into(&index.to_string(), &mut errors);
            }
        }
        Tab::Media => {
            let drafts: Vec<MediaDraft> = serde_json::from_value(buffer.clone())?;
            for (index, draft) in drafts.iter().enumerate() {
                if let Err(e) = draft.to_new().validate() {
                    errors.extend_prefixed(&index.to_string(), e);
                }
            }
        }
        Tab::Features => {
            // Decoding a `FeatureSet` re-adds the digital menu, so check the
            // raw list.
            let _: FeaturesDraft = serde_json::from_value(buffer.clone())?;
            let has_menu = buffer
                .get("selected_features")
                .and_then(Value::as_array)
                .is_some_and(|names| {
                    names
                        .iter()
                        .any(|n| n.as_str() == Some(Feature::DigitalMenu.as_str()))
                });
            if !has_menu {
                errors.insert(
                    "selected_features",
                    ValidationError::Other("O cardápio digital é obrigatório".to_owned()),
                );
            }
        }
        Tab::Payment => {
            let settings: PaymentSettings = serde_json::from_value(buffer.clone())?;
            if let Err(e) = settings.validate() {
                errors.merge(e);
            }
        }
    }
    Ok(errors)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use chrono::Utc;
    use serde_json::json;
    use tavola_core::RestaurantId;

    use crate::editor::fixtures::location;

    #[test]
    fn test_unchanged_locations_plan_nothing() {
        let saved = vec![location(1, "Centro", true), location(2, "Pinheiros", false)];
        let drafts: Vec<_> = saved.iter().map(LocationDraft::from).collect();
        assert!(plan_location_changes(&saved, &drafts).is_empty());
    }

    #[test]
    fn test_location_patch_carries_only_changes() {
        let saved = vec![location(1, "Centro", true)];
        let mut drafts: Vec<_> = saved.iter().map(LocationDraft::from).collect();
        drafts[0].name = "Centro Histórico".to_owned();
        drafts[0].phone = Some("(11) 3456-7890".to_owned());

        let changes = plan_location_changes(&saved, &drafts);
        assert_eq!(changes.updated.len(), 1);
        let (id, patch) = &changes.updated[0];
        assert_eq!(*id, LocationId::new(1));
        assert_eq!(patch.name.as_deref(), Some("Centro Histórico"));
        assert_eq!(patch.phone.as_deref(), Some("(11) 3456-7890"));
        assert!(patch.address.is_none());
        assert!(patch.url_name.is_none());
    }

    #[test]
    fn test_location_add_remove_and_new_primary() {
        let saved = vec![location(1, "Centro", true), location(2, "Pinheiros", false)];
        let mut new_row = LocationDraft::from(&saved[0]);
        new_row.id = None;
        new_row.url_name = "moema".to_owned();
        new_row.is_primary = true;
        let mut kept = LocationDraft::from(&saved[1]);
        kept.is_primary = false;

        let changes = plan_location_changes(&saved, &[kept, new_row]);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].url_name, "moema");
        assert_eq!(changes.primary, Some(PrimaryLocation::Added(0)));
        assert_eq!(changes.removed, vec![LocationId::new(1)]);
    }

    #[test]
    fn test_primary_moves_to_existing_location() {
        let saved = vec![location(1, "Centro", true), location(2, "Pinheiros", false)];
        let mut drafts: Vec<_> = saved.iter().map(LocationDraft::from).collect();
        drafts[0].is_primary = false;
        drafts[1].is_primary = true;

        let changes = plan_location_changes(&saved, &drafts);
        assert_eq!(changes.primary, Some(PrimaryLocation::Existing(LocationId::new(2))));
        assert!(changes.updated.is_empty());
    }

    #[test]
    fn test_changed_media_is_replaced() {
        let saved = vec![MediaAsset {
            id: MediaAssetId::new(5),
            restaurant_id: RestaurantId::new(1),
            kind: MediaKind::Logo,
            url: "https://cdn.example.com/logo.png".to_owned(),
            alt_text: None,
            display_order: 0,
            created_at: Utc::now(),
        }];
        let mut drafts: Vec<_> = saved.iter().map(MediaDraft::from).collect();
        assert_eq!(plan_media_changes(&saved, &drafts), MediaChanges::default());

        drafts[0].alt_text = Some("Logotipo".to_owned());
        let changes = plan_media_changes(&saved, &drafts);
        assert_eq!(changes.removed, vec![MediaAssetId::new(5)]);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].alt_text.as_deref(), Some("Logotipo"));
    }

    #[test]
    fn test_features_without_digital_menu_are_invalid() {
        let errors = validate(Tab::Features, &json!({"selected_features": ["delivery"]})).unwrap();
        assert!(errors.get("selected_features").is_some());

        let errors = validate(
            Tab::Features,
            &json!({"selected_features": ["digital_menu", "delivery"]}),
        )
        .unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_location_errors_are_indexed() {
        let saved = vec![location(1, "Centro", true)];
        let mut buffer = serde_json::to_value(
            saved.iter().map(LocationDraft::from).collect::<Vec<_>>(),
        )
        .unwrap();
        buffer[0]["address"]["address_zip_code"] = json!("123");

        let errors = validate(Tab::Locations, &buffer).unwrap();
        assert_eq!(
            errors.get("0.address.address_zip_code"),
            Some("CEP inválido")
        );
    }

    #[test]
    fn test_wrong_shape_is_a_decode_error() {
        assert!(validate(Tab::Payment, &json!({"accepted_methods": 3})).is_err());
    }
}
