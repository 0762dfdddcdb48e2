//! Restaurant profile editor.
//!
//! The profile screen has one [`Tab`] per area. A tab is either viewing the
//! canonical [`RestaurantProfile`] or editing a private JSON buffer copied
//! from it. Edits only touch the buffer; canonical data changes only when a
//! save succeeds, so cancelling always restores what the server last sent.
//!
//! Field paths are dotted (`name`, `0.address.address_zip_code`) and match
//! the paths the server uses in validation errors.
//!
//! Saves are split in two steps so the network call can run anywhere:
//! [`ProfileEditor::begin_save`] validates and builds the payload,
//! [`ProfileEditor::complete_save`] applies the result. Each save carries a
//! [`Generation`]; results of superseded saves are dropped.

mod draft;
mod gateway;
mod path;

pub use draft::{
    FeaturesDraft, GeneralDraft, LocationChanges, LocationDraft, MediaChanges, MediaDraft,
    PrimaryLocation, plan_location_changes, plan_media_changes,
};
pub use gateway::{ProfileGateway, SavePayload, SavedData};

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use tavola_core::validation::{format_cep, only_digits};
use tavola_core::{Feature, FieldErrors, Location, PaymentSettings, RestaurantId, RestaurantProfile};

use crate::error::ClientError;
use crate::generation::{Generation, RequestGeneration};
use crate::postal::{LookupError, PostalAddress, PostalCodeLookup};

/// Address fields filled by a postal-code lookup and locked afterwards.
const LOOKUP_FIELDS: [&str; 4] = [
    "address_street",
    "address_neighborhood",
    "address_city",
    "address_state",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tab {
    General,
    Locations,
    Media,
    Features,
    Payment,
}

impl Tab {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Locations,
        Self::Media,
        Self::Features,
        Self::Payment,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Locations => "locations",
            Self::Media => "media",
            Self::Features => "features",
            Self::Payment => "payment",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("A aba {0} não está em edição")]
    NotEditing(Tab),

    /// The field was filled by a CEP lookup.
    #[error("Campo preenchido pelo CEP: {0}")]
    ReadOnly(String),

    #[error("Campo inexistente: {0}")]
    InvalidPath(String),

    #[error("Unidade inexistente: {0}")]
    NoSuchLocation(usize),

    #[error("O restaurante precisa de ao menos uma unidade")]
    LastLocation,

    #[error("Limite de unidades do plano atingido")]
    LocationLimit,

    #[error("O cardápio digital não pode ser desativado")]
    RequiredFeature,

    #[error("Verifique os campos destacados")]
    Invalid(FieldErrors),

    #[error("Dados da aba inválidos: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Answer to a cancel or tab-switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Done.
    Proceed,
    /// Unsaved changes would be lost; the action waits for
    /// [`ProfileEditor::confirm_pending`] or [`ProfileEditor::dismiss_pending`].
    ConfirmationRequired,
}

/// An action waiting for the user to confirm losing unsaved changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Cancel(Tab),
    SwitchTab(Tab),
}

/// Identifies one save of one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    pub tab: Tab,
    pub generation: Generation,
}

/// A validated save, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub restaurant_id: RestaurantId,
    pub payload: SavePayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Canonical data replaced; the tab is back to viewing.
    Saved,
    /// The tab keeps its buffer and shows the error.
    Failed,
    /// A newer save (or a new editing session) superseded this one.
    Stale,
}

#[derive(Debug, Default)]
struct TabState {
    /// `Some` while editing.
    buffer: Option<Value>,
    /// Canonical snapshot taken when editing started.
    baseline: Value,
    dirty: bool,
    /// Client-side validation errors.
    errors: FieldErrors,
    /// Field errors returned by the last failed save.
    server_errors: FieldErrors,
    touched: BTreeSet<String>,
    submit_attempted: bool,
    save_error: Option<String>,
    saves: RequestGeneration,
    in_flight: Option<Generation>,
    /// Location rows whose address came from a CEP lookup.
    locked_addresses: BTreeSet<usize>,
}

impl TabState {
    /// Back to viewing. The save counter survives so older tickets stay stale.
    fn discard(&mut self) {
        let saves = std::mem::take(&mut self.saves);
        let in_flight = self.in_flight.take();
        *self = Self {
            saves,
            in_flight,
            ..Self::default()
        };
    }

    fn refresh_dirty(&mut self) {
        self.dirty = self
            .buffer
            .as_ref()
            .is_some_and(|buffer| !path::same_data(buffer, &self.baseline));
    }

    /// Recompute client-side errors after `changed` was written.
    ///
    /// Errors are refreshed at and around the changed field and wherever one
    /// is already shown; other fields stay quiet until touched.
    fn revalidate(&mut self, tab: Tab, changed: &str) {
        let Some(buffer) = &self.buffer else {
            return;
        };
        let fresh = match draft::validate(tab, buffer) {
            Ok(errors) => errors,
            Err(e) => {
                debug!(%tab, path = changed, error = %e, "buffer no longer decodes");
                self.errors.insert(changed, "Valor inválido");
                return;
            }
        };

        let nested = format!("{changed}.");
        let parent = parent_path(changed);
        let mut errors = FieldErrors::new();
        for (path, message) in fresh.iter() {
            let near = path == changed
                || path.starts_with(&nested)
                || (parent.is_some() && parent_path(path) == parent);
            if near || self.submit_attempted || self.errors.get(path).is_some() {
                errors.insert(path, message);
            }
        }
        self.errors = errors;
        self.server_errors.remove_prefix(changed);
    }
}

fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}

/// The row index of a location-tab path.
fn row_index(path: &str) -> Option<usize> {
    path.split('.').next()?.parse().ok()
}

/// Whether writing `path` would overwrite a lookup-filled address field.
fn touches_locked_address(path: &str, locked: &BTreeSet<usize>) -> bool {
    let Some(index) = row_index(path) else {
        return false;
    };
    if !locked.contains(&index) {
        return false;
    }
    let mut rest = path.split('.').skip(1);
    match (rest.next(), rest.next()) {
        (None, _) | (Some("address"), None) => true,
        (Some("address"), Some(field)) => LOOKUP_FIELDS.contains(&field),
        _ => false,
    }
}

fn zip_path(index: usize) -> String {
    format!("{index}.address.address_zip_code")
}

/// Renumber a location-tab path after row `removed` was deleted.
fn shift_path(path: &str, removed: usize) -> Option<String> {
    let Some(index) = row_index(path) else {
        return Some(path.to_owned());
    };
    match index.cmp(&removed) {
        Ordering::Less => Some(path.to_owned()),
        Ordering::Equal => None,
        Ordering::Greater => Some(match path.split_once('.') {
            Some((_, rest)) => format!("{}.{rest}", index - 1),
            None => (index - 1).to_string(),
        }),
    }
}

fn shift_errors(errors: &FieldErrors, removed: usize) -> FieldErrors {
    let mut shifted = FieldErrors::new();
    for (path, message) in errors.iter() {
        if let Some(path) = shift_path(path, removed) {
            shifted.insert(path, message);
        }
    }
    shifted
}

/// State of the restaurant profile screen.
#[derive(Debug)]
pub struct ProfileEditor {
    profile: RestaurantProfile,
    active: Tab,
    tabs: [TabState; 5],
    pending: Option<PendingAction>,
}

impl ProfileEditor {
    #[must_use]
    pub fn new(profile: RestaurantProfile) -> Self {
        Self {
            profile,
            active: Tab::General,
            tabs: Default::default(),
            pending: None,
        }
    }

    /// Canonical data, as last received from the server.
    #[must_use]
    pub const fn profile(&self) -> &RestaurantProfile {
        &self.profile
    }

    /// Replace canonical data (after a reload). Buffers being edited are kept.
    pub fn refresh(&mut self, profile: RestaurantProfile) {
        self.profile = profile;
    }

    #[must_use]
    pub const fn active_tab(&self) -> Tab {
        self.active
    }

    fn state(&self, tab: Tab) -> &TabState {
        &self.tabs[tab.index()]
    }

    fn state_mut(&mut self, tab: Tab) -> &mut TabState {
        &mut self.tabs[tab.index()]
    }

    #[must_use]
    pub fn is_editing(&self, tab: Tab) -> bool {
        self.state(tab).buffer.is_some()
    }

    /// Whether the buffer differs from the data editing started from.
    #[must_use]
    pub fn is_dirty(&self, tab: Tab) -> bool {
        self.state(tab).dirty
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        Tab::ALL.into_iter().any(|tab| self.is_dirty(tab))
    }

    #[must_use]
    pub fn is_saving(&self, tab: Tab) -> bool {
        let state = self.state(tab);
        state
            .in_flight
            .is_some_and(|generation| state.saves.is_current(generation))
    }

    #[must_use]
    pub const fn pending_action(&self) -> Option<PendingAction> {
        self.pending
    }

    /// Enter edit mode with a fresh copy of the canonical data. A tab that is
    /// already editing keeps its buffer.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Decode` if the profile cannot be serialized.
    pub fn start_tab_editing(&mut self, tab: Tab) -> Result<(), EditorError> {
        if self.is_editing(tab) {
            return Ok(());
        }
        let snapshot = draft::snapshot(tab, &self.profile)?;

        let state = self.state_mut(tab);
        state.discard();
        // A save started by an earlier session must not close this one.
        state.saves.invalidate();
        state.baseline = snapshot.clone();
        state.buffer = Some(snapshot);
        debug!(%tab, "editing started");
        Ok(())
    }

    /// The buffer of a tab being edited.
    #[must_use]
    pub fn buffer(&self, tab: Tab) -> Option<&Value> {
        self.state(tab).buffer.as_ref()
    }

    /// The buffer decoded into its draft type (e.g. [`GeneralDraft`]).
    #[must_use]
    pub fn draft<T: DeserializeOwned>(&self, tab: Tab) -> Option<T> {
        self.buffer(tab)
            .and_then(|buffer| serde_json::from_value(buffer.clone()).ok())
    }

    /// The value to display at `path`: the buffer while editing, canonical
    /// data otherwise.
    #[must_use]
    pub fn field(&self, tab: Tab, path: &str) -> Option<Value> {
        match self.buffer(tab) {
            Some(buffer) => path::get(buffer, path).cloned(),
            None => draft::snapshot(tab, &self.profile)
                .ok()
                .and_then(|snapshot| path::get(&snapshot, path).cloned()),
        }
    }

    /// Write one field of the buffer and re-validate it.
    ///
    /// Editing a location's CEP unlocks the address fields of that row.
    ///
    /// # Errors
    ///
    /// - `EditorError::NotEditing` outside edit mode
    /// - `EditorError::ReadOnly` for lookup-filled address fields
    /// - `EditorError::InvalidPath` when `path` does not exist
    pub fn set_field(&mut self, tab: Tab, path: &str, value: Value) -> Result<(), EditorError> {
        let state = self.state_mut(tab);
        let Some(buffer) = state.buffer.as_mut() else {
            return Err(EditorError::NotEditing(tab));
        };
        if tab == Tab::Locations && touches_locked_address(path, &state.locked_addresses) {
            return Err(EditorError::ReadOnly(path.to_owned()));
        }
        path::set(buffer, path, value).ok_or_else(|| EditorError::InvalidPath(path.to_owned()))?;

        if tab == Tab::Locations
            && let Some(index) = row_index(path)
            && path == zip_path(index)
        {
            state.locked_addresses.remove(&index);
        }
        state.touched.insert(path.to_owned());
        state.revalidate(tab, path);
        state.refresh_dirty();
        Ok(())
    }

    /// Mark a field as visited so its error becomes visible.
    pub fn touch_field(&mut self, tab: Tab, path: &str) {
        let state = self.state_mut(tab);
        if state.buffer.is_some() {
            state.touched.insert(path.to_owned());
            state.revalidate(tab, path);
        }
    }

    /// Error to show next to a field: only after it was touched or a save
    /// was attempted.
    #[must_use]
    pub fn visible_error(&self, tab: Tab, path: &str) -> Option<&str> {
        let state = self.state(tab);
        if let Some(message) = state.server_errors.get(path) {
            return Some(message);
        }
        if state.submit_attempted || state.touched.contains(path) {
            return state.errors.get(path);
        }
        None
    }

    /// Client-side errors currently known for a tab.
    #[must_use]
    pub fn errors(&self, tab: Tab) -> &FieldErrors {
        &self.state(tab).errors
    }

    /// Message of the last failed save of a tab.
    #[must_use]
    pub fn save_error(&self, tab: Tab) -> Option<&str> {
        self.state(tab).save_error.as_deref()
    }

    #[must_use]
    pub fn is_address_locked(&self, index: usize) -> bool {
        self.state(Tab::Locations).locked_addresses.contains(&index)
    }

    /// Leave edit mode. A dirty tab asks for confirmation first.
    pub fn request_cancel(&mut self, tab: Tab) -> Guard {
        let state = &mut self.tabs[tab.index()];
        if state.buffer.is_none() {
            return Guard::Proceed;
        }
        if state.dirty {
            self.pending = Some(PendingAction::Cancel(tab));
            return Guard::ConfirmationRequired;
        }
        state.discard();
        Guard::Proceed
    }

    /// Show another tab. Unsaved changes anywhere ask for confirmation first.
    pub fn switch_tab(&mut self, tab: Tab) -> Guard {
        if tab == self.active {
            return Guard::Proceed;
        }
        if self.has_unsaved_changes() {
            self.pending = Some(PendingAction::SwitchTab(tab));
            return Guard::ConfirmationRequired;
        }
        self.active = tab;
        Guard::Proceed
    }

    /// Carry out the pending action, discarding unsaved changes.
    pub fn confirm_pending(&mut self) -> Option<PendingAction> {
        let action = self.pending.take()?;
        match action {
            PendingAction::Cancel(tab) => self.state_mut(tab).discard(),
            PendingAction::SwitchTab(tab) => {
                for state in &mut self.tabs {
                    if state.dirty {
                        state.discard();
                    }
                }
                self.active = tab;
            }
        }
        debug!(?action, "pending action confirmed");
        Some(action)
    }

    /// Drop the pending action; everything stays as it was.
    pub fn dismiss_pending(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    /// Validate a tab and build its save payload.
    ///
    /// # Errors
    ///
    /// - `EditorError::NotEditing` outside edit mode
    /// - `EditorError::Invalid` with every field error; all of them become
    ///   visible
    pub fn begin_save(&mut self, tab: Tab) -> Result<SaveRequest, EditorError> {
        let restaurant_id = self.profile.restaurant.id;
        let state = &mut self.tabs[tab.index()];
        let Some(buffer) = state.buffer.as_ref() else {
            return Err(EditorError::NotEditing(tab));
        };

        let errors = draft::validate(tab, buffer)?;
        if !errors.is_empty() {
            state.submit_attempted = true;
            state.errors = errors.clone();
            debug!(%tab, count = errors.len(), "save blocked by validation");
            return Err(EditorError::Invalid(errors));
        }
        let payload = build_payload(tab, buffer, &self.profile)?;

        state.server_errors.clear();
        state.save_error = None;
        let generation = state.saves.next();
        state.in_flight = Some(generation);
        Ok(SaveRequest {
            ticket: SaveTicket { tab, generation },
            restaurant_id,
            payload,
        })
    }

    /// Apply the result of a save started by [`Self::begin_save`].
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<SavedData, ClientError>,
    ) -> SaveOutcome {
        let tab = ticket.tab;
        let state = &mut self.tabs[tab.index()];
        if !state.saves.is_current(ticket.generation) {
            debug!(%tab, "dropping stale save result");
            return SaveOutcome::Stale;
        }
        state.in_flight = None;

        match result {
            Ok(data) => {
                state.discard();
                match data {
                    SavedData::Restaurant(restaurant) => self.profile.restaurant = restaurant,
                    SavedData::Locations(locations) => self.profile.locations = locations,
                    SavedData::Media(media) => self.profile.media = media,
                }
                debug!(%tab, "tab saved");
                SaveOutcome::Saved
            }
            Err(error) => {
                warn!(%tab, error = %error, "tab save failed");
                state.save_error = Some(error.user_message());
                if let Some(fields) = error.field_errors() {
                    state.server_errors = fields.clone();
                    state.submit_attempted = true;
                }
                SaveOutcome::Failed
            }
        }
    }

    /// Validate, send and apply in one go.
    ///
    /// # Errors
    ///
    /// Same as [`Self::begin_save`]. Server failures are reported through
    /// [`SaveOutcome::Failed`] and [`Self::save_error`].
    pub async fn save_tab(
        &mut self,
        tab: Tab,
        gateway: &dyn ProfileGateway,
    ) -> Result<SaveOutcome, EditorError> {
        let request = self.begin_save(tab)?;
        let result = gateway.save(request.restaurant_id, &request.payload).await;
        Ok(self.complete_save(request.ticket, result))
    }

    // =========================================================================
    // Locations tab
    // =========================================================================

    fn location_rows(&self) -> Result<Vec<LocationDraft>, EditorError> {
        let buffer = self
            .buffer(Tab::Locations)
            .ok_or(EditorError::NotEditing(Tab::Locations))?;
        Ok(serde_json::from_value(buffer.clone())?)
    }

    fn store_location_rows(&mut self, rows: &[LocationDraft]) -> Result<(), EditorError> {
        let value = serde_json::to_value(rows)?;
        let state = self.state_mut(Tab::Locations);
        state.buffer = Some(value);
        state.refresh_dirty();
        Ok(())
    }

    /// Append a new location row, returning its index. The row becomes the
    /// primary only when no other row is.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::LocationLimit` when the subscription plan allows
    /// no more locations.
    pub fn add_location(&mut self, mut row: LocationDraft) -> Result<usize, EditorError> {
        let mut rows = self.location_rows()?;
        let plan = self.profile.restaurant.subscription_plan;
        if !plan.allows_another_location(rows.len()) {
            return Err(EditorError::LocationLimit);
        }
        row.id = None;
        row.is_primary = !rows.iter().any(|r| r.is_primary);
        rows.push(row);
        self.store_location_rows(&rows)?;
        Ok(rows.len() - 1)
    }

    /// Remove a location row. Removing the primary promotes the first
    /// remaining row.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::LastLocation` for the only row.
    pub fn remove_location(&mut self, index: usize) -> Result<(), EditorError> {
        let mut rows = self.location_rows()?;
        if index >= rows.len() {
            return Err(EditorError::NoSuchLocation(index));
        }
        if rows.len() == 1 {
            return Err(EditorError::LastLocation);
        }
        let removed = rows.remove(index);
        if removed.is_primary
            && let Some(first) = rows.first_mut()
        {
            first.is_primary = true;
        }
        self.store_location_rows(&rows)?;

        let state = self.state_mut(Tab::Locations);
        state.errors = shift_errors(&state.errors, index);
        state.server_errors = shift_errors(&state.server_errors, index);
        state.touched = state
            .touched
            .iter()
            .filter_map(|path| shift_path(path, index))
            .collect();
        state.locked_addresses = state
            .locked_addresses
            .iter()
            .filter(|&&row| row != index)
            .map(|&row| if row > index { row - 1 } else { row })
            .collect();
        Ok(())
    }

    /// Make one row the primary location; every other row stops being it.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::NoSuchLocation` for an unknown index.
    pub fn set_primary_location(&mut self, index: usize) -> Result<(), EditorError> {
        let mut rows = self.location_rows()?;
        if index >= rows.len() {
            return Err(EditorError::NoSuchLocation(index));
        }
        for (i, row) in rows.iter_mut().enumerate() {
            row.is_primary = i == index;
        }
        self.store_location_rows(&rows)
    }

    fn zip_code(&self, index: usize) -> Result<String, EditorError> {
        let buffer = self
            .buffer(Tab::Locations)
            .ok_or(EditorError::NotEditing(Tab::Locations))?;
        path::get(buffer, &zip_path(index))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(EditorError::NoSuchLocation(index))
    }

    /// Look up the CEP of row `index` and fill its address.
    ///
    /// Returns `false` when the CEP was edited while the lookup ran.
    ///
    /// # Errors
    ///
    /// Returns an error when the Locations tab is not being edited or the row
    /// does not exist. Lookup failures are shown on the CEP field instead.
    pub async fn lookup_postal_code(
        &mut self,
        index: usize,
        lookup: &dyn PostalCodeLookup,
    ) -> Result<bool, EditorError> {
        let zip = self.zip_code(index)?;
        let result = lookup.lookup(&zip).await;
        self.apply_postal_lookup(index, &zip, result)
    }

    /// Apply a lookup result for the CEP `zip` of row `index`.
    ///
    /// On success the street, neighborhood, city and state are filled and
    /// locked (unless the service left one of them blank). On failure the CEP
    /// field shows the error and the address fields are left as they were.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lookup_postal_code`].
    pub fn apply_postal_lookup(
        &mut self,
        index: usize,
        zip: &str,
        result: Result<PostalAddress, LookupError>,
    ) -> Result<bool, EditorError> {
        let current = self.zip_code(index)?;
        if only_digits(&current) != only_digits(zip) {
            debug!(index, "dropping lookup for an outdated CEP");
            return Ok(false);
        }

        let zip_field = zip_path(index);
        let state = self.state_mut(Tab::Locations);
        let Some(buffer) = state.buffer.as_mut() else {
            return Err(EditorError::NotEditing(Tab::Locations));
        };

        match result {
            Ok(address) => {
                let formatted = format_cep(&address.zip_code).unwrap_or(current);
                let complete = [
                    &address.street,
                    &address.neighborhood,
                    &address.city,
                    &address.state,
                ]
                .iter()
                .all(|value| !value.trim().is_empty());

                let fields = [
                    ("address_zip_code", formatted),
                    ("address_street", address.street),
                    ("address_neighborhood", address.neighborhood),
                    ("address_city", address.city),
                    ("address_state", address.state),
                ];
                for (field, value) in fields {
                    let path = format!("{index}.address.{field}");
                    path::set(buffer, &path, Value::String(value))
                        .ok_or_else(|| EditorError::InvalidPath(path.clone()))?;
                    state.errors.remove(&path);
                    state.server_errors.remove(&path);
                }
                if complete {
                    state.locked_addresses.insert(index);
                } else {
                    state.locked_addresses.remove(&index);
                }
            }
            Err(error) => {
                debug!(index, error = %error, "CEP lookup failed");
                state.errors.insert(zip_field.as_str(), &error);
                state.touched.insert(zip_field);
                state.locked_addresses.remove(&index);
            }
        }
        state.refresh_dirty();
        Ok(true)
    }

    // =========================================================================
    // Features tab
    // =========================================================================

    /// Switch a feature on or off, returning whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::RequiredFeature` for the digital menu.
    pub fn toggle_feature(&mut self, feature: Feature) -> Result<bool, EditorError> {
        let buffer = self
            .buffer(Tab::Features)
            .ok_or(EditorError::NotEditing(Tab::Features))?;
        let mut draft: FeaturesDraft = serde_json::from_value(buffer.clone())?;
        let selected = draft
            .selected_features
            .toggle(feature)
            .map_err(|_| EditorError::RequiredFeature)?;

        let value = serde_json::to_value(&draft)?;
        let state = self.state_mut(Tab::Features);
        state.buffer = Some(value);
        state.refresh_dirty();
        Ok(selected)
    }
}

fn build_payload(
    tab: Tab,
    buffer: &Value,
    profile: &RestaurantProfile,
) -> Result<SavePayload, serde_json::Error> {
    let payload = match tab {
        Tab::General => {
            let draft: GeneralDraft = serde_json::from_value(buffer.clone())?;
            SavePayload::General(draft.to_patch())
        }
        Tab::Locations => {
            let rows: Vec<LocationDraft> = serde_json::from_value(buffer.clone())?;
            let active: Vec<Location> = profile
                .locations
                .iter()
                .filter(|l| l.is_active)
                .cloned()
                .collect();
            SavePayload::Locations(plan_location_changes(&active, &rows))
        }
        Tab::Media => {
            let rows: Vec<MediaDraft> = serde_json::from_value(buffer.clone())?;
            SavePayload::Media(plan_media_changes(&profile.media, &rows))
        }
        Tab::Features => {
            let draft: FeaturesDraft = serde_json::from_value(buffer.clone())?;
            SavePayload::Features(draft.selected_features)
        }
        Tab::Payment => {
            let settings: PaymentSettings = serde_json::from_value(buffer.clone())?;
            SavePayload::Payment(settings)
        }
    };
    Ok(payload)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;

    use tavola_core::{
        Address, BusinessType, FeatureSet, Location, LocationId, OperatingHours,
        PaymentSettings, Restaurant, RestaurantId, RestaurantProfile, RestaurantStatus,
        SubscriptionPlan,
    };

    pub(crate) fn location(id: i32, name: &str, primary: bool) -> Location {
        Location {
            id: LocationId::new(id),
            restaurant_id: RestaurantId::new(1),
            name: name.to_owned(),
            url_name: format!("unidade-{id}"),
            phone: None,
            whatsapp: None,
            address: Address {
                address_zip_code: "01001-000".to_owned(),
                address_street: "Praça da Sé".to_owned(),
                address_number: "100".to_owned(),
                address_complement: None,
                address_neighborhood: "Sé".to_owned(),
                address_city: "São Paulo".to_owned(),
                address_state: "SP".to_owned(),
            },
            operating_hours: OperatingHours::default(),
            selected_features: FeatureSet::default(),
            is_primary: primary,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn restaurant() -> Restaurant {
        Restaurant {
            id: RestaurantId::new(1),
            name: "Cantina da Nonna".to_owned(),
            url_name: "cantina-da-nonna".to_owned(),
            description: None,
            business_type: BusinessType::Multi,
            cuisine_type: Some("italiana".to_owned()),
            email: None,
            phone: None,
            whatsapp: None,
            website: None,
            cnpj: None,
            subscription_plan: SubscriptionPlan::Professional,
            selected_features: FeatureSet::default(),
            status: RestaurantStatus::Active,
            payment: PaymentSettings::default(),
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn profile() -> RestaurantProfile {
        RestaurantProfile {
            restaurant: restaurant(),
            locations: vec![location(1, "Centro", true), location(2, "Pinheiros", false)],
            media: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tavola_core::{ErrorBody, ErrorCode, SubscriptionPlan};

    fn editor() -> ProfileEditor {
        ProfileEditor::new(fixtures::profile())
    }

    fn editing(tab: Tab) -> ProfileEditor {
        let mut editor = editor();
        editor.start_tab_editing(tab).unwrap();
        editor
    }

    fn validation_error(path: &str, message: &str) -> ClientError {
        let mut fields = FieldErrors::new();
        fields.insert(path, message);
        ClientError::Api {
            status: 400,
            error: ErrorBody {
                code: ErrorCode::Validation,
                message: "Verifique os campos destacados".to_owned(),
                fields,
            },
        }
    }

    fn found(street: &str) -> PostalAddress {
        PostalAddress {
            zip_code: "22041001".to_owned(),
            street: street.to_owned(),
            neighborhood: "Copacabana".to_owned(),
            city: "Rio de Janeiro".to_owned(),
            state: "RJ".to_owned(),
        }
    }

    #[test]
    fn test_dirty_tracks_structural_difference() {
        let mut editor = editing(Tab::General);
        assert!(editor.is_editing(Tab::General));
        assert!(!editor.is_dirty(Tab::General));

        editor
            .set_field(Tab::General, "name", json!("Cantina Nova"))
            .unwrap();
        assert!(editor.is_dirty(Tab::General));

        editor
            .set_field(Tab::General, "name", json!("Cantina da Nonna"))
            .unwrap();
        assert!(!editor.is_dirty(Tab::General));
    }

    #[test]
    fn test_null_and_missing_optional_fields_are_not_dirty() {
        let mut editor = editing(Tab::General);
        editor
            .set_field(Tab::General, "website", Value::Null)
            .unwrap();
        assert!(!editor.is_dirty(Tab::General));
    }

    #[test]
    fn test_edits_never_touch_canonical_data() {
        let mut editor = editing(Tab::General);
        let before = editor.profile().clone();
        editor
            .set_field(Tab::General, "name", json!("Outro Nome"))
            .unwrap();

        assert_eq!(editor.profile(), &before);
        assert_eq!(editor.field(Tab::General, "name"), Some(json!("Outro Nome")));
    }

    #[test]
    fn test_cancel_dirty_tab_requires_confirmation() {
        let mut editor = editing(Tab::General);
        let before = editor.profile().clone();
        editor
            .set_field(Tab::General, "name", json!("Outro Nome"))
            .unwrap();

        assert_eq!(editor.request_cancel(Tab::General), Guard::ConfirmationRequired);
        assert_eq!(
            editor.pending_action(),
            Some(PendingAction::Cancel(Tab::General))
        );
        assert!(editor.is_editing(Tab::General));

        assert_eq!(
            editor.confirm_pending(),
            Some(PendingAction::Cancel(Tab::General))
        );
        assert!(!editor.is_editing(Tab::General));
        assert!(!editor.is_dirty(Tab::General));
        assert_eq!(editor.profile(), &before);
        assert_eq!(
            editor.field(Tab::General, "name"),
            Some(json!("Cantina da Nonna"))
        );
    }

    #[test]
    fn test_cancel_clean_tab_proceeds() {
        let mut editor = editing(Tab::Payment);
        assert_eq!(editor.request_cancel(Tab::Payment), Guard::Proceed);
        assert!(!editor.is_editing(Tab::Payment));
        assert_eq!(editor.pending_action(), None);
    }

    #[test]
    fn test_switch_tab_with_unsaved_changes() {
        let mut editor = editing(Tab::General);
        editor
            .set_field(Tab::General, "cuisine_type", json!("pizzaria"))
            .unwrap();

        assert_eq!(editor.switch_tab(Tab::Payment), Guard::ConfirmationRequired);
        assert_eq!(editor.active_tab(), Tab::General);

        assert_eq!(
            editor.dismiss_pending(),
            Some(PendingAction::SwitchTab(Tab::Payment))
        );
        assert!(editor.is_dirty(Tab::General));
        assert_eq!(editor.active_tab(), Tab::General);

        assert_eq!(editor.switch_tab(Tab::Payment), Guard::ConfirmationRequired);
        editor.confirm_pending();
        assert_eq!(editor.active_tab(), Tab::Payment);
        assert!(!editor.is_editing(Tab::General));
    }

    #[test]
    fn test_switch_tab_without_changes() {
        let mut editor = editing(Tab::General);
        assert_eq!(editor.switch_tab(Tab::Media), Guard::Proceed);
        assert_eq!(editor.active_tab(), Tab::Media);
    }

    #[test]
    fn test_set_field_outside_edit_mode() {
        let mut editor = editor();
        let err = editor
            .set_field(Tab::General, "name", json!("x"))
            .unwrap_err();
        assert!(matches!(err, EditorError::NotEditing(Tab::General)));
    }

    #[test]
    fn test_field_errors_show_after_touch() {
        let mut editor = editing(Tab::General);
        editor.set_field(Tab::General, "name", json!("  ")).unwrap();
        assert_eq!(
            editor.visible_error(Tab::General, "name"),
            Some("Campo obrigatório")
        );

        editor
            .set_field(Tab::General, "name", json!("Cantina"))
            .unwrap();
        assert_eq!(editor.visible_error(Tab::General, "name"), None);
    }

    #[test]
    fn test_invalid_tab_blocks_save_and_reveals_errors() {
        let mut editor = editing(Tab::Payment);
        editor
            .set_field(Tab::Payment, "accepted_methods", json!(["pix"]))
            .unwrap();

        let err = editor.begin_save(Tab::Payment).unwrap_err();
        let EditorError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.get("pix.key").is_some());
        assert_eq!(
            editor.visible_error(Tab::Payment, "pix.key"),
            Some("Campo obrigatório")
        );
        assert!(!editor.is_saving(Tab::Payment));
    }

    #[test]
    fn test_successful_save_replaces_canonical_data() {
        let mut editor = editing(Tab::General);
        editor
            .set_field(Tab::General, "name", json!("Cantina Nova"))
            .unwrap();

        let request = editor.begin_save(Tab::General).unwrap();
        let SavePayload::General(patch) = &request.payload else {
            panic!("expected a general payload");
        };
        assert_eq!(patch.name.as_deref(), Some("Cantina Nova"));
        assert!(patch.url_name.is_none());
        assert!(editor.is_saving(Tab::General));

        let mut saved = fixtures::restaurant();
        saved.name = "Cantina Nova".to_owned();
        let outcome = editor.complete_save(request.ticket, Ok(SavedData::Restaurant(saved)));

        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(editor.profile().restaurant.name, "Cantina Nova");
        assert!(!editor.is_editing(Tab::General));
        assert!(!editor.is_dirty(Tab::General));
        assert!(!editor.is_saving(Tab::General));
    }

    #[test]
    fn test_superseded_save_is_dropped() {
        let mut editor = editing(Tab::General);
        editor.set_field(Tab::General, "name", json!("Primeiro")).unwrap();
        let first = editor.begin_save(Tab::General).unwrap();
        editor.set_field(Tab::General, "name", json!("Segundo")).unwrap();
        let second = editor.begin_save(Tab::General).unwrap();

        let mut stale = fixtures::restaurant();
        stale.name = "Primeiro".to_owned();
        assert_eq!(
            editor.complete_save(first.ticket, Ok(SavedData::Restaurant(stale))),
            SaveOutcome::Stale
        );
        assert_eq!(editor.profile().restaurant.name, "Cantina da Nonna");
        assert!(editor.is_editing(Tab::General));

        let mut fresh = fixtures::restaurant();
        fresh.name = "Segundo".to_owned();
        assert_eq!(
            editor.complete_save(second.ticket, Ok(SavedData::Restaurant(fresh))),
            SaveOutcome::Saved
        );
        assert_eq!(editor.profile().restaurant.name, "Segundo");
    }

    #[test]
    fn test_save_from_previous_session_cannot_close_new_one() {
        let mut editor = editing(Tab::General);
        editor.set_field(Tab::General, "name", json!("Antigo")).unwrap();
        let old = editor.begin_save(Tab::General).unwrap();

        assert_eq!(editor.request_cancel(Tab::General), Guard::ConfirmationRequired);
        editor.confirm_pending();
        editor.start_tab_editing(Tab::General).unwrap();

        let outcome = editor.complete_save(
            old.ticket,
            Ok(SavedData::Restaurant(fixtures::restaurant())),
        );
        assert_eq!(outcome, SaveOutcome::Stale);
        assert!(editor.is_editing(Tab::General));
    }

    #[test]
    fn test_failed_save_keeps_buffer_and_shows_server_errors() {
        let mut editor = editing(Tab::Locations);
        editor
            .set_field(Tab::Locations, "1.url_name", json!("centro"))
            .unwrap();
        let request = editor.begin_save(Tab::Locations).unwrap();

        let outcome = editor.complete_save(
            request.ticket,
            Err(validation_error("1.url_name", "Endereço já em uso")),
        );

        assert_eq!(outcome, SaveOutcome::Failed);
        assert_eq!(
            editor.save_error(Tab::Locations),
            Some("Verifique os campos destacados")
        );
        assert_eq!(
            editor.visible_error(Tab::Locations, "1.url_name"),
            Some("Endereço já em uso")
        );
        assert!(editor.is_dirty(Tab::Locations));
        assert_eq!(editor.profile().locations[1].url_name, "unidade-2");

        editor
            .set_field(Tab::Locations, "1.url_name", json!("pinheiros"))
            .unwrap();
        assert_eq!(editor.visible_error(Tab::Locations, "1.url_name"), None);
    }

    #[test]
    fn test_internal_error_message_is_generic() {
        let mut editor = editing(Tab::Payment);
        let request = editor.begin_save(Tab::Payment).unwrap();
        let error = ClientError::Api {
            status: 500,
            error: ErrorBody {
                code: ErrorCode::Internal,
                message: "connection pool exhausted".to_owned(),
                fields: FieldErrors::new(),
            },
        };
        editor.complete_save(request.ticket, Err(error));
        assert_eq!(
            editor.save_error(Tab::Payment),
            Some(crate::error::GENERIC_ERROR)
        );
    }

    #[test]
    fn test_postal_lookup_fills_and_locks_address() {
        let mut editor = editing(Tab::Locations);
        editor
            .set_field(Tab::Locations, "0.address.address_zip_code", json!("22041-001"))
            .unwrap();

        let applied = editor
            .apply_postal_lookup(0, "22041-001", Ok(found("Rua Barata Ribeiro")))
            .unwrap();
        assert!(applied);
        assert!(editor.is_address_locked(0));
        assert_eq!(
            editor.field(Tab::Locations, "0.address.address_city"),
            Some(json!("Rio de Janeiro"))
        );
        assert_eq!(
            editor.field(Tab::Locations, "0.address.address_street"),
            Some(json!("Rua Barata Ribeiro"))
        );

        let err = editor
            .set_field(Tab::Locations, "0.address.address_city", json!("Niterói"))
            .unwrap_err();
        assert!(matches!(err, EditorError::ReadOnly(_)));
        editor
            .set_field(Tab::Locations, "0.address.address_number", json!("12"))
            .unwrap();

        editor
            .set_field(Tab::Locations, "0.address.address_zip_code", json!("01001-000"))
            .unwrap();
        assert!(!editor.is_address_locked(0));
    }

    #[test]
    fn test_postal_lookup_with_blank_street_stays_editable() {
        let mut editor = editing(Tab::Locations);
        editor
            .set_field(Tab::Locations, "0.address.address_zip_code", json!("22041001"))
            .unwrap();
        editor
            .apply_postal_lookup(0, "22041001", Ok(found("")))
            .unwrap();
        assert!(!editor.is_address_locked(0));
        editor
            .set_field(Tab::Locations, "0.address.address_street", json!("Rua Nova"))
            .unwrap();
    }

    #[test]
    fn test_postal_lookup_failure_leaves_address_alone() {
        let mut editor = editing(Tab::Locations);
        editor
            .set_field(Tab::Locations, "0.address.address_zip_code", json!("99999-999"))
            .unwrap();

        editor
            .apply_postal_lookup(0, "99999999", Err(LookupError::NotFound))
            .unwrap();

        assert_eq!(
            editor.visible_error(Tab::Locations, "0.address.address_zip_code"),
            Some("CEP não encontrado")
        );
        for (field, expected) in [
            ("address_street", "Praça da Sé"),
            ("address_city", "São Paulo"),
            ("address_state", "SP"),
        ] {
            assert_eq!(
                editor.field(Tab::Locations, &format!("0.address.{field}")),
                Some(json!(expected))
            );
        }
        assert!(!editor.is_address_locked(0));
    }

    #[test]
    fn test_lookup_for_outdated_cep_is_ignored() {
        let mut editor = editing(Tab::Locations);
        editor
            .set_field(Tab::Locations, "0.address.address_zip_code", json!("22041-001"))
            .unwrap();

        let applied = editor
            .apply_postal_lookup(0, "01310-100", Ok(found("Avenida Paulista")))
            .unwrap();
        assert!(!applied);
        assert_eq!(
            editor.field(Tab::Locations, "0.address.address_street"),
            Some(json!("Praça da Sé"))
        );
    }

    #[test]
    fn test_last_location_cannot_be_removed() {
        let mut editor = editing(Tab::Locations);
        editor.remove_location(1).unwrap();
        assert!(matches!(
            editor.remove_location(0),
            Err(EditorError::LastLocation)
        ));
        let rows: Vec<LocationDraft> = editor.draft(Tab::Locations).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_removing_primary_promotes_another_row() {
        let mut editor = editing(Tab::Locations);
        editor
            .set_field(Tab::Locations, "1.name", json!(""))
            .unwrap();
        editor.remove_location(0).unwrap();

        let rows: Vec<LocationDraft> = editor.draft(Tab::Locations).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_primary);
        // The error of the old row 1 is now the error of row 0.
        assert_eq!(
            editor.visible_error(Tab::Locations, "0.name"),
            Some("Campo obrigatório")
        );
        assert_eq!(editor.visible_error(Tab::Locations, "1.name"), None);
    }

    #[test]
    fn test_exactly_one_primary_location() {
        let mut editor = editing(Tab::Locations);
        editor.set_primary_location(1).unwrap();
        let rows: Vec<LocationDraft> = editor.draft(Tab::Locations).unwrap();
        assert_eq!(rows.iter().filter(|r| r.is_primary).count(), 1);
        assert!(rows[1].is_primary);

        let index = editor.add_location(LocationDraft::blank()).unwrap();
        let rows: Vec<LocationDraft> = editor.draft(Tab::Locations).unwrap();
        assert_eq!(index, 2);
        assert!(!rows[2].is_primary);
        assert_eq!(rows.iter().filter(|r| r.is_primary).count(), 1);
    }

    #[test]
    fn test_location_limit_follows_plan() {
        let mut profile = fixtures::profile();
        profile.restaurant.subscription_plan = SubscriptionPlan::Starter;
        profile.locations.truncate(1);
        let mut editor = ProfileEditor::new(profile);
        editor.start_tab_editing(Tab::Locations).unwrap();

        assert!(matches!(
            editor.add_location(LocationDraft::blank()),
            Err(EditorError::LocationLimit)
        ));
    }

    #[test]
    fn test_digital_menu_stays_selected() {
        let mut editor = editing(Tab::Features);
        assert!(matches!(
            editor.toggle_feature(Feature::DigitalMenu),
            Err(EditorError::RequiredFeature)
        ));
        assert!(editor.toggle_feature(Feature::Delivery).unwrap());
        assert!(editor.is_dirty(Tab::Features));
        assert!(!editor.toggle_feature(Feature::Delivery).unwrap());
        assert!(!editor.is_dirty(Tab::Features));
    }

    struct RecordingGateway {
        payloads: Mutex<Vec<SavePayload>>,
        response: SavedData,
    }

    #[async_trait]
    impl ProfileGateway for RecordingGateway {
        async fn save(
            &self,
            _restaurant_id: RestaurantId,
            payload: &SavePayload,
        ) -> Result<SavedData, ClientError> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_save_tab_through_gateway() {
        let mut editor = editing(Tab::Features);
        editor.toggle_feature(Feature::WaiterCall).unwrap();

        let mut saved = fixtures::restaurant();
        saved.selected_features.insert(Feature::WaiterCall);
        let gateway = RecordingGateway {
            payloads: Mutex::new(Vec::new()),
            response: SavedData::Restaurant(saved),
        };

        let outcome = editor.save_tab(Tab::Features, &gateway).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert!(
            editor
                .profile()
                .restaurant
                .selected_features
                .contains(Feature::WaiterCall)
        );

        let payloads = gateway.payloads.lock().unwrap();
        let [SavePayload::Features(sent)] = payloads.as_slice() else {
            panic!("expected one features payload");
        };
        assert!(sent.contains(Feature::WaiterCall));
        assert!(sent.contains(Feature::DigitalMenu));
    }
}
