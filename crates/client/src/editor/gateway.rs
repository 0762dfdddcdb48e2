//! Sending a tab's changes to the server.

use async_trait::async_trait;
use tracing::debug;

use tavola_core::{
    FeatureSet, Location, LocationId, MediaAsset, PaymentSettings, Restaurant, RestaurantId,
    RestaurantPatch,
};

use crate::api::ApiClient;
use crate::error::ClientError;

use super::draft::{LocationChanges, MediaChanges, PrimaryLocation};

/// What a tab save sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavePayload {
    General(RestaurantPatch),
    Locations(LocationChanges),
    Media(MediaChanges),
    Features(FeatureSet),
    Payment(PaymentSettings),
}

/// Fresh canonical data returned by a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedData {
    Restaurant(Restaurant),
    Locations(Vec<Location>),
    Media(Vec<MediaAsset>),
}

/// Where tab saves go. [`ApiClient`] is the real one.
#[async_trait]
pub trait ProfileGateway: Send + Sync {
    /// Apply `payload` and return the data the tab should now show.
    async fn save(
        &self,
        restaurant_id: RestaurantId,
        payload: &SavePayload,
    ) -> Result<SavedData, ClientError>;
}

#[async_trait]
impl ProfileGateway for ApiClient {
    async fn save(
        &self,
        restaurant_id: RestaurantId,
        payload: &SavePayload,
    ) -> Result<SavedData, ClientError> {
        match payload {
            SavePayload::General(patch) => self
                .update_restaurant(restaurant_id, patch)
                .await
                .map(SavedData::Restaurant),
            SavePayload::Features(features) => self
                .update_features(restaurant_id, features)
                .await
                .map(SavedData::Restaurant),
            SavePayload::Payment(payment) => self
                .update_payment(restaurant_id, payment)
                .await
                .map(SavedData::Restaurant),
            SavePayload::Locations(changes) => {
                self.apply_location_changes(restaurant_id, changes).await?;
                self.list_locations(restaurant_id, false)
                    .await
                    .map(SavedData::Locations)
            }
            SavePayload::Media(changes) => {
                for media_id in &changes.removed {
                    self.remove_media(restaurant_id, *media_id).await?;
                }
                for asset in &changes.added {
                    self.add_media(restaurant_id, asset).await?;
                }
                self.list_media(restaurant_id).await.map(SavedData::Media)
            }
        }
    }
}

impl ApiClient {
    /// Additions come first so that removing the old primary never leaves the
    /// restaurant without locations; removals come last.
    async fn apply_location_changes(
        &self,
        restaurant_id: RestaurantId,
        changes: &LocationChanges,
    ) -> Result<(), ClientError> {
        let mut added_ids: Vec<LocationId> = Vec::with_capacity(changes.added.len());
        for input in &changes.added {
            added_ids.push(self.add_location(restaurant_id, input).await?.id);
        }
        for (location_id, patch) in &changes.updated {
            self.update_location(restaurant_id, *location_id, patch)
                .await?;
        }

        let primary = match changes.primary {
            Some(PrimaryLocation::Existing(id)) => Some(id),
            Some(PrimaryLocation::Added(index)) => added_ids.get(index).copied(),
            None => None,
        };
        if let Some(location_id) = primary {
            self.set_primary_location(restaurant_id, location_id)
                .await?;
        }

        for location_id in &changes.removed {
            self.remove_location(restaurant_id, *location_id).await?;
        }
        debug!(
            added = changes.added.len(),
            updated = changes.updated.len(),
            removed = changes.removed.len(),
            "location changes applied"
        );
        Ok(())
    }
}
