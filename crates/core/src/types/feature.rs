//! Product features a restaurant or location can enable.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A selectable product feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Always on; the product is built around the digital menu.
    DigitalMenu,
    WaiterCall,
    OnlineOrdering,
    TableReservation,
    Delivery,
    LoyaltyProgram,
    CustomerFeedback,
}

impl Feature {
    /// All features, in display order.
    pub const ALL: [Self; 7] = [
        Self::DigitalMenu,
        Self::WaiterCall,
        Self::OnlineOrdering,
        Self::TableReservation,
        Self::Delivery,
        Self::LoyaltyProgram,
        Self::CustomerFeedback,
    ];

    /// Returns the wire name of the feature.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DigitalMenu => "digital_menu",
            Self::WaiterCall => "waiter_call",
            Self::OnlineOrdering => "online_ordering",
            Self::TableReservation => "table_reservation",
            Self::Delivery => "delivery",
            Self::LoyaltyProgram => "loyalty_program",
            Self::CustomerFeedback => "customer_feedback",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| format!("unknown feature: {s}"))
    }
}

/// Error returned when trying to drop the mandatory digital menu.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the digital menu feature cannot be disabled")]
pub struct RequiredFeatureError;

/// A set of selected features that always contains [`Feature::DigitalMenu`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    /// Build a set from any features; the digital menu is added if missing.
    #[must_use]
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut set: BTreeSet<Feature> = features.into_iter().collect();
        set.insert(Feature::DigitalMenu);
        Self(set)
    }

    /// Parse feature names as stored in the database.
    ///
    /// # Errors
    ///
    /// Returns the first unknown name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let features = names
            .iter()
            .map(|name| name.as_ref().parse::<Feature>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(features))
    }

    /// Feature names for storage.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.as_str().to_owned()).collect()
    }

    #[must_use]
    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn insert(&mut self, feature: Feature) {
        self.0.insert(feature);
    }

    /// Remove a feature.
    ///
    /// # Errors
    ///
    /// Returns [`RequiredFeatureError`] for [`Feature::DigitalMenu`].
    pub fn remove(&mut self, feature: Feature) -> Result<bool, RequiredFeatureError> {
        if feature == Feature::DigitalMenu {
            return Err(RequiredFeatureError);
        }
        Ok(self.0.remove(&feature))
    }

    /// Toggle a feature on or off, returning whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`RequiredFeatureError`] when toggling the digital menu off.
    pub fn toggle(&mut self, feature: Feature) -> Result<bool, RequiredFeatureError> {
        if self.contains(feature) {
            self.remove(feature)?;
            Ok(false)
        } else {
            self.insert(feature);
            Ok(true)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::new([])
    }
}

impl From<Vec<Feature>> for FeatureSet {
    fn from(features: Vec<Feature>) -> Self {
        Self::new(features)
    }
}

impl From<FeatureSet> for Vec<Feature> {
    fn from(set: FeatureSet) -> Self {
        set.0.into_iter().collect()
    }
}
