//! Domain types for Tavola.
//!
//! Type-safe IDs, status enums and the records exchanged between the
//! server and its clients.

pub mod email;
pub mod feature;
pub mod hours;
pub mod id;
pub mod language;
pub mod location;
pub mod pagination;
pub mod restaurant;
pub mod staff;
pub mod status;

pub use email::{Email, EmailError};
pub use feature::{Feature, FeatureSet, RequiredFeatureError};
pub use hours::{DaySchedule, OperatingHours};
pub use id::*;
pub use language::{Language, LanguageAssignment, RestaurantLanguage};
pub use location::{Address, Location, LocationInput, LocationPatch};
pub use pagination::{PageRequest, Pagination};
pub use restaurant::{
    MediaAsset, NewMediaAsset, NewRestaurant, OwnerAccount, PaymentMethod, PaymentSettings,
    PixKey, Registration, Restaurant, RestaurantPatch, RestaurantProfile,
};
pub use staff::{
    ActorTier, AssignmentPair, CurrentStaff, LoginName, NewStaffUser, Role, RoleAssignment,
    RoleName, StaffUser, StaffUserPatch, UserFilters,
};
pub use status::*;
