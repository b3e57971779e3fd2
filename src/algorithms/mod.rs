//! Geometry of the geo/scene mapping

pub mod coordinates;
pub mod estimate_store;
pub mod selection;
pub mod translator;
pub mod anchor_placement;

pub use coordinates::LocalTranslation;
pub use estimate_store::{EstimateStore, GeoSceneEstimate};
pub use translator::{current_location, Placement, PlacementPolicy};
pub use anchor_placement::AnchorPlacementRule;
