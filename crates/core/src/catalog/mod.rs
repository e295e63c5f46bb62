//! Reference data the pipeline consumes but never decides: which locations
//! exist, which items exist, and which (item, location) pairs are tracked.

mod model;

pub use model::{
    Item, ItemId, Location, LocationId, NewItem, NewLocation, NewTrackedItem, TrackedItem,
    DEFAULT_TRACKING_PRIORITY,
};
