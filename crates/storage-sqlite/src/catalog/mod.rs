mod model;
mod repository;

pub use model::{ItemDB, LocationDB, NewItemDB, NewLocationDB, NewTrackedItemDB, TrackedItemDB};
pub use repository::CatalogRepository;
