mod schema;
mod seen;
mod types;

pub use schema::SeenStore;
pub use seen::DEFAULT_RETENTION;
pub use types::{SeenRecord, StoreError};
