//! Domain models shared by the sync engine and its collaborators

mod entity;
mod record;
mod window;

pub use entity::{Entity, EntityQuery};
pub use record::{DataSchema, RawRecord, Record};
pub use window::FetchWindow;
