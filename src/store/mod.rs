//! Persistence seams and their implementations
//!
//! The engine reads and writes records only through [`DataStore`], loads its
//! population through [`EntityCatalog`] and its trading days through
//! [`CalendarService`].

mod memory;
mod repositories;

pub use memory::{InMemoryDataStore, StaticCalendar, StaticEntityCatalog};
pub use repositories::{CalendarService, DataStore, EntityCatalog, FileDataStore, Order, StoreError};
