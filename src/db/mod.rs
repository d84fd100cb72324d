pub mod dbrooms;
pub mod memstore;
pub mod store;

pub use memstore::MemStore;
pub use store::{RoomStore, StoreError};
