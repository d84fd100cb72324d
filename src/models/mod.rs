pub mod cleanup;
pub mod error;
pub mod events;
pub mod health;
pub mod message;
pub mod room;
pub mod room_delete;

pub use cleanup::*;
pub use error::*;
pub use events::*;
pub use health::*;
pub use message::*;
pub use room::*;
pub use room_delete::*;
