pub mod cleanup_tick;
pub mod health;
pub mod room_delete;

pub use cleanup_tick::*;
pub use health::*;
pub use room_delete::*;
