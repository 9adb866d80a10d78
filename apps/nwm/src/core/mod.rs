pub mod context;
pub mod display;
pub mod error;
pub mod events;
pub mod x11;
