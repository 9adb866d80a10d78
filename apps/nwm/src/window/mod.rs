pub mod client;
pub mod commands;
pub mod cursors;
pub mod drag;
pub mod events;
pub mod focus;
pub mod layout;
pub mod manager;
pub mod monitor;
pub mod placement;
pub mod registry;

#[cfg(test)]
pub mod testing;
