/// State management module
///
/// This module handles all image lifecycle state, including:
/// - Image records and identities (data.rs)
/// - The durable artifact counter (counter.rs)
/// - The bounded gallery and the two-slot selection (gallery.rs, selection.rs)
/// - Notifications to observers (events.rs)
/// - Startup configuration (config.rs)
/// - The manager tying it all together (manager.rs)

pub mod config;
pub mod counter;
pub mod data;
pub mod events;
pub mod gallery;
pub mod manager;
pub mod selection;
