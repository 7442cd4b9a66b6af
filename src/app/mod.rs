// Application layer - batch orchestration and wiring

pub mod batch_controller;
pub mod container;
pub mod events;

// Re-export application services
pub use batch_controller::{BatchController, BatchSettings};
pub use container::{AppContainer, DefaultAppContainer};
pub use events::{drain_into, forward_until};
