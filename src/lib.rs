pub mod core;
pub mod orchestration;

pub use core::*;
pub use orchestration::{BundlePublisher, PublishReport};
