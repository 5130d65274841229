pub mod config;
pub mod config_loader;
pub mod duplicate;
pub mod error;
pub mod traits;

pub use config::*;
pub use config_loader::*;
pub use duplicate::*;
pub use error::*;
pub use traits::*;
