//! Domain models for the dengue forecast service

mod features;
mod prediction;
mod region;
mod risk;
mod session;
mod weather;

pub use features::*;
pub use prediction::*;
pub use region::*;
pub use risk::*;
pub use session::*;
pub use weather::*;
