//! HTTP request handlers

pub mod forecast;
pub mod health;
pub mod region;
pub mod session;

pub use forecast::*;
pub use health::*;
pub use region::*;
pub use session::*;
