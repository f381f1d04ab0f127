//! External integrations: the weather provider and the forecast model artifact

pub mod model;
pub mod weather;

pub use model::{ModelError, XgbModel};
pub use weather::{WeatherClient, WeatherError};
