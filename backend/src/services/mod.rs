//! Business logic services for the dengue forecast server

pub mod forecast;
pub mod history;
pub mod session;

pub use forecast::ForecastService;
pub use history::CaseHistoryStore;
pub use session::SessionStore;
