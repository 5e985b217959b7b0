//! Core library for the CEP weather app.
//!
//! This crate defines:
//! - Configuration handling
//! - The CEP and weather resolvers, behind traits
//! - The lookup flow and its error taxonomy
//! - The cookie-backed search history
//!
//! It is used by `cep-weather-web`, but has no HTTP server of its own.

pub mod config;
pub mod error;
pub mod history;
pub mod lookup;
pub mod model;
pub mod resolver;

pub use config::Config;
pub use error::{ErrorKind, LookupError};
pub use history::{HistoryStore, LoadPolicy, SortDirection, SortKey, SortState, UpsertStrategy};
pub use lookup::LookupService;
pub use model::{Cep, SearchRecord};
pub use resolver::{AddressResolver, Resolvers, WeatherResolver};
