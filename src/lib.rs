pub mod api;
pub mod config;
pub mod error;
pub mod mail;
pub mod models;
pub mod state;

pub use config::{Config, ConfigError, MailerConfig};
pub use error::{AppError, Result};
pub use mail::message::{Composition, CompositionError, MergeParams, Message, Recipient};
pub use mail::response::{all_accepted, DeliveryResult, DeliveryStatus};
pub use mail::Mailer;
pub use state::AppState;
