//! Shared leaf types for the Order Fellow workspace.
mod email;
mod helpers;
mod secret;

pub use email::{EmailAddress, InvalidEmailAddress};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
