mod authenticator;
mod track_service;

pub use authenticator::*;
pub use track_service::*;
