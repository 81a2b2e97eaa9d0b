//! Access tokens, their extras bag, and the redacting secret wrapper.

pub mod access;
pub mod extras;
pub mod secret;
