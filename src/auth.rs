//! Identity-domain identifiers, repository scoping, and token models.

pub mod id;
pub mod scope;
pub mod token;

pub use id::*;
pub use scope::*;
pub use token::{access::*, extras::*, secret::*};
