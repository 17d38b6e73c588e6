//! The module for the wasmprune CLI commands.

mod optimize;
mod prune;

pub use self::{optimize::*, prune::*};
