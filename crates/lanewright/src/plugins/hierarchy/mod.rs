//! Organization hierarchy plugin
//!
//! Overview boards above single processes: the value chain of an
//! organization and the SIPOC table of a macroprocess.

mod board;
mod model;
mod sipoc;
mod value_chain;

pub use board::*;
pub use model::*;
pub use sipoc::SipocLayout;
pub use value_chain::ValueChainLayout;
