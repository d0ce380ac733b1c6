//! Network side: the accept loop and the transports connections run over.

pub mod listener;
pub mod transport;

pub use transport::{Secured, Transport};
