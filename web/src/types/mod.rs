//! Response types for the web API.

mod responses;

pub use responses::*;
