mod client;
mod error;
mod portal_url;
mod transport;
pub mod domain;
pub mod parsing;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::*;
pub use error::*;
pub use portal_url::*;
pub use transport::*;
