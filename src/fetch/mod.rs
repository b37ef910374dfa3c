//! Fetch interception
//!
//! Every resource the application asks for is resolved here, either from
//! the network or from the current cache generation.
//!
//! # Strategies
//!
//! | Request | Strategy | Offline behavior |
//! |---------|----------|------------------|
//! | Cross-origin | cache-first | cached copy, else network error |
//! | Same-origin | network-first | cached copy, else `Unavailable` |

mod interceptor;
mod network;
mod request;

pub use interceptor::{FetchInterceptor, Strategy};
pub use network::{HttpNetwork, Network};
pub use request::{Origin, Request, Response, ResponseSource};
