//! The attribute engine: copying/filtering attribute groups by name and
//! group tag (§4.2) and the `media-col` import/export mapping
//! (§4.3). Both are pure functions over `ipp::attribute` types so they can
//! be exercised without a running System.
mod filter;
mod media;

pub use filter::{IppFilter, RequestedAttributes};
pub use media::MediaCollection;
