mod common;

pub use common::IppService;
