use ipp::request::IppRequestResponse;

/// The result type returned by every operation handler: either a fully formed
/// IPP response ready to serialise, or an error to be rendered into one by
/// [`crate::error::IppError`] (see `build_error_response` on the dispatcher).
pub type IppResult = anyhow::Result<IppRequestResponse>;
