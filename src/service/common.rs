use async_trait::async_trait;
use http::request::Parts as ReqParts;
use ipp::request::IppRequestResponse;

/// The single seam between the HTTP transport (`handler::handle_ipp_via_http`,
/// `server::serve_ipp`) and whatever owns the IPP object model. `IppDispatcher`
/// is the crate's only implementor: it validates the envelope, resolves the
/// request's target (System/Printer/Job) and routes to the handler that owns
/// it, returning an already status-coded response (errors are folded in by
/// `dispatcher::build_error_response`, never propagated past this boundary).
#[async_trait]
pub trait IppService: Send + Sync + 'static {
    async fn handle_request(&self, head: ReqParts, req: IppRequestResponse) -> IppRequestResponse;
}
