//! Routes a parsed IPP request to the System, Printer or Job handler that
//! owns its target URI, after validating the envelope per RFC 8011 §4.1.1
//! (§4.6 of the design).

use crate::error::IppError;
use crate::handlers::{printer_handlers, system_handlers};
use crate::system::System;
use http::request::Parts as ReqParts;
use ipp::attribute::IppAttribute;
use ipp::model::{DelimiterTag, IppVersion, StatusCode};
use ipp::request::IppRequestResponse;
use ipp::value::IppValue;
use std::sync::Arc;

/// IPP operation codes the `ipp` crate's `Operation` enum does not expose
/// (System-scoped and a few Printer-scoped operations registered after the
/// crate's own `Operation` enum was last extended). Values are taken from
/// the IANA "IPP Registrations" operation-id registry; since they can't be
/// cross-checked against the vendored crate snapshot (see DESIGN.md), treat
/// them as a disclosed best-effort mapping rather than a verified one.
pub mod raw_op {
    pub const ENABLE_PRINTER: u16 = 0x0022;
    pub const DISABLE_PRINTER: u16 = 0x0023;
    pub const HOLD_NEW_JOBS: u16 = 0x0025;
    pub const RELEASE_HELD_NEW_JOBS: u16 = 0x0026;
    pub const CANCEL_CURRENT_JOB: u16 = 0x002D;
    pub const CANCEL_JOBS: u16 = 0x0038;
    pub const CANCEL_MY_JOBS: u16 = 0x0039;
    pub const CLOSE_JOB: u16 = 0x003B;
    pub const IDENTIFY_PRINTER: u16 = 0x003C;
    pub const SET_PRINTER_ATTRIBUTES: u16 = 0x0013;
    pub const CREATE_PRINTER: u16 = 0x004D;
    pub const DELETE_PRINTER: u16 = 0x004E;
    pub const GET_PRINTERS: u16 = 0x004F;
    pub const GET_SYSTEM_ATTRIBUTES: u16 = 0x0050;
    pub const SET_SYSTEM_ATTRIBUTES: u16 = 0x0051;
    pub const SHUTDOWN_ALL_PRINTERS: u16 = 0x0055;

    /// Proxy / output-device scenario (§4.7): a remote or detached printing
    /// endpoint drives these three ops instead of a local `Driver`.
    pub const UPDATE_ACTIVE_JOBS: u16 = 0x0024;
    pub const UPDATE_OUTPUT_DEVICE_ATTRIBUTES: u16 = 0x0054;
    pub const ACKNOWLEDGE_IDENTIFY_PRINTER: u16 = 0x003D;
}

/// Target object resolved from the request's URI, per §4.6's "Resolve
/// target" step.
pub enum Target {
    System,
    Printer(Arc<crate::printer::Printer>),
    Job(Arc<crate::printer::Printer>, i32),
}

pub struct IppDispatcher {
    pub system: Arc<System>,
}

impl IppDispatcher {
    pub fn new(system: Arc<System>) -> IppDispatcher {
        IppDispatcher { system }
    }

    /// Top-level entry point: validate, resolve, dispatch, and always
    /// return a well-formed response (never propagate an error across the
    /// HTTP boundary unanswered).
    pub async fn dispatch(&self, head: ReqParts, req: IppRequestResponse) -> IppRequestResponse {
        let version = req.header().version;
        let req_id = req.header().request_id;

        match self.dispatch_inner(&head, req).await {
            Ok(resp) => resp,
            Err(err) => build_error_response(version, req_id, err),
        }
    }

    async fn dispatch_inner(&self, head: &ReqParts, req: IppRequestResponse) -> Result<IppRequestResponse, IppError> {
        self.validate_envelope(&req)?;

        let op = req.header().operation_or_status;
        let target = self.resolve_target(head, &req).await?;

        match (op, target) {
            (raw_op::CREATE_PRINTER, Target::System) => system_handlers::create_printer(&self.system, head, req).await,
            (raw_op::DELETE_PRINTER, Target::System) => system_handlers::delete_printer(&self.system, req).await,
            (raw_op::GET_PRINTERS, Target::System) => system_handlers::get_printers(&self.system, head, req).await,
            (raw_op::GET_SYSTEM_ATTRIBUTES, Target::System) => system_handlers::get_system_attributes(&self.system, req).await,
            (raw_op::SET_SYSTEM_ATTRIBUTES, Target::System) => system_handlers::set_system_attributes(&self.system, req).await,
            (raw_op::SHUTDOWN_ALL_PRINTERS, Target::System) => system_handlers::shutdown_all_printers(&self.system, req).await,

            (op, Target::Printer(printer)) => self.dispatch_printer_op(op, head, req, printer).await,
            (op, Target::Job(printer, job_id)) => self.dispatch_job_op(op, req, printer, job_id).await,

            (_, Target::System) => Err(IppError::operation_not_supported().into()),
        }
        .map_err(as_ipp_error)
    }

    async fn dispatch_printer_op(
        &self,
        op: u16,
        head: &ReqParts,
        req: IppRequestResponse,
        printer: Arc<crate::printer::Printer>,
    ) -> anyhow::Result<IppRequestResponse> {
        use ipp::model::Operation;
        use num_traits::FromPrimitive;

        if op == raw_op::SET_PRINTER_ATTRIBUTES {
            return printer_handlers::set_printer_attributes(&printer, req).await;
        }
        if op == raw_op::IDENTIFY_PRINTER {
            return printer_handlers::identify_printer(&printer, req).await;
        }
        if op == raw_op::ENABLE_PRINTER {
            return printer_handlers::enable_printer(&printer, req).await;
        }
        if op == raw_op::DISABLE_PRINTER {
            return printer_handlers::disable_printer(&printer, req).await;
        }
        if op == raw_op::HOLD_NEW_JOBS {
            return printer_handlers::hold_new_jobs(&printer, req).await;
        }
        if op == raw_op::RELEASE_HELD_NEW_JOBS {
            return printer_handlers::release_held_new_jobs(&printer, req).await;
        }
        if op == raw_op::CANCEL_CURRENT_JOB || op == raw_op::CANCEL_JOBS || op == raw_op::CANCEL_MY_JOBS {
            return printer_handlers::cancel_current_job(&printer, req).await;
        }
        if op == raw_op::UPDATE_ACTIVE_JOBS {
            return printer_handlers::update_active_jobs(&printer, req).await;
        }
        if op == raw_op::UPDATE_OUTPUT_DEVICE_ATTRIBUTES {
            return printer_handlers::update_output_device_attributes(&printer, req).await;
        }
        if op == raw_op::ACKNOWLEDGE_IDENTIFY_PRINTER {
            return printer_handlers::acknowledge_identify_printer(&printer, req).await;
        }

        match Operation::from_u16(op) {
            Some(Operation::PrintJob) => printer_handlers::print_job(&self.system, &printer, head, req).await,
            Some(Operation::ValidateJob) => printer_handlers::validate_job(&printer, req).await,
            Some(Operation::CreateJob) => printer_handlers::create_job(&printer, req).await,
            Some(Operation::SendDocument) => printer_handlers::send_document(&self.system, &printer, req).await,
            Some(Operation::GetJobs) => printer_handlers::get_jobs(&printer, head, req).await,
            Some(Operation::GetPrinterAttributes) => printer_handlers::get_printer_attributes(&printer, head, req).await,
            Some(Operation::PausePrinter) => printer_handlers::disable_printer(&printer, req).await,
            Some(Operation::ResumePrinter) => printer_handlers::enable_printer(&printer, req).await,
            _ => Err(IppError::operation_not_supported().into()),
        }
    }

    async fn dispatch_job_op(&self, op: u16, req: IppRequestResponse, printer: Arc<crate::printer::Printer>, job_id: i32) -> anyhow::Result<IppRequestResponse> {
        use ipp::model::Operation;
        use num_traits::FromPrimitive;

        if op == raw_op::CLOSE_JOB {
            return printer_handlers::close_job(&printer, job_id, req).await;
        }
        match Operation::from_u16(op) {
            Some(Operation::CancelJob) => printer_handlers::cancel_job(&printer, job_id, req).await,
            Some(Operation::GetJobAttributes) => printer_handlers::get_job_attributes(&printer, job_id, req).await,
            _ => Err(IppError::operation_not_supported().into()),
        }
    }

    /// §4.6's validation list: version, request-id, group ordering, required
    /// operation attributes, charset.
    fn validate_envelope(&self, req: &IppRequestResponse) -> Result<(), IppError> {
        let version = req.header().version;
        if version.0.0 < 1 || version.0.0 > 2 {
            return Err(IppError::version_not_supported());
        }
        if req.header().request_id == 0 {
            return Err(IppError::bad_request("request-id must be positive"));
        }

        let mut last_tag: Option<DelimiterTag> = None;
        for group in req.attributes().groups() {
            let tag = group.tag();
            if let Some(last) = last_tag {
                if (tag as u8) < (last as u8) {
                    return Err(IppError::bad_request("attribute groups out of order"));
                }
            }
            last_tag = Some(tag);
        }

        let charset = req
            .attributes()
            .groups_of(DelimiterTag::OperationAttributes)
            .find_map(|g| g.attributes().get("attributes-charset"))
            .and_then(|a| a.value().as_charset().cloned());
        if let Some(charset) = charset {
            if charset != "us-ascii" && charset != "utf-8" {
                return Err(IppError::bad_request(format!("unsupported charset \"{charset}\"")));
            }
        }
        Ok(())
    }

    /// Resolve `system-uri` / `printer-uri` / `job-uri` to a concrete
    /// target object. `job-uri` carries the job id as its trailing path
    /// segment.
    async fn resolve_target(&self, head: &ReqParts, req: &IppRequestResponse) -> Result<Target, IppError> {
        if head.uri.path() == "/ipp/system" {
            return Ok(Target::System);
        }

        let op_group = req.attributes().groups_of(DelimiterTag::OperationAttributes).next();
        let job_uri = op_group.and_then(|g| g.attributes().get(IppAttribute::JOB_URI)).and_then(|a| a.value().as_uri());
        if let Some(job_uri) = job_uri {
            let (printer_path, job_id) = split_job_uri(job_uri)?;
            let printer = self
                .system
                .find_printer_by_resource(&printer_path)
                .await
                .ok_or_else(|| IppError::not_found(format!("no such printer \"{printer_path}\"")))?;
            return Ok(Target::Job(printer, job_id));
        }

        let printer_uri = op_group
            .and_then(|g| g.attributes().get("printer-uri"))
            .and_then(|a| a.value().as_uri());
        let path = match printer_uri {
            Some(uri) => uri_path(uri),
            None => head.uri.path().to_string(),
        };
        if path == "/ipp/system" {
            let id = self.system.default_printer_id();
            let printer = self
                .system
                .find_printer_by_id(id)
                .await
                .ok_or_else(|| IppError::not_found("no default printer configured"))?;
            return Ok(Target::Printer(printer));
        }

        let job_id_attr = op_group.and_then(|g| g.attributes().get(IppAttribute::JOB_ID)).and_then(|a| a.value().as_integer()).copied();

        let printer = self
            .system
            .find_printer_by_resource(&path)
            .await
            .ok_or_else(|| IppError::not_found(format!("no such printer \"{path}\"")))?;

        match job_id_attr {
            Some(id) => Ok(Target::Job(printer, id)),
            None => Ok(Target::Printer(printer)),
        }
    }
}

#[async_trait::async_trait]
impl crate::service::IppService for IppDispatcher {
    async fn handle_request(&self, head: ReqParts, req: IppRequestResponse) -> IppRequestResponse {
        self.dispatch(head, req).await
    }
}

fn as_ipp_error(e: anyhow::Error) -> IppError {
    match e.downcast::<IppError>() {
        Ok(ippe) => ippe,
        Err(e) => IppError::internal(e.to_string()),
    }
}

fn uri_path(uri: &str) -> String {
    uri.parse::<http::Uri>().map(|u| u.path().to_string()).unwrap_or_else(|_| uri.to_string())
}

fn split_job_uri(uri: &str) -> Result<(String, i32), IppError> {
    let path = uri_path(uri);
    let (printer_path, job_id) = path
        .rsplit_once('/')
        .ok_or_else(|| IppError::bad_request("malformed job-uri"))?;
    let job_id: i32 = job_id.parse().map_err(|_| IppError::bad_request("malformed job-uri"))?;
    Ok((printer_path.to_string(), job_id))
}

pub fn build_error_response(version: IppVersion, req_id: u32, error: IppError) -> IppRequestResponse {
    let mut resp = IppRequestResponse::new_response(version, error.code, req_id);
    resp.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new(IppAttribute::STATUS_MESSAGE, IppValue::TextWithoutLanguage(error.msg)),
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_job_uri_extracts_printer_path_and_numeric_id() {
        let (path, id) = split_job_uri("ipp://host/ipp/print/p1/7").unwrap();
        assert_eq!(path, "/ipp/print/p1");
        assert_eq!(id, 7);
    }

    #[test]
    fn split_job_uri_rejects_non_numeric_suffix() {
        assert!(split_job_uri("ipp://host/ipp/print/p1/oops").is_err());
    }
}
