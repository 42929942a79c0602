//! Printer- and Job-scoped operation handlers (§4.7 of the design): print
//! submission, job enumeration/cancellation, and the printer-level controls
//! (set-attributes, identify, enable/disable, hold/release).

use crate::attrs::IppFilter;
use crate::error::IppError;
use crate::handlers::{base_url, drain_payload};
use crate::job::Job;
use crate::model::{IdentifyActions, JobState, WhichJob};
use crate::printer::Printer;
use crate::result::IppResult;
use crate::system::System;
use crate::utils::{decommpress_payload, take_ipp_attribute, take_requesting_user_name};
use http::request::Parts as ReqParts;
use ipp::attribute::{IppAttribute, IppAttributeGroup};
use ipp::model::{DelimiterTag, StatusCode};
use ipp::request::IppRequestResponse;
use ipp::value::IppValue;
use uuid::Uuid;

fn job_uri(base: &str, printer: &Printer, job_id: i32) -> String {
    format!("{base}{}/{job_id}", printer.resource_path)
}

/// `Print-Job` (§4.7): creates the job and drains the HTTP body into its
/// spool file in one request/response round trip.
pub async fn print_job(system: &System, printer: &Printer, head: &ReqParts, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;

    if !printer.is_accepting.load(std::sync::atomic::Ordering::Acquire) {
        return Err(IppError::not_accepting_jobs().into());
    }

    let attrs = req.attributes_mut();
    let username = take_requesting_user_name(attrs);
    let job_name = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "job-name").and_then(|v| v.into_name_without_language().ok());
    let format = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "document-format").and_then(|v| v.into_mime_media_type().ok());
    let compression = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "compression").and_then(|v| v.into_keyword().ok());
    let fidelity = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "ipp-attribute-fidelity")
        .and_then(|v| v.into_boolean().ok())
        .unwrap_or(false);

    let resolved_format = printer.resolve_document_format(format.as_deref()).await?;

    let mut job_attrs = ipp::attribute::IppAttributes::new();
    IppFilter::copy_attributes(&mut job_attrs, req.attributes(), &crate::attrs::RequestedAttributes::all(), Some(DelimiterTag::JobAttributes), DelimiterTag::JobAttributes);
    let ignored = printer.validate_job_template_attributes(&mut job_attrs, fidelity).await?;

    let job_id = printer.create_job(username, job_name, job_attrs).await?;
    let job_ref = printer.find_job(job_id).await.expect("job just created");

    let spool_path = Job::spool_file_path(&system.info.spool_dir, printer.id, job_id, 0, Some(resolved_format.as_str()));
    let payload = decommpress_payload(req.into_payload(), compression.as_deref())?;
    drain_payload(payload, &spool_path).await.map_err(|e| IppError::internal(e.to_string()))?;

    {
        let mut job = job_ref.write().await;
        job.submit_file(spool_path, Some(resolved_format));
    }

    let base = base_url(head);
    let job = job_ref.read().await;
    build_job_identity_response(version, req_id, &job.identity_attributes(&job_uri(&base, printer, job_id)), ignored)
}

/// `Validate-Job`: runs the same format/attribute validation as Print-Job
/// without creating a job or accepting a document.
pub async fn validate_job(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();
    let format = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "document-format").and_then(|v| v.into_mime_media_type().ok());
    printer.resolve_document_format(format.as_deref()).await?;
    // Validate-Job always requires full attribute fidelity (§4.4).
    printer.validate_job_template_attributes(attrs, true).await?;
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// `Create-Job`: allocates a job with no document attached; the client
/// follows up with one or more Send-Document requests.
pub async fn create_job(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();
    let username = take_requesting_user_name(attrs);
    let job_name = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "job-name").and_then(|v| v.into_name_without_language().ok());
    let fidelity = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "ipp-attribute-fidelity")
        .and_then(|v| v.into_boolean().ok())
        .unwrap_or(false);

    let mut job_attrs = ipp::attribute::IppAttributes::new();
    IppFilter::copy_attributes(&mut job_attrs, req.attributes(), &crate::attrs::RequestedAttributes::all(), Some(DelimiterTag::JobAttributes), DelimiterTag::JobAttributes);
    let ignored = printer.validate_job_template_attributes(&mut job_attrs, fidelity).await?;

    let job_id = printer.create_job(username, job_name, job_attrs).await?;
    let job_ref = printer.find_job(job_id).await.expect("job just created");
    let job = job_ref.read().await;
    build_job_identity_response(version, req_id, &job.identity_attributes(&format!("{}/{job_id}", printer.resource_path)), ignored)
}

/// `Send-Document`: attaches a document to a job created by Create-Job.
/// `last-document` is required per RFC 8011 and must be `true` in this
/// implementation (no multi-document jobs).
pub async fn send_document(system: &System, printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let job_id = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, IppAttribute::JOB_ID)
        .and_then(|v| v.into_integer().ok())
        .ok_or_else(|| IppError::bad_request("job-id is required"))?;
    let last_document = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "last-document")
        .and_then(|v| v.into_boolean().ok())
        .ok_or_else(|| IppError::bad_request("last-document is required"))?;
    if !last_document {
        return Err(IppError::attributes_or_values("multi-document jobs are not supported").into());
    }
    let format = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "document-format").and_then(|v| v.into_mime_media_type().ok());
    let compression = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "compression").and_then(|v| v.into_keyword().ok());

    let job_ref = printer.find_job(job_id).await.ok_or_else(|| IppError::not_found(format!("no such job {job_id}")))?;
    {
        let job = job_ref.read().await;
        if job.state() != JobState::Held && job.state() != JobState::Pending {
            return Err(IppError::not_possible("job is not waiting for a document").into());
        }
    }

    let resolved_format = printer.resolve_document_format(format.as_deref()).await?;
    let spool_path = Job::spool_file_path(&system.info.spool_dir, printer.id, job_id, 0, Some(resolved_format.as_str()));
    let payload = decommpress_payload(req.into_payload(), compression.as_deref())?;
    drain_payload(payload, &spool_path).await.map_err(|e| IppError::internal(e.to_string()))?;

    {
        let mut job = job_ref.write().await;
        job.submit_file(spool_path, Some(resolved_format));
    }

    let job = job_ref.read().await;
    build_job_identity_response(version, req_id, &job.identity_attributes(&format!("{}/{job_id}", printer.resource_path)), Vec::new())
}

/// `Close-Job`: marks a multi-document job's intake complete. Since this
/// implementation only accepts single-document jobs (Send-Document always
/// requires `last-document=true`), a job reaching this handler is already
/// past PENDING, so Close-Job is a harmless acknowledgement.
pub async fn close_job(printer: &Printer, job_id: i32, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    printer.find_job(job_id).await.ok_or_else(|| IppError::not_found(format!("no such job {job_id}")))?;
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// `Cancel-Job`: NOT_POSSIBLE when already terminal, else `Job::cancel`. A
/// job that was PENDING/HELD (not yet PROCESSING) transitions straight to
/// CANCELED, so its spool file (if any) is removed immediately.
pub async fn cancel_job(printer: &Printer, job_id: i32, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let job_ref = printer.find_job(job_id).await.ok_or_else(|| IppError::not_found(format!("no such job {job_id}")))?;
    let spool_to_remove = {
        let mut job = job_ref.write().await;
        let transitioned_immediately = job.cancel()?;
        if transitioned_immediately { job.spool_path.take() } else { None }
    };
    crate::handlers::cleanup_spool_file(spool_to_remove).await;
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// `Cancel-Current-Job` / `Cancel-Jobs` / `Cancel-My-Jobs`: cancels the
/// printer's currently processing job, or (for the latter two) every
/// non-terminal job belonging to the requesting user.
pub async fn cancel_current_job(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let requesting_user = take_requesting_user_name(req.attributes_mut());

    if let Some(job_id) = *printer.processing_job.read().await {
        if let Some(job_ref) = printer.find_job(job_id).await {
            // PROCESSING jobs only get the is_canceled flag set; the
            // spool file is cleaned up once the scheduler observes it.
            let _ = job_ref.write().await.cancel();
        }
        return Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id));
    }

    let mut spool_files_to_remove = Vec::new();
    let jobs = printer.all_jobs.read().await;
    for job in jobs.iter() {
        let mut job = job.write().await;
        if job.username == requesting_user && !job.state().is_terminal() {
            if let Ok(transitioned_immediately) = job.cancel() {
                if transitioned_immediately {
                    spool_files_to_remove.push(job.spool_path.take());
                }
            }
        }
    }
    drop(jobs);
    for path in spool_files_to_remove {
        crate::handlers::cleanup_spool_file(path).await;
    }
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// `Get-Jobs`: enumerate jobs matching `which-jobs`/`my-jobs`, newest first.
pub async fn get_jobs(printer: &Printer, head: &ReqParts, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let which = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "which-jobs")
        .and_then(|v| v.into_keyword().ok())
        .map(|kw| WhichJob::from_keyword(&kw))
        .unwrap_or(WhichJob::NotCompleted);
    let limit = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "limit").and_then(|v| v.into_integer().ok()).map(|n| n.max(0) as usize);
    let my_jobs = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "my-jobs").and_then(|v| v.into_boolean().ok()).unwrap_or(false);
    let requesting_user = take_requesting_user_name(attrs);
    let requested = IppFilter::requested_array(req.attributes());

    let base = base_url(head);
    let printer_uri = printer.uri(&base);

    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut matched = 0usize;
    let mut entries = Vec::new();
    let jobs = printer.all_jobs.read().await;
    for job in jobs.iter() {
        let job = job.read().await;
        if my_jobs && job.username != requesting_user {
            continue;
        }
        let matches = if which == WhichJob::Fetchable {
            job.state_reasons().contains(crate::model::JobStateReasons::JOB_FETCHABLE)
        } else {
            which.matches(job.state())
        };
        if !matches {
            continue;
        }
        entries.push((job.id, job.copy_attributes(&job_uri(&base, printer, job.id), &printer_uri, &requested)));
    }
    drop(jobs);
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, attrs) in entries {
        if let Some(limit) = limit {
            if matched >= limit {
                break;
            }
        }
        matched += 1;
        let mut group = IppAttributeGroup::new(DelimiterTag::JobAttributes);
        group.attributes_mut().extend(attrs.into_iter().map(|a| (a.name().to_owned(), a)));
        resp.attributes_mut().groups_mut().push(group);
    }
    Ok(resp)
}

/// `Get-Job-Attributes`.
pub async fn get_job_attributes(printer: &Printer, job_id: i32, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let requested = IppFilter::requested_array(req.attributes());

    let job_ref = printer.find_job(job_id).await.ok_or_else(|| IppError::not_found(format!("no such job {job_id}")))?;
    let job = job_ref.read().await;

    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut group = IppAttributeGroup::new(DelimiterTag::JobAttributes);
    group.attributes_mut().extend(
        job.copy_attributes(&format!("{}/{job_id}", printer.resource_path), &printer.resource_path, &requested)
            .into_iter()
            .map(|a| (a.name().to_owned(), a)),
    );
    resp.attributes_mut().groups_mut().push(group);
    Ok(resp)
}

/// `Get-Printer-Attributes`.
pub async fn get_printer_attributes(printer: &Printer, head: &ReqParts, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let requested = IppFilter::requested_array(req.attributes());
    let base = base_url(head);

    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut group = IppAttributeGroup::new(DelimiterTag::PrinterAttributes);
    group.attributes_mut().extend(printer.copy_attributes(&base, &requested).await.into_iter().map(|a| (a.name().to_owned(), a)));
    resp.attributes_mut().groups_mut().push(group);
    Ok(resp)
}

/// `Set-Printer-Attributes` (§4.5 "Set-attribute protocol"). Unsupported
/// attributes are echoed back in the Unsupported-Attributes group with the
/// overall status `ATTRIBUTES_OR_VALUES`; on success, nothing is committed
/// halfway (see `Printer::set_attributes`).
pub async fn set_printer_attributes(printer: &Printer, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;

    // The dispatcher doesn't thread the connection's peer address down to
    // per-operation handlers, so the Wi-Fi credential setters (which require
    // a loopback client per §6) are unreachable over the network listener;
    // they're only exercised by same-host tooling that talks to the driver
    // directly.
    match printer.set_attributes(req.attributes(), false, false).await {
        Ok(()) => Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id)),
        Err((err, unsupported)) => {
            let mut resp = IppRequestResponse::new_response(version, err.code, req_id);
            resp.attributes_mut().add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new(IppAttribute::STATUS_MESSAGE, IppValue::TextWithoutLanguage(err.msg)),
            );
            let mut group = IppAttributeGroup::new(DelimiterTag::UnsupportedAttributes);
            group.attributes_mut().extend(unsupported.into_iter().map(|a| (a.name().to_owned(), a)));
            resp.attributes_mut().groups_mut().push(group);
            Ok(resp)
        }
    }
}

/// `Identify-Printer`: in proxy mode (one or more registered output
/// devices), queues the action/message for every device and raises
/// `identify-printer-requested` instead of acting directly; otherwise
/// drives the local driver's `identify_cb`.
pub async fn identify_printer(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let requested_actions = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "identify-actions").map(|v| {
        let keywords: Vec<String> = v.into_iter().filter_map(|e| e.as_keyword().cloned()).collect();
        IdentifyActions::from_keywords(keywords.iter().map(String::as_str))
    });
    let actions = match requested_actions {
        Some(a) if !a.is_empty() => a,
        _ => printer.identify_actions_default().await,
    };
    let message = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "message").and_then(|v| v.into_text_without_language().ok()).unwrap_or_default();

    if printer.is_proxy().await {
        printer.queue_identify(actions, &message).await;
    } else {
        printer.driver.identify(actions, &message).await.map_err(|e| IppError::internal(e.to_string()))?;
    }
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

fn parse_device_uuid(uri: &str) -> Option<Uuid> {
    uri.strip_prefix("urn:uuid:").and_then(|s| Uuid::parse_str(s).ok())
}

/// `Acknowledge-Identify-Printer` (§4.7, proxy scenario): drains the pending
/// identify action queued for the requesting output device.
pub async fn acknowledge_identify_printer(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let device_uuid = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "output-device-uuid")
        .and_then(|v| v.into_uri().ok())
        .and_then(|uri| parse_device_uuid(&uri))
        .ok_or_else(|| IppError::bad_request("output-device-uuid is required"))?;

    let acked = printer.acknowledge_identify(device_uuid).await;
    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    if let Some((actions, message)) = acked {
        let mut group = IppAttributeGroup::new(DelimiterTag::OperationAttributes);
        group.attributes_mut().extend(
            [
                IppAttribute::new("identify-actions", actions.to_ipp_value()),
                IppAttribute::new("message", IppValue::TextWithoutLanguage(message)),
            ]
            .into_iter()
            .map(|a| (a.name().to_owned(), a)),
        );
        resp.attributes_mut().groups_mut().push(group);
    }
    Ok(resp)
}

/// `Update-Active-Jobs` (§4.7, proxy scenario): an output device reports
/// the states it currently holds for a batch of jobs. Jobs already
/// terminal locally are reconciled back to the device rather than
/// overwritten; any non-terminal local job the device didn't list is
/// returned so it knows to fetch it.
pub async fn update_active_jobs(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let job_ids: Vec<i32> = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "job-ids")
        .map(|v| v.into_iter().filter_map(|e| e.as_integer().copied()).collect())
        .unwrap_or_default();
    let job_states: Vec<JobState> = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "output-device-job-states")
        .map(|v| v.into_iter().filter_map(|e| JobState::try_from(e.clone()).ok()).collect())
        .unwrap_or_default();
    if job_ids.len() != job_states.len() {
        return Err(IppError::attributes_or_values("job-ids and output-device-job-states must be the same length").into());
    }

    let updates: Vec<(i32, JobState)> = job_ids.into_iter().zip(job_states).collect();
    let (rejected, newer) = printer.update_active_jobs(&updates).await;

    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut group = IppAttributeGroup::new(DelimiterTag::OperationAttributes);
    if !rejected.is_empty() {
        group.attributes_mut().extend(
            [
                IppAttribute::new("job-ids", IppValue::Array(rejected.iter().map(|(id, _)| IppValue::Integer(*id)).collect())),
                IppAttribute::new(
                    "output-device-job-states",
                    IppValue::Array(rejected.iter().map(|(_, s)| IppValue::from(*s)).collect()),
                ),
            ]
            .into_iter()
            .map(|a| (a.name().to_owned(), a)),
        );
    }
    if !newer.is_empty() {
        group.attributes_mut().insert(
            "job-ids-to-fetch".to_string(),
            IppAttribute::new("job-ids-to-fetch", IppValue::Array(newer.into_iter().map(IppValue::Integer).collect())),
        );
    }
    if !group.attributes().is_empty() {
        resp.attributes_mut().groups_mut().push(group);
    }
    Ok(resp)
}

/// `Update-Output-Device-Attributes` (§4.7, proxy scenario): registers the
/// calling device (by `output-device-uuid`) on first contact and applies
/// every operation attribute besides the envelope/identity ones as a
/// device-reported attribute, sparse `base.INDEX`/`base.START-END` names
/// included.
pub async fn update_output_device_attributes(printer: &Printer, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let device_uuid = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "output-device-uuid")
        .and_then(|v| v.into_uri().ok())
        .and_then(|uri| parse_device_uuid(&uri))
        .ok_or_else(|| IppError::bad_request("output-device-uuid is required"))?;

    const ENVELOPE_KEYS: &[&str] = &["printer-uri", "requesting-user-name", "output-device-uuid"];
    let updates: Vec<(String, IppValue)> = attrs
        .groups_mut()
        .iter_mut()
        .filter(|g| g.tag() == DelimiterTag::OperationAttributes)
        .flat_map(|g| std::mem::take(g.attributes_mut()).into_iter())
        .filter(|(name, _)| !ENVELOPE_KEYS.contains(&name.as_str()))
        .map(|(name, attr)| (name, attr.into_value()))
        .collect();

    printer.update_output_device_attributes(device_uuid, updates).await;
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

pub async fn enable_printer(printer: &Printer, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    printer.is_stopped.store(false, std::sync::atomic::Ordering::Release);
    printer.is_accepting.store(true, std::sync::atomic::Ordering::Release);
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

pub async fn disable_printer(printer: &Printer, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    printer.is_stopped.store(true, std::sync::atomic::Ordering::Release);
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

pub async fn hold_new_jobs(printer: &Printer, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    printer.hold_new_jobs.store(true, std::sync::atomic::Ordering::Release);
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

pub async fn release_held_new_jobs(printer: &Printer, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    printer.hold_new_jobs.store(false, std::sync::atomic::Ordering::Release);
    let jobs = printer.all_jobs.read().await;
    for job in jobs.iter() {
        let mut job = job.write().await;
        if job.state() == JobState::Held {
            job.set_state(JobState::Pending);
        }
    }
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// Builds the Job-Attributes response group, plus an Unsupported-Attributes
/// group when `ignored` is non-empty (job-template attributes that were
/// silently dropped rather than rejected, per §4.4's fidelity rule).
fn build_job_identity_response(version: ipp::model::IppVersion, req_id: u32, attrs: &[IppAttribute], ignored: Vec<IppAttribute>) -> IppResult {
    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut group = IppAttributeGroup::new(DelimiterTag::JobAttributes);
    group.attributes_mut().extend(attrs.iter().cloned().map(|a| (a.name().to_owned(), a)));
    resp.attributes_mut().groups_mut().push(group);
    if !ignored.is_empty() {
        let mut unsupported = IppAttributeGroup::new(DelimiterTag::UnsupportedAttributes);
        unsupported.attributes_mut().extend(ignored.into_iter().map(|a| (a.name().to_owned(), a)));
        resp.attributes_mut().groups_mut().push(unsupported);
    }
    Ok(resp)
}
