use crate::error::IppError;
use crate::handlers::base_url;
use crate::printer::{run_scheduler, RawSocketIngest};
use crate::result::IppResult;
use crate::system::{validate_geo_location, System};
use crate::utils::{take_ipp_attribute, take_requesting_user_name};
use http::request::Parts as ReqParts;
use ipp::attribute::{IppAttribute, IppAttributeGroup};
use ipp::model::{DelimiterTag, StatusCode};
use ipp::request::IppRequestResponse;
use ipp::value::IppValue;
use std::sync::Arc;

/// `CreatePrinter` (§4.7): required `printer-name`, vendor `device-uri`,
/// vendor `driver`; spawns the new printer's scheduler and raw-listener
/// tasks on success.
pub async fn create_printer(system: &Arc<System>, _head: &ReqParts, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let requesting_user = take_requesting_user_name(attrs);
    system.authorize(&requesting_user).await?;

    let name = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "printer-name")
        .and_then(|v| v.into_name_without_language().ok())
        .ok_or_else(|| IppError::bad_request("printer-name is required"))?;
    if name.is_empty() || name.len() > 127 {
        return Err(IppError::bad_request("printer-name must be 1..127 characters").into());
    }
    let device_uri = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "device-uri")
        .and_then(|v| v.into_uri().ok())
        .ok_or_else(|| IppError::bad_request("device-uri is required"))?;
    let driver_name = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "driver")
        .and_then(|v| v.into_keyword().ok())
        .ok_or_else(|| IppError::bad_request("driver is required"))?;
    let max_active_jobs = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "max-active-jobs")
        .and_then(|v| v.into_integer().ok())
        .map(|n| n.max(0) as usize)
        .unwrap_or(1);

    let printer = system.create_printer(name, device_uri, driver_name, max_active_jobs).await?;

    tokio::spawn(run_scheduler(system.clone(), printer.clone()));
    let ingest = RawSocketIngest::new(printer.id);
    ingest.spawn(printer.clone(), system.info.spool_dir.clone()).await;

    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut group = IppAttributeGroup::new(DelimiterTag::PrinterAttributes);
    group.attributes_mut().extend(
        [
            IppAttribute::new("printer-id", IppValue::Integer(printer.id)),
            IppAttribute::new(IppAttribute::PRINTER_NAME, IppValue::NameWithoutLanguage(printer.name.clone())),
            IppAttribute::new("printer-uuid", IppValue::Uri(format!("urn:uuid:{}", printer.uuid))),
        ]
        .into_iter()
        .map(|a| (a.name().to_owned(), a)),
    );
    resp.attributes_mut().groups_mut().push(group);
    Ok(resp)
}

/// `DeletePrinter`: immediate, or deferred until the printer's in-flight job
/// completes (`System::delete_printer` encodes the deferral).
pub async fn delete_printer(system: &System, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    let requesting_user = take_requesting_user_name(attrs);
    system.authorize(&requesting_user).await?;

    let printer_id = take_ipp_attribute(attrs, DelimiterTag::OperationAttributes, "printer-id")
        .and_then(|v| v.into_integer().ok())
        .ok_or_else(|| IppError::bad_request("printer-id is required"))?;

    system.delete_printer(printer_id).await?;
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// `Get-Printers`: enumerate up to `limit` printers (all, if absent) under
/// the system's printer registry.
pub async fn get_printers(system: &System, head: &ReqParts, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;

    let limit = take_ipp_attribute(req.attributes_mut(), DelimiterTag::OperationAttributes, "limit")
        .and_then(|v| v.into_integer().ok())
        .map(|n| n.max(0) as usize);
    let requested = crate::attrs::IppFilter::requested_array(req.attributes());

    let base_url = base_url(head);
    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    for printer in system.printers().await.into_iter().take(limit.unwrap_or(usize::MAX)) {
        let attrs = printer.copy_attributes(&base_url, &requested).await;
        let mut group = IppAttributeGroup::new(DelimiterTag::PrinterAttributes);
        group.attributes_mut().extend(attrs.into_iter().map(|a| (a.name().to_owned(), a)));
        resp.attributes_mut().groups_mut().push(group);
    }
    Ok(resp)
}

pub async fn get_system_attributes(system: &System, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let config = system.config().await;

    let mut resp = IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id);
    let mut group = IppAttributeGroup::new(DelimiterTag::SystemAttributes);
    group.attributes_mut().extend(
        [
            IppAttribute::new("system-name", IppValue::NameWithoutLanguage(system.info.name.clone())),
            IppAttribute::new("system-uuid", IppValue::Uri(format!("urn:uuid:{}", system.uuid))),
            IppAttribute::new("system-up-time", IppValue::Integer(system.uptime())),
            IppAttribute::new("system-default-printer-id", IppValue::Integer(system.default_printer_id())),
            IppAttribute::new("system-location", IppValue::TextWithoutLanguage(config.location)),
            IppAttribute::new("system-organization", IppValue::TextWithoutLanguage(config.organization)),
            IppAttribute::new("system-organizational-unit", IppValue::TextWithoutLanguage(config.organizational_unit)),
            IppAttribute::new(
                "system-geo-location",
                config.geo_location.map_or(IppValue::NoValue, IppValue::Uri),
            ),
            IppAttribute::new("system-config-change-time", IppValue::Integer(system.config_changes())),
        ]
        .into_iter()
        .map(|a| (a.name().to_owned(), a)),
    );
    resp.attributes_mut().groups_mut().push(group);
    Ok(resp)
}

/// `SetSystemAttributes`: the four independently-settable fields plus
/// `system-default-printer-id`, each applied by its own dedicated setter
/// (§9 open question).
pub async fn set_system_attributes(system: &System, mut req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    let attrs = req.attributes_mut();

    if let Some(v) = take_ipp_attribute(attrs, DelimiterTag::SystemAttributes, "system-location").and_then(|v| v.into_text_without_language().ok()) {
        system.set_location(v).await;
    }
    if let Some(v) = take_ipp_attribute(attrs, DelimiterTag::SystemAttributes, "system-organization").and_then(|v| v.into_text_without_language().ok()) {
        system.set_organization(v).await;
    }
    if let Some(v) = take_ipp_attribute(attrs, DelimiterTag::SystemAttributes, "system-organizational-unit").and_then(|v| v.into_text_without_language().ok()) {
        system.set_organizational_unit(v).await;
    }
    if let Some(v) = take_ipp_attribute(attrs, DelimiterTag::SystemAttributes, "system-geo-location").and_then(|v| v.into_uri().ok()) {
        validate_geo_location(&v)?;
        system.set_geo_location(v).await?;
    }
    if let Some(id) = take_ipp_attribute(attrs, DelimiterTag::SystemAttributes, "system-default-printer-id").and_then(|v| v.into_integer().ok()) {
        if system.find_printer_by_id(id).await.is_none() {
            return Err(IppError::not_found(format!("no such printer {id}")).into());
        }
        system.set_default_printer_id(id);
    }

    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}

/// Vendor system op: pause every printer's scheduler by flipping `is_stopped`.
pub async fn shutdown_all_printers(system: &System, req: IppRequestResponse) -> IppResult {
    let req_id = req.header().request_id;
    let version = req.header().version;
    for printer in system.printers().await {
        printer.is_stopped.store(true, std::sync::atomic::Ordering::Release);
    }
    Ok(IppRequestResponse::new_response(version, StatusCode::SuccessfulOk, req_id))
}
