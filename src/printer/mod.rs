mod output_device;
mod raw;
mod scheduler;

pub use output_device::OutputDevice;
pub use raw::RawSocketIngest;
pub use scheduler::run_scheduler;

use crate::attrs::{IppFilter, MediaCollection, RequestedAttributes};
use crate::driver::{Driver, DriverData};
use crate::error::IppError;
use crate::job::Job;
use crate::model::{IdentifyActions, JobState, PageOrientation, PrinterState, PrinterStateReasons};
use crate::system::validate_geo_location;
use futures_locks::RwLock;
use ipp::attribute::{IppAttribute, IppAttributes};
use ipp::model::DelimiterTag;
use ipp::value::IppValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// A queue: one addressable IPP endpoint backed by a driver (§3 "Printer").
pub struct Printer {
    pub id: i32,
    pub name: String,
    pub uuid: Uuid,
    pub resource_path: String,
    pub device_uri: String,
    pub driver_name: String,
    pub driver: Arc<dyn Driver>,

    pub driver_data: RwLock<DriverData>,
    config: RwLock<PrinterConfig>,

    next_job_id: AtomicI32,
    pub all_jobs: RwLock<Vec<RwLock<Job>>>,
    pub max_active_jobs: usize,
    pub max_completed_jobs: usize,

    state: RwLock<PrinterRuntimeState>,

    pub is_accepting: AtomicBool,
    pub is_stopped: AtomicBool,
    pub hold_new_jobs: AtomicBool,
    pub is_deleted: AtomicBool,

    pub processing_job: RwLock<Option<i32>>,

    /// Registered proxy endpoints (§4.7 output-device scenario). Empty for
    /// an ordinary locally-driven printer.
    output_devices: RwLock<Vec<OutputDevice>>,

    created_at: Instant,
}

struct PrinterRuntimeState {
    state: PrinterState,
    reasons: PrinterStateReasons,
    state_time: Instant,
    config_time: Instant,
}

/// The four independently-settable `printer-*` identity fields plus contact
/// and Wi-Fi credentials (§9 open question: never conflated with each
/// other, mirroring `crate::system::SystemConfig`). Wi-Fi join itself is an
/// external collaborator (§1 Non-goals); this only records the credentials
/// a loopback client asked to configure.
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    pub location: String,
    pub organization: String,
    pub organizational_unit: String,
    pub geo_location: Option<String>,
    pub contact_name: Option<String>,
    pub wifi_ssid: Option<String>,
}

impl Printer {
    pub fn new(id: i32, name: String, resource_path: String, device_uri: String, driver_name: String, driver: Arc<dyn Driver>, driver_data: DriverData, max_active_jobs: usize) -> Printer {
        let now = Instant::now();
        Printer {
            id,
            name,
            uuid: Uuid::new_v4(),
            resource_path,
            device_uri,
            driver_name,
            driver,
            driver_data: RwLock::new(driver_data),
            config: RwLock::new(PrinterConfig::default()),
            next_job_id: AtomicI32::new(1),
            all_jobs: RwLock::new(Vec::new()),
            max_active_jobs,
            max_completed_jobs: 200,
            state: RwLock::new(PrinterRuntimeState {
                state: PrinterState::Idle,
                reasons: PrinterStateReasons::NONE,
                state_time: now,
                config_time: now,
            }),
            is_accepting: AtomicBool::new(true),
            is_stopped: AtomicBool::new(false),
            hold_new_jobs: AtomicBool::new(false),
            is_deleted: AtomicBool::new(false),
            processing_job: RwLock::new(None),
            output_devices: RwLock::new(Vec::new()),
            created_at: now,
        }
    }

    pub fn uri(&self, base_url: &str) -> String {
        format!("{base_url}{}", self.resource_path)
    }

    pub async fn state(&self) -> PrinterState {
        self.state.read().await.state
    }

    pub async fn state_reasons(&self) -> PrinterStateReasons {
        let mut reasons = self.state.read().await.reasons;
        if self.is_stopped.load(Ordering::Acquire) {
            if self.processing_job.read().await.is_some() {
                reasons.insert(PrinterStateReasons::MOVING_TO_PAUSED);
            } else {
                reasons.insert(PrinterStateReasons::PAUSED);
            }
        }
        if self.hold_new_jobs.load(Ordering::Acquire) {
            reasons.insert(PrinterStateReasons::HOLD_NEW_JOBS);
        }
        reasons
    }

    /// `create`: allocate a job id, build the Job, and insert it into
    /// `all_jobs` under the printer's job-list write-lock. Fails with
    /// `ServerErrorBusy` when a single-stream printer already has an active
    /// (non-terminal) job.
    pub async fn create_job(&self, username: String, name: Option<String>, attrs: ipp::attribute::IppAttributes) -> Result<i32, IppError> {
        let mut jobs = self.all_jobs.write().await;
        if self.max_active_jobs > 0 {
            let mut active = 0usize;
            for job in jobs.iter() {
                if !job.read().await.state().is_terminal() {
                    active += 1;
                }
            }
            if active >= self.max_active_jobs {
                return Err(IppError::busy("printer is processing another job"));
            }
        }
        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let held = self.hold_new_jobs.load(Ordering::Acquire);
        let job = Job::new(id, self.id, username, name, held, attrs);
        jobs.push(RwLock::new(job));
        Ok(id)
    }

    pub async fn find_job(&self, job_id: i32) -> Option<RwLock<Job>> {
        let jobs = self.all_jobs.read().await;
        for job in jobs.iter() {
            if job.read().await.id == job_id {
                return Some(job.clone());
            }
        }
        None
    }

    pub async fn active_job_count(&self) -> usize {
        let jobs = self.all_jobs.read().await;
        let mut count = 0;
        for job in jobs.iter() {
            if !job.read().await.state().is_terminal() {
                count += 1;
            }
        }
        count
    }

    pub fn uptime(&self) -> i32 {
        self.created_at.elapsed().as_secs() as i32
    }

    /// `copyAttributes`: static driver capability data + live status, in
    /// IPP_TAG_PRINTER, filtered by the client's requested-attributes set.
    pub async fn copy_attributes(&self, base_url: &str, requested: &RequestedAttributes) -> Vec<IppAttribute> {
        let data = self.driver_data.read().await;
        let mut attrs = Vec::new();

        attrs.push(IppAttribute::new(IppAttribute::PRINTER_NAME, IppValue::NameWithoutLanguage(self.name.clone())));
        attrs.push(IppAttribute::new("printer-id", IppValue::Integer(self.id)));
        attrs.push(IppAttribute::new("printer-uuid", IppValue::Uri(format!("urn:uuid:{}", self.uuid))));
        attrs.push(IppAttribute::new(IppAttribute::PRINTER_URI_SUPPORTED, IppValue::Uri(self.uri(base_url))));
        attrs.push(IppAttribute::new(IppAttribute::PRINTER_STATE, IppValue::from(self.state().await)));
        attrs.push(IppAttribute::new(IppAttribute::PRINTER_STATE_REASONS, self.state_reasons().await.to_ipp_value()));
        attrs.push(IppAttribute::new(
            IppAttribute::PRINTER_IS_ACCEPTING_JOBS,
            IppValue::Boolean(self.is_accepting.load(Ordering::Acquire)),
        ));
        attrs.push(IppAttribute::new(IppAttribute::PRINTER_UP_TIME, IppValue::Integer(self.uptime())));
        attrs.push(IppAttribute::new(
            IppAttribute::DOCUMENT_FORMAT_DEFAULT,
            IppValue::MimeMediaType(data.format.clone()),
        ));
        attrs.push(IppAttribute::new(
            IppAttribute::DOCUMENT_FORMAT_SUPPORTED,
            IppValue::Array(data.document_format_supported.iter().cloned().map(IppValue::MimeMediaType).collect()),
        ));
        {
            let cfg = self.config.read().await;
            attrs.push(IppAttribute::new("printer-location", IppValue::TextWithoutLanguage(cfg.location.clone())));
            attrs.push(IppAttribute::new("printer-organization", IppValue::TextWithoutLanguage(cfg.organization.clone())));
            attrs.push(IppAttribute::new(
                "printer-organizational-unit",
                IppValue::TextWithoutLanguage(cfg.organizational_unit.clone()),
            ));
            attrs.push(IppAttribute::new(
                "printer-geo-location",
                cfg.geo_location.clone().map_or(IppValue::NoValue, IppValue::Uri),
            ));
            if let Some(ssid) = &cfg.wifi_ssid {
                attrs.push(IppAttribute::new("printer-wifi-ssid", IppValue::Keyword(ssid.clone())));
            }
        }
        attrs.push(IppAttribute::new("printer-more-info", IppValue::Uri(format!("{}/info", self.uri(base_url)))));
        attrs.push(IppAttribute::new("printer-supply-info-uri", IppValue::Uri(format!("{}/supplies", self.uri(base_url)))));
        attrs.push(IppAttribute::new(
            "printer-icons",
            IppValue::Array(vec![IppValue::Uri(format!("{}/icon.png", self.uri(base_url)))]),
        ));
        attrs.push(IppAttribute::new(
            "printer-strings-uri",
            IppValue::Uri(format!("{}/strings/en.strings", self.uri(base_url))),
        ));
        attrs.push(IppAttribute::new(
            "uri-authentication-supported",
            IppValue::Array(vec![IppValue::Keyword("none".to_string())]),
        ));
        attrs.push(IppAttribute::new(
            "printer-xri-supported",
            IppValue::Array(vec![IppValue::Collection(BTreeMap::from([
                ("xri-uri".to_string(), IppValue::Uri(self.uri(base_url))),
                ("xri-authentication".to_string(), IppValue::Keyword("none".to_string())),
                ("xri-security".to_string(), IppValue::Keyword("none".to_string())),
            ]))]),
        ));
        if !data.sources_supported.is_empty() {
            attrs.push(IppAttribute::new(
                "printer-input-tray",
                IppValue::Array(
                    data.sources_supported
                        .iter()
                        .map(|source| {
                            IppValue::TextWithoutLanguage(format!(
                                "type=sheetFeed;mediafeed=0;mediaxfeed=0;maxcapacity=-2;level=-2;status=0;name={source};"
                            ))
                        })
                        .collect(),
                ),
            ));
        }
        attrs.push(IppAttribute::new(
            IppAttribute::COPIES_SUPPORTED,
            IppValue::RangeOfInteger { min: data.copies_supported.0, max: data.copies_supported.1 },
        ));
        attrs.push(IppAttribute::new(IppAttribute::COPIES_DEFAULT, IppValue::Integer(data.copies_default)));
        attrs.push(IppAttribute::new("page-ranges-supported", IppValue::Boolean(data.page_ranges_supported)));
        attrs.push(IppAttribute::new(
            IppAttribute::MEDIA_SUPPORTED,
            IppValue::Array(data.media_supported.iter().cloned().map(IppValue::Keyword).collect()),
        ));
        attrs.push(IppAttribute::new(IppAttribute::MEDIA_DEFAULT, IppValue::Keyword(data.media_default.clone())));
        // §4.5: a borderless-capable driver advertises each ready media both
        // with its configured margins and as a zero-margin borderless variant.
        let media_ready_entries: Vec<MediaCollection> = if data.borderless {
            data.media_ready
                .iter()
                .cloned()
                .flat_map(|bordered| {
                    let mut borderless = bordered.clone();
                    borderless.top_margin = Some(0);
                    borderless.bottom_margin = Some(0);
                    borderless.left_margin = Some(0);
                    borderless.right_margin = Some(0);
                    [bordered, borderless]
                })
                .collect()
        } else {
            data.media_ready.clone()
        };
        attrs.push(IppAttribute::new(
            IppAttribute::MEDIA_READY,
            IppValue::Array(media_ready_entries.iter().map(|m| m.to_ipp_value()).collect()),
        ));
        attrs.push(IppAttribute::new(
            IppAttribute::MEDIA_COL_READY,
            IppValue::Array(media_ready_entries.iter().map(|m| m.to_ipp_value()).collect()),
        ));
        attrs.push(IppAttribute::new(
            IppAttribute::SIDES_SUPPORTED,
            IppValue::Array(data.sides_supported.iter().cloned().map(IppValue::Keyword).collect()),
        ));
        attrs.push(IppAttribute::new(IppAttribute::SIDES_DEFAULT, IppValue::Keyword(data.sides_default.clone())));
        attrs.push(IppAttribute::new(
            IppAttribute::PRINT_COLOR_MODE_SUPPORTED,
            IppValue::Array(data.color_mode_supported.iter().cloned().map(IppValue::Keyword).collect()),
        ));
        attrs.push(IppAttribute::new(
            IppAttribute::PRINT_COLOR_MODE_DEFAULT,
            IppValue::Keyword(data.color_mode_default.clone()),
        ));
        attrs.push(IppAttribute::new(
            IppAttribute::PRINT_QUALITY_SUPPORTED,
            IppValue::Array(data.quality_supported.iter().map(|q| IppValue::Enum(*q)).collect()),
        ));
        attrs.push(IppAttribute::new(IppAttribute::PRINT_QUALITY_DEFAULT, IppValue::Enum(data.quality_default)));
        attrs.push(IppAttribute::new(
            IppAttribute::ORIENTATION_REQUESTED_SUPPORTED,
            IppValue::Array(data.orientation_supported.iter().copied().map(IppValue::from).collect()),
        ));
        attrs.push(IppAttribute::new(
            IppAttribute::ORIENTATION_REQUESTED_DEFAULT,
            data.orientation_default.map(IppValue::from).unwrap_or(IppValue::NoValue),
        ));
        if !data.resolution_supported.is_empty() {
            attrs.push(IppAttribute::new(
                IppAttribute::PRINTER_RESOLUTION_SUPPORTED,
                IppValue::Array(data.resolution_supported.iter().copied().map(IppValue::from).collect()),
            ));
        }
        if let Some(res) = data.resolution_default {
            attrs.push(IppAttribute::new(IppAttribute::PRINTER_RESOLUTION_DEFAULT, IppValue::from(res)));
        }
        attrs.push(IppAttribute::new(
            "job-spooling-supported",
            IppValue::Keyword(if self.max_active_jobs == 1 { "stream".to_string() } else { "spool".to_string() }),
        ));
        attrs.push(IppAttribute::new(
            "identify-actions-default",
            if data.identify_actions_default.is_empty() {
                IppValue::Keyword("none".to_string())
            } else {
                data.identify_actions_default.to_ipp_value()
            },
        ));
        attrs.push(IppAttribute::new(
            "identify-actions-supported",
            data.identify_actions_supported.to_ipp_value(),
        ));
        if data.num_supply > 0 {
            attrs.push(IppAttribute::new(
                "marker-names",
                IppValue::Array(data.marker_names.iter().cloned().map(IppValue::NameWithoutLanguage).collect()),
            ));
            attrs.push(IppAttribute::new(
                "marker-types",
                IppValue::Array(data.marker_types.iter().cloned().map(IppValue::Keyword).collect()),
            ));
            attrs.push(IppAttribute::new(
                "marker-colors",
                IppValue::Array(data.marker_colors.iter().cloned().map(IppValue::NameWithoutLanguage).collect()),
            ));
            attrs.push(IppAttribute::new(
                "marker-levels",
                IppValue::Array(data.marker_levels.iter().map(|l| IppValue::Integer(*l)).collect()),
            ));
            attrs.push(IppAttribute::new(
                "marker-high-levels",
                IppValue::Array(data.marker_levels.iter().map(|_| IppValue::Integer(100)).collect()),
            ));
            attrs.push(IppAttribute::new(
                "marker-low-levels",
                IppValue::Array(data.marker_levels.iter().map(|_| IppValue::Integer(10)).collect()),
            ));
            attrs.push(IppAttribute::new(
                "printer-supply",
                IppValue::Array(
                    data.marker_names
                        .iter()
                        .zip(data.marker_types.iter())
                        .zip(data.marker_levels.iter())
                        .map(|((name, kind), level)| {
                            IppValue::TextWithoutLanguage(format!("type={kind};maxcapacity=100;level={level};colorantname={name};"))
                        })
                        .collect(),
                ),
            ));
            attrs.push(IppAttribute::new(
                "printer-supply-description",
                IppValue::Array(data.marker_names.iter().cloned().map(IppValue::TextWithoutLanguage).collect()),
            ));
        }

        let mut dst = ipp::attribute::IppAttributes::new();
        IppFilter::copy_built(&mut dst, attrs, requested, ipp::model::DelimiterTag::PrinterAttributes);
        dst.groups_of(ipp::model::DelimiterTag::PrinterAttributes)
            .flat_map(|g| g.attributes().values().cloned())
            .collect()
    }

    /// Vendor/setter map used by `setAttributes`'s apply stage, keyed by the
    /// canonical settable-attribute name (§6 "Configuration keys").
    pub fn settable_keys() -> &'static [&'static str] {
        &[
            "copies-default",
            "label-mode-configured",
            "label-tear-off-configured",
            "media-col-default",
            "media-col-ready",
            "media-default",
            "media-ready",
            "multiple-document-handling-default",
            "orientation-requested-default",
            "output-bin-default",
            "print-color-mode-default",
            "print-content-optimize-default",
            "print-darkness-default",
            "print-quality-default",
            "print-speed-default",
            "printer-contact-col",
            "printer-darkness-configured",
            "printer-geo-location",
            "printer-location",
            "printer-organization",
            "printer-organizational-unit",
            "printer-resolution-default",
            "printer-wifi-password",
            "printer-wifi-ssid",
            "sides-default",
        ]
    }

    /// `identify-actions` default `none` keyword helper used in a couple of
    /// handler responses.
    pub async fn identify_actions_default(&self) -> IdentifyActions {
        self.driver_data.read().await.identify_actions_default
    }

    pub async fn set_runtime_state(&self, new_state: PrinterState) {
        let mut guard = self.state.write().await;
        guard.state = new_state;
        guard.state_time = Instant::now();
    }

    pub async fn insert_state_reason(&self, reason: PrinterStateReasons) {
        let mut guard = self.state.write().await;
        guard.reasons.insert(reason);
    }

    pub async fn remove_state_reason(&self, reason: PrinterStateReasons) {
        let mut guard = self.state.write().await;
        guard.reasons.remove(reason);
    }

    /// True once at least one proxy endpoint has registered itself via
    /// Update-Output-Device-Attributes, switching `Identify-Printer` from
    /// the direct driver callback to the pending-queue path.
    pub async fn is_proxy(&self) -> bool {
        !self.output_devices.read().await.is_empty()
    }

    /// Find-or-create the `OutputDevice` entry for `uuid`, returning the
    /// index so callers can re-acquire the lock without a second scan.
    async fn output_device_index(devices: &mut Vec<OutputDevice>, uuid: Uuid) -> usize {
        if let Some(i) = devices.iter().position(|d| d.uuid == uuid) {
            return i;
        }
        devices.push(OutputDevice::new(uuid));
        devices.len() - 1
    }

    /// `Update-Output-Device-Attributes` (§4.7): registers `uuid` if this is
    /// its first contact and applies every `name`/`value` pair (sparse or
    /// wholesale, per `OutputDevice::apply_attribute`).
    pub async fn update_output_device_attributes(&self, uuid: Uuid, attrs: Vec<(String, IppValue)>) {
        let mut devices = self.output_devices.write().await;
        let i = Self::output_device_index(&mut devices, uuid).await;
        for (name, value) in attrs {
            devices[i].apply_attribute(&name, value);
        }
    }

    /// `Identify-Printer` in proxy mode: queue the action/message on every
    /// registered output device instead of calling the driver directly, and
    /// raise `identify-printer-requested` until every device acknowledges.
    pub async fn queue_identify(&self, actions: IdentifyActions, message: &str) {
        let mut devices = self.output_devices.write().await;
        for device in devices.iter_mut() {
            device.pending_identify = Some((actions, message.to_string()));
        }
        drop(devices);
        self.insert_state_reason(PrinterStateReasons::IDENTIFY_PRINTER_REQUESTED).await;
    }

    /// `Acknowledge-Identify-Printer` (§4.7): drains one device's pending
    /// identify action, clearing the printer-wide state reason once no
    /// device has anything left pending.
    pub async fn acknowledge_identify(&self, uuid: Uuid) -> Option<(IdentifyActions, String)> {
        let mut devices = self.output_devices.write().await;
        let drained = devices.iter_mut().find(|d| d.uuid == uuid).and_then(|d| d.pending_identify.take());
        let still_pending = devices.iter().any(|d| d.pending_identify.is_some());
        drop(devices);
        if !still_pending {
            self.remove_state_reason(PrinterStateReasons::IDENTIFY_PRINTER_REQUESTED).await;
        }
        drained
    }

    /// `Update-Active-Jobs` (§4.7): apply the device's view of `updates`
    /// (job-id, state) to this printer's jobs, except where the local job
    /// is already terminal — those are returned for reconciliation instead
    /// of being overwritten. Also returns the ids of any non-terminal local
    /// job not present in `updates`, so the device can fetch it.
    pub async fn update_active_jobs(&self, updates: &[(i32, JobState)]) -> (Vec<(i32, JobState)>, Vec<i32>) {
        let mut rejected = Vec::new();
        let client_ids: std::collections::HashSet<i32> = updates.iter().map(|(id, _)| *id).collect();
        for (job_id, new_state) in updates {
            if let Some(job_ref) = self.find_job(*job_id).await {
                let mut job = job_ref.write().await;
                if job.state().is_terminal() {
                    rejected.push((*job_id, job.state()));
                } else {
                    job.set_state(*new_state);
                }
            }
        }

        let mut newer = Vec::new();
        for job in self.all_jobs.read().await.iter() {
            let job = job.read().await;
            if !job.state().is_terminal() && !client_ids.contains(&job.id) {
                newer.push(job.id);
            }
        }
        (rejected, newer)
    }

    pub async fn config(&self) -> PrinterConfig {
        self.config.read().await.clone()
    }

    /// `validateDocumentAttributes`'s format half: resolve the requested
    /// `document-format` against the driver's supported list, defaulting to
    /// `document-format-default` when the client omits it.
    pub async fn resolve_document_format(&self, requested: Option<&str>) -> Result<String, IppError> {
        let data = self.driver_data.read().await;
        match requested {
            None => Ok(data.format.clone()),
            Some(fmt) if fmt == "application/octet-stream" || data.document_format_supported.iter().any(|f| f == fmt) => Ok(fmt.to_string()),
            Some(fmt) => Err(IppError::new(
                ipp::model::StatusCode::ClientErrorDocumentFormatNotSupported,
                format!("document format \"{fmt}\" is not supported"),
            )),
        }
    }

    async fn bump_config_time(&self) {
        self.state.write().await.config_time = Instant::now();
    }

    /// `validateDocumentAttributes`'s attribute-fidelity half (§4.4): check
    /// every job-template attribute in `attrs`'s Job-Attributes group against
    /// the driver's supported set. When `fidelity` is true (the client set
    /// `ipp-attribute-fidelity=true`, or the operation is Validate-Job), any
    /// unsupported attribute rejects the whole request; otherwise unsupported
    /// attributes are removed from `attrs` and returned so the caller can
    /// echo them in the response's Unsupported-Attributes group.
    pub async fn validate_job_template_attributes(&self, attrs: &mut IppAttributes, fidelity: bool) -> Result<Vec<IppAttribute>, IppError> {
        let data = self.driver_data.read().await;
        let mut ignored = Vec::new();
        for group in attrs.groups_mut() {
            if group.tag() != DelimiterTag::JobAttributes {
                continue;
            }
            let bad_names: Vec<String> = group
                .attributes()
                .iter()
                .filter(|(name, attr)| !job_template_attr_supported(name, attr.value(), &data))
                .map(|(name, _)| name.clone())
                .collect();
            for name in bad_names {
                if let Some(attr) = group.attributes_mut().remove(&name) {
                    ignored.push(attr);
                }
            }
        }
        if fidelity && !ignored.is_empty() {
            return Err(IppError::attributes_or_values("one or more job-template attributes not supported"));
        }
        Ok(ignored)
    }

    /// `setAttributes`: preflight + apply against local copies of the
    /// driver-data record and the printer config, then commit both under
    /// write-lock only if every attribute validated (§4.5 "Any failure
    /// rolls back by returning false without committing subsequent
    /// stages"). Identity-defining attributes are skipped when `creating`
    /// is true, since CreatePrinter's caller has already consumed them from
    /// the operation-attributes group. Returns the attributes that failed
    /// validation so the caller can echo them in the unsupported group.
    pub async fn set_attributes(&self, attrs: &IppAttributes, creating: bool, client_is_loopback: bool) -> Result<(), (IppError, Vec<IppAttribute>)> {
        let mut data = self.driver_data.read().await.clone();
        let mut cfg = self.config.read().await.clone();
        let mut unsupported = Vec::new();

        for group in attrs.groups_of(DelimiterTag::PrinterAttributes) {
            for (name, attr) in group.attributes() {
                if creating && matches!(name.as_str(), "printer-name" | "printer-device-id" | "device-uri" | "driver") {
                    continue;
                }
                if apply_one(name, attr.value(), &mut data, &mut cfg, client_is_loopback).is_err() {
                    unsupported.push(attr.clone());
                }
            }
        }

        if !unsupported.is_empty() {
            return Err((IppError::attributes_or_values("one or more attributes not supported"), unsupported));
        }

        *self.driver_data.write().await = data;
        *self.config.write().await = cfg;
        self.bump_config_time().await;
        Ok(())
    }
}

/// Validate and apply one printer-group attribute to local copies of the
/// driver data and config; `Err(())` means the name/type/range was rejected
/// (§4.5 preflight+apply, collapsed into one pass since Rust's local-copy
/// mutation already gives us the rollback-on-error property for free).
fn apply_one(name: &str, value: &IppValue, data: &mut DriverData, cfg: &mut PrinterConfig, client_is_loopback: bool) -> Result<(), ()> {
    match name {
        "copies-default" => {
            let v = value.as_integer().copied().ok_or(())?;
            if v < data.copies_supported.0 || v > data.copies_supported.1 {
                return Err(());
            }
            data.copies_default = v;
        }
        "print-quality-default" => {
            let v = value.as_integer().copied().ok_or(())?;
            if !data.quality_supported.contains(&v) {
                return Err(());
            }
            data.quality_default = v;
        }
        "sides-default" => {
            let v = value.as_keyword().cloned().ok_or(())?;
            if !data.sides_supported.contains(&v) {
                return Err(());
            }
            data.sides_default = v;
        }
        "print-color-mode-default" => {
            let v = value.as_keyword().cloned().ok_or(())?;
            if !data.color_mode_supported.contains(&v) {
                return Err(());
            }
            data.color_mode_default = v;
        }
        "media-default" => {
            let v = value.as_keyword().cloned().ok_or(())?;
            if !data.media_supported.contains(&v) {
                return Err(());
            }
            data.media_default = v;
        }
        "media-col-default" => {
            if !matches!(value, IppValue::Collection(_)) {
                return Err(());
            }
            data.media_col_default = Some(MediaCollection::from_ipp_value(value));
        }
        "media-ready" | "media-col-ready" => {
            data.media_ready = value.into_iter().map(media_entry).collect();
        }
        "orientation-requested-default" => {
            let v = value.as_integer().copied().ok_or(())?;
            let orientation = PageOrientation::try_from(v).map_err(|_| ())?;
            if !data.orientation_supported.contains(&orientation) {
                return Err(());
            }
            data.orientation_default = Some(orientation);
        }
        "output-bin-default" => {
            let v = value.as_keyword().cloned().ok_or(())?;
            if !data.output_bin_supported.contains(&v) {
                return Err(());
            }
            data.output_bin_default = v;
        }
        "print-content-optimize-default" => {
            let v = value.as_keyword().cloned().ok_or(())?;
            if !data.content_optimize_supported.is_empty() && !data.content_optimize_supported.contains(&v) {
                return Err(());
            }
            data.content_optimize_default = Some(v);
        }
        "print-darkness-default" => {
            let v = value.as_integer().copied().ok_or(())?;
            data.darkness_default = v;
        }
        "printer-darkness-configured" => {
            let v = value.as_integer().copied().ok_or(())?;
            data.darkness_configured = v;
        }
        "print-speed-default" => {
            let v = value.as_integer().copied().ok_or(())?;
            if !data.speed_supported.is_empty() && !data.speed_supported.contains(&v) {
                return Err(());
            }
            data.speed_default = Some(v);
        }
        "label-mode-configured" => {
            let v = value.as_keyword().cloned().ok_or(())?;
            if !data.label_mode_supported.is_empty() && !data.label_mode_supported.contains(&v) {
                return Err(());
            }
            data.label_mode_configured = Some(v);
        }
        "label-tear-off-configured" => {
            let v = value.as_integer().copied().ok_or(())?;
            data.label_tear_off_configured = Some(v);
        }
        "printer-resolution-default" => {
            let resolution = crate::model::Resolution::try_from(value.clone()).map_err(|_| ())?;
            if !data.resolution_supported.is_empty() && !data.resolution_supported.contains(&resolution) {
                return Err(());
            }
            data.resolution_default = Some(resolution);
        }
        "multiple-document-handling-default" => {
            data.multiple_document_handling_default = Some(value.as_keyword().cloned().ok_or(())?);
        }
        "printer-contact-col" => {
            let IppValue::Collection(members) = value else { return Err(()) };
            cfg.contact_name = members.get("contact-name").and_then(IppValue::as_keyword).cloned();
        }
        "printer-geo-location" => {
            let v = value.as_uri().cloned().ok_or(())?;
            validate_geo_location(&v).map_err(|_| ())?;
            cfg.geo_location = Some(v);
        }
        "printer-location" => {
            cfg.location = value.as_keyword().cloned().or_else(|| text_value(value)).ok_or(())?;
        }
        "printer-organization" => {
            cfg.organization = text_value(value).ok_or(())?;
        }
        "printer-organizational-unit" => {
            cfg.organizational_unit = text_value(value).ok_or(())?;
        }
        "printer-wifi-ssid" => {
            if !client_is_loopback {
                return Err(());
            }
            cfg.wifi_ssid = Some(value.as_keyword().cloned().or_else(|| text_value(value)).ok_or(())?);
        }
        "printer-wifi-password" => {
            if !client_is_loopback {
                return Err(());
            }
            let _ = text_value(value).ok_or(())?;
        }
        _ if name.ends_with("-default") => {
            let v = value.as_keyword().cloned().or_else(|| text_value(value)).ok_or(())?;
            data.vendor_defaults.insert(name.trim_end_matches("-default").to_string(), v);
        }
        _ => return Err(()),
    }
    Ok(())
}

/// Whether `name=value` is an acceptable job-template attribute for this
/// driver. Unrecognised names are left to other validation (set-attributes,
/// the attribute codec) and pass here.
fn job_template_attr_supported(name: &str, value: &IppValue, data: &DriverData) -> bool {
    match name {
        "copies" => value.as_integer().is_some_and(|v| *v >= data.copies_supported.0 && *v <= data.copies_supported.1),
        "media" => value.as_keyword().is_some_and(|v| data.media_supported.contains(v)),
        "sides" => value.as_keyword().is_some_and(|v| data.sides_supported.contains(v)),
        "print-color-mode" => value.as_keyword().is_some_and(|v| data.color_mode_supported.contains(v)),
        "print-quality" => value.as_integer().is_some_and(|v| data.quality_supported.contains(v)),
        "orientation-requested" => value
            .as_integer()
            .and_then(|v| PageOrientation::try_from(*v).ok())
            .is_some_and(|o| data.orientation_supported.contains(&o)),
        "output-bin" => value.as_keyword().is_some_and(|v| data.output_bin_supported.contains(v)),
        "page-ranges" => data.page_ranges_supported,
        _ => true,
    }
}

fn media_entry(value: IppValue) -> MediaCollection {
    match &value {
        IppValue::Collection(_) => MediaCollection::from_ipp_value(&value),
        IppValue::Keyword(name) => MediaCollection {
            size_name: Some(name.clone()),
            ..MediaCollection::default()
        },
        _ => MediaCollection::default(),
    }
}

fn text_value(value: &IppValue) -> Option<String> {
    match value {
        IppValue::TextWithoutLanguage(s) => Some(s.clone()),
        IppValue::NameWithoutLanguage(s) => Some(s.clone()),
        _ => None,
    }
}

/// Per-printer settable attribute table, used by the set-attributes
/// preflight pass in `crate::handlers::printer_handlers`.
pub fn vendor_key_table() -> HashMap<&'static str, &'static str> {
    HashMap::from([("label-mode-configured", "keyword"), ("printer-resolution-default", "resolution")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NullDriver;

    async fn test_printer() -> Printer {
        let driver = Arc::new(NullDriver { format: "application/pdf".to_string() });
        let data = driver.init("file:///dev/null").await.unwrap();
        Printer::new(
            1,
            "p1".to_string(),
            "/ipp/print/p1".to_string(),
            "file:///dev/null".to_string(),
            "dummy".to_string(),
            driver,
            data,
            1,
        )
    }

    #[tokio::test]
    async fn idle_stop_request_reports_paused() {
        let printer = test_printer().await;
        printer.is_stopped.store(true, Ordering::Release);
        let reasons = printer.state_reasons().await;
        assert!(reasons.contains(PrinterStateReasons::PAUSED));
        assert!(!reasons.contains(PrinterStateReasons::MOVING_TO_PAUSED));
    }

    #[tokio::test]
    async fn stop_request_while_processing_reports_moving_to_paused() {
        let printer = test_printer().await;
        printer.is_stopped.store(true, Ordering::Release);
        *printer.processing_job.write().await = Some(1);
        let reasons = printer.state_reasons().await;
        assert!(reasons.contains(PrinterStateReasons::MOVING_TO_PAUSED));
        assert!(!reasons.contains(PrinterStateReasons::PAUSED));
    }

    #[tokio::test]
    async fn copy_attributes_advertises_page_ranges_and_xri() {
        let printer = test_printer().await;
        let requested = RequestedAttributes::all();
        let attrs = printer.copy_attributes("http://localhost", &requested).await;
        let names: Vec<&str> = attrs.iter().map(|a| a.name()).collect();
        assert!(names.contains(&"page-ranges-supported"));
        assert!(names.contains(&"printer-xri-supported"));
        assert!(names.contains(&"printer-more-info"));
    }

    #[tokio::test]
    async fn registering_an_output_device_enables_proxy_mode() {
        let printer = test_printer().await;
        assert!(!printer.is_proxy().await);
        printer.update_output_device_attributes(Uuid::nil(), vec![("output-device-name".to_string(), IppValue::NameWithoutLanguage("proxy-1".to_string()))]).await;
        assert!(printer.is_proxy().await);
    }

    #[tokio::test]
    async fn queue_identify_then_acknowledge_clears_state_reason() {
        let printer = test_printer().await;
        printer.update_output_device_attributes(Uuid::nil(), vec![]).await;
        printer.queue_identify(IdentifyActions::DISPLAY, "hello").await;
        assert!(printer.state_reasons().await.contains(PrinterStateReasons::IDENTIFY_PRINTER_REQUESTED));

        let acked = printer.acknowledge_identify(Uuid::nil()).await;
        assert_eq!(acked, Some((IdentifyActions::DISPLAY, "hello".to_string())));
        assert!(!printer.state_reasons().await.contains(PrinterStateReasons::IDENTIFY_PRINTER_REQUESTED));
    }

    #[tokio::test]
    async fn update_active_jobs_reconciles_terminal_jobs_and_reports_newer_ones() {
        let printer = test_printer().await;
        let held = printer.create_job("alice".to_string(), None, IppAttributes::new()).await.unwrap();
        let job_ref = printer.find_job(held).await.unwrap();
        job_ref.write().await.set_state(JobState::Completed);
        let unseen = printer.create_job("bob".to_string(), None, IppAttributes::new()).await.unwrap();

        let (rejected, newer) = printer.update_active_jobs(&[(held, JobState::Processing)]).await;
        assert_eq!(rejected, vec![(held, JobState::Completed)]);
        assert_eq!(newer, vec![unseen]);
    }
}
