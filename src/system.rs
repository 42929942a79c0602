use crate::driver::Driver;
use crate::error::IppError;
use crate::printer::Printer;
use futures_locks::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// `auth_cb` (§6 "authentication backend"): an external collaborator invoked
/// by the System to decide whether `requesting_user` may perform a
/// System-scoped operation (CreatePrinter/DeletePrinter). No callback
/// registered is the default-permit posture used by the bootstrap binary.
pub type AuthFn = dyn Fn(&str) -> bool + Send + Sync;

/// Static identity and policy for the process, read once at startup from
/// `crate::config` and otherwise immutable (§3 "System" identity fields).
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub name: String,
    pub hostname: String,
    pub spool_dir: PathBuf,
    pub multi_queue: bool,
}

impl Default for SystemInfo {
    fn default() -> SystemInfo {
        SystemInfo {
            name: "ippd".to_string(),
            hostname: "localhost".to_string(),
            spool_dir: std::env::temp_dir(),
            multi_queue: true,
        }
    }
}

/// The four independently-settable `system-*` fields (§9 open question:
/// location/organization/unit/geo-location are four distinct setters, never
/// conflated).
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub location: String,
    pub organization: String,
    pub organizational_unit: String,
    pub geo_location: Option<String>,
}

/// The process-wide registry of printers and global state (§3 "System").
/// Subscriptions, resources and the proxy/output-device scenario are out of
/// scope per the distilled spec's Non-goals and are not modelled here.
pub struct System {
    pub info: SystemInfo,
    pub uuid: Uuid,
    config: RwLock<SystemConfig>,

    printers: RwLock<Vec<Arc<Printer>>>,
    next_printer_id: AtomicI32,
    default_printer_id: AtomicI32,

    config_changes: AtomicI32,
    start_time: Instant,
    pub is_running: AtomicBool,

    drivers: RwLock<std::collections::HashMap<String, Arc<dyn Driver>>>,
    auth_callback: RwLock<Option<Arc<AuthFn>>>,
}

impl System {
    pub fn new(info: SystemInfo) -> System {
        System {
            info,
            uuid: Uuid::new_v4(),
            config: RwLock::new(SystemConfig::default()),
            printers: RwLock::new(Vec::new()),
            next_printer_id: AtomicI32::new(1),
            default_printer_id: AtomicI32::new(0),
            config_changes: AtomicI32::new(0),
            start_time: Instant::now(),
            is_running: AtomicBool::new(true),
            drivers: RwLock::new(std::collections::HashMap::new()),
            auth_callback: RwLock::new(None),
        }
    }

    /// Register the `auth_cb` collaborator. Replaces any previously
    /// registered callback.
    pub async fn register_auth_callback(&self, cb: Arc<AuthFn>) {
        *self.auth_callback.write().await = Some(cb);
    }

    /// `authorize`: called at the top of every System-scoped operation that
    /// requires auth (CreatePrinter, DeletePrinter). Permits everyone when no
    /// callback is registered.
    pub async fn authorize(&self, requesting_user: &str) -> Result<(), IppError> {
        match self.auth_callback.read().await.as_ref() {
            Some(cb) if !cb(requesting_user) => Err(IppError::not_authorized()),
            _ => Ok(()),
        }
    }

    pub fn uptime(&self) -> i32 {
        self.start_time.elapsed().as_secs() as i32
    }

    pub fn config_changes(&self) -> i32 {
        self.config_changes.load(Ordering::Acquire)
    }

    fn bump_config_changes(&self) {
        self.config_changes.fetch_add(1, Ordering::AcqRel);
    }

    pub fn default_printer_id(&self) -> i32 {
        self.default_printer_id.load(Ordering::Acquire)
    }

    pub fn set_default_printer_id(&self, id: i32) {
        self.default_printer_id.store(id, Ordering::Release);
        self.bump_config_changes();
    }

    /// Register a named driver implementation, looked up by `driver-name` at
    /// CreatePrinter time. Mirrors `driver_cb` registration in the source.
    pub async fn register_driver(&self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.write().await.insert(name.into(), driver);
    }

    pub async fn find_driver(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.read().await.get(name).cloned()
    }

    pub async fn printers(&self) -> Vec<Arc<Printer>> {
        self.printers.read().await.clone()
    }

    pub async fn find_printer_by_id(&self, id: i32) -> Option<Arc<Printer>> {
        self.printers.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn find_printer_by_resource(&self, resource_path: &str) -> Option<Arc<Printer>> {
        self.printers.read().await.iter().find(|p| p.resource_path == resource_path).cloned()
    }

    pub async fn find_printer_by_name(&self, name: &str) -> Option<Arc<Printer>> {
        self.printers.read().await.iter().find(|p| p.name == name).cloned()
    }

    /// `CreatePrinter`: allocate a printer id, build static driver data via
    /// `driver_cb`, register it, and return the shared handle so the caller
    /// (the CreatePrinter handler) can spawn its scheduler/raw-listener tasks.
    pub async fn create_printer(
        &self,
        name: String,
        device_uri: String,
        driver_name: String,
        max_active_jobs: usize,
    ) -> Result<Arc<Printer>, IppError> {
        if !self.info.multi_queue {
            return Err(IppError::not_possible("system does not have the MULTI_QUEUE option, so CreatePrinter is not available"));
        }

        let driver = self
            .find_driver(&driver_name)
            .await
            .ok_or_else(|| IppError::attributes_or_values(format!("unknown driver \"{driver_name}\"")))?;

        {
            let printers = self.printers.read().await;
            if printers.iter().any(|p| p.name == name) {
                return Err(IppError::not_possible(format!("printer \"{name}\" already exists")));
            }
        }

        let driver_data = driver
            .init(&device_uri)
            .await
            .map_err(|e| IppError::attributes_or_values(format!("driver cannot be used: {e}")))?;

        let id = self.next_printer_id.fetch_add(1, Ordering::Relaxed);
        let resource_path = format!("/ipp/print/{name}");

        let printer = Arc::new(Printer::new(id, name, resource_path, device_uri, driver_name, driver, driver_data, max_active_jobs));

        let mut printers = self.printers.write().await;
        if self.default_printer_id() == 0 {
            self.set_default_printer_id(id);
        }
        printers.push(printer.clone());
        self.bump_config_changes();
        Ok(printer)
    }

    /// `DeletePrinter`: immediate when idle, deferred (`is_deleted`) while a
    /// job is processing; the scheduler performs the deferred removal.
    pub async fn delete_printer(&self, id: i32) -> Result<bool, IppError> {
        let printer = self
            .find_printer_by_id(id)
            .await
            .ok_or_else(|| IppError::not_found(format!("no such printer {id}")))?;

        printer.is_deleted.store(true, Ordering::Release);
        if printer.processing_job.read().await.is_some() {
            return Ok(false);
        }
        self.remove_printer(id).await;
        Ok(true)
    }

    /// Called by the scheduler once a deferred deletion's last job has
    /// finished processing.
    pub async fn remove_printer(&self, id: i32) {
        let mut printers = self.printers.write().await;
        printers.retain(|p| p.id != id);
        if self.default_printer_id() == id {
            self.default_printer_id.store(printers.first().map_or(0, |p| p.id), Ordering::Release);
        }
        drop(printers);
        self.bump_config_changes();
    }

    pub async fn config(&self) -> SystemConfig {
        self.config.read().await.clone()
    }

    /// Four distinct setters, deliberately never conflated (§9 open question).
    pub async fn set_location(&self, location: String) {
        self.config.write().await.location = location;
        self.bump_config_changes();
    }

    pub async fn set_organization(&self, organization: String) {
        self.config.write().await.organization = organization;
        self.bump_config_changes();
    }

    pub async fn set_organizational_unit(&self, unit: String) {
        self.config.write().await.organizational_unit = unit;
        self.bump_config_changes();
    }

    /// `geo:lat,lon` with −90≤lat≤90, −180≤lon≤180; rejects out-of-range
    /// coordinates rather than silently clamping them.
    pub async fn set_geo_location(&self, geo: String) -> Result<(), IppError> {
        validate_geo_location(&geo)?;
        self.config.write().await.geo_location = Some(geo);
        self.bump_config_changes();
        Ok(())
    }
}

/// Syntactic and range validation for `printer-geo-location`/`system-geo-location`
/// values of the form `geo:lat,lon`.
pub fn validate_geo_location(value: &str) -> Result<(), IppError> {
    let coords = value
        .strip_prefix("geo:")
        .ok_or_else(|| IppError::attributes_or_values("geo-location must start with \"geo:\""))?;
    let (lat, lon) = coords
        .split_once(',')
        .ok_or_else(|| IppError::attributes_or_values("geo-location must be \"geo:lat,lon\""))?;
    let lat: f64 = lat.trim().parse().map_err(|_| IppError::attributes_or_values("invalid latitude"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| IppError::attributes_or_values("invalid longitude"))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(IppError::attributes_or_values("latitude out of range"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(IppError::attributes_or_values("longitude out of range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NullDriver;

    async fn system_with_dummy_driver() -> System {
        let system = System::new(SystemInfo::default());
        system.register_driver("dummy", Arc::new(NullDriver { format: "application/pdf".to_string() })).await;
        system
    }

    #[tokio::test]
    async fn create_printer_assigns_increasing_ids_and_a_default() {
        let system = system_with_dummy_driver().await;
        let p1 = system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap();
        let p2 = system.create_printer("p2".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap();
        assert_eq!(p1.id, 1);
        assert_eq!(p2.id, 2);
        assert_eq!(system.default_printer_id(), 1);
    }

    #[tokio::test]
    async fn create_printer_rejects_duplicate_names() {
        let system = system_with_dummy_driver().await;
        system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap();
        let err = system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap_err();
        assert_eq!(err.code, ipp::model::StatusCode::ClientErrorNotPossible);
    }

    #[tokio::test]
    async fn create_printer_rejects_unknown_driver() {
        let system = System::new(SystemInfo::default());
        let err = system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "bogus".to_string(), 1).await.unwrap_err();
        assert_eq!(err.code, ipp::model::StatusCode::ClientErrorAttributesOrValuesNotSupported);
    }

    #[tokio::test]
    async fn delete_printer_is_immediate_when_idle() {
        let system = system_with_dummy_driver().await;
        let p1 = system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap();
        let deleted_now = system.delete_printer(p1.id).await.unwrap();
        assert!(deleted_now);
        assert!(system.find_printer_by_id(p1.id).await.is_none());
    }

    #[tokio::test]
    async fn delete_printer_is_deferred_while_processing() {
        let system = system_with_dummy_driver().await;
        let p1 = system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap();
        *p1.processing_job.write().await = Some(1);
        let deleted_now = system.delete_printer(p1.id).await.unwrap();
        assert!(!deleted_now);
        assert!(p1.is_deleted.load(Ordering::Acquire));
        assert!(system.find_printer_by_id(p1.id).await.is_some());
    }

    #[tokio::test]
    async fn create_printer_rejects_when_multi_queue_disabled() {
        let system = System::new(SystemInfo {
            multi_queue: false,
            ..SystemInfo::default()
        });
        system.register_driver("dummy", Arc::new(NullDriver { format: "application/pdf".to_string() })).await;
        let err = system.create_printer("p1".to_string(), "file:///dev/null".to_string(), "dummy".to_string(), 1).await.unwrap_err();
        assert_eq!(err.code, ipp::model::StatusCode::ClientErrorNotPossible);
    }

    #[tokio::test]
    async fn authorize_permits_everyone_by_default() {
        let system = system_with_dummy_driver().await;
        assert!(system.authorize("alice").await.is_ok());
    }

    #[tokio::test]
    async fn authorize_rejects_users_the_callback_denies() {
        let system = system_with_dummy_driver().await;
        system.register_auth_callback(Arc::new(|user: &str| user == "alice")).await;
        assert!(system.authorize("alice").await.is_ok());
        let err = system.authorize("mallory").await.unwrap_err();
        assert_eq!(err.code, ipp::model::StatusCode::ClientErrorNotAuthorized);
    }

    #[tokio::test]
    async fn set_geo_location_rejects_out_of_range_coordinates() {
        let system = system_with_dummy_driver().await;
        assert!(system.set_geo_location("geo:0,0".to_string()).await.is_ok());
        assert!(system.set_geo_location("geo:91,0".to_string()).await.is_err());
        assert!(system.set_geo_location("geo:0,-181".to_string()).await.is_err());
        assert_eq!(system.config().await.geo_location.as_deref(), Some("geo:0,0"));
    }
}
