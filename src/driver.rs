use crate::attrs::MediaCollection;
use crate::model::{IdentifyActions, PageOrientation, Resolution};
use std::collections::HashMap;
use std::path::Path;

/// Supported/default capability record for one printer (§3 "driver data
/// record"). Built once by `driver_cb` at CreatePrinter time and mutated in
/// place by `Printer::set_attributes`'s apply stage.
#[derive(Debug, Clone)]
pub struct DriverData {
    pub format: String,

    pub copies_supported: (i32, i32),
    pub copies_default: i32,

    pub media_supported: Vec<String>,
    pub media_default: String,
    pub media_ready: Vec<MediaCollection>,
    pub media_col_default: Option<MediaCollection>,
    pub borderless: bool,

    pub orientation_supported: Vec<PageOrientation>,
    pub orientation_default: Option<PageOrientation>,

    pub color_mode_supported: Vec<String>,
    pub color_mode_default: String,

    pub content_optimize_supported: Vec<String>,
    pub content_optimize_default: Option<String>,

    pub quality_supported: Vec<i32>,
    pub quality_default: i32,

    pub scaling_supported: Vec<String>,
    pub scaling_default: Option<String>,

    pub speed_supported: Vec<i32>,
    pub speed_default: Option<i32>,

    pub sides_supported: Vec<String>,
    pub sides_default: String,

    pub darkness_supported: i32,
    pub darkness_default: i32,
    pub darkness_configured: i32,

    pub label_mode_supported: Vec<String>,
    pub label_mode_configured: Option<String>,
    pub label_tear_off_configured: Option<i32>,

    pub resolution_supported: Vec<Resolution>,
    pub resolution_default: Option<Resolution>,

    pub output_bin_supported: Vec<String>,
    pub output_bin_default: String,

    pub sources_supported: Vec<String>,

    pub identify_actions_supported: IdentifyActions,
    pub identify_actions_default: IdentifyActions,

    pub page_ranges_supported: bool,
    pub multiple_document_handling_default: Option<String>,
    pub document_format_supported: Vec<String>,

    /// `<vendor>-default` keys accumulated from SetPrinterAttributes, keyed
    /// without the `-default` suffix.
    pub vendor_defaults: HashMap<String, String>,

    pub num_supply: usize,
    pub marker_names: Vec<String>,
    pub marker_types: Vec<String>,
    pub marker_colors: Vec<String>,
    pub marker_levels: Vec<i32>,
}

impl Default for DriverData {
    fn default() -> DriverData {
        DriverData {
            format: "application/pdf".to_string(),
            copies_supported: (1, 999),
            copies_default: 1,
            media_supported: vec!["iso_a4_210x297mm".to_string()],
            media_default: "iso_a4_210x297mm".to_string(),
            media_ready: Vec::new(),
            media_col_default: None,
            borderless: false,
            orientation_supported: vec![PageOrientation::Portrait],
            orientation_default: None,
            color_mode_supported: vec!["monochrome".to_string()],
            color_mode_default: "monochrome".to_string(),
            content_optimize_supported: Vec::new(),
            content_optimize_default: None,
            quality_supported: vec![3, 4, 5],
            quality_default: 4,
            scaling_supported: Vec::new(),
            scaling_default: None,
            speed_supported: Vec::new(),
            speed_default: None,
            sides_supported: vec!["one-sided".to_string()],
            sides_default: "one-sided".to_string(),
            darkness_supported: 0,
            darkness_default: 0,
            darkness_configured: 0,
            label_mode_supported: Vec::new(),
            label_mode_configured: None,
            label_tear_off_configured: None,
            resolution_supported: Vec::new(),
            resolution_default: None,
            output_bin_supported: vec!["face-down".to_string()],
            output_bin_default: "face-down".to_string(),
            sources_supported: Vec::new(),
            identify_actions_supported: IdentifyActions::NONE,
            identify_actions_default: IdentifyActions::NONE,
            page_ranges_supported: false,
            multiple_document_handling_default: None,
            document_format_supported: vec!["application/octet-stream".to_string(), "application/pdf".to_string()],
            vendor_defaults: HashMap::new(),
            num_supply: 0,
            marker_names: Vec::new(),
            marker_types: Vec::new(),
            marker_colors: Vec::new(),
            marker_levels: Vec::new(),
        }
    }
}

/// Outcome of a rendering pass, returned by `Driver::render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    /// The driver observed `job.is_canceled` and stopped cleanly.
    Canceled,
    /// The device rejected or failed on the job.
    Aborted,
}

/// The pluggable device-transport contract (§6 "Callbacks exposed to
/// embedders"). One instance is associated with each Printer by name at
/// CreatePrinter time. All methods are invoked without holding the
/// Printer's lock, per the reentrancy rule in §5.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// `driver_cb`: populate the initial capability record for a newly
    /// created printer from `device_uri`. Mandatory.
    async fn init(&self, device_uri: &str) -> anyhow::Result<DriverData>;

    /// `status_cb`: refresh live values (supply levels, door sensors). The
    /// default implementation is a no-op for drivers with nothing to poll.
    async fn status(&self, _data: &DriverData) -> anyhow::Result<()> {
        Ok(())
    }

    /// `identify_cb`: drive the physical identify action (beep, flash, etc).
    async fn identify(&self, actions: IdentifyActions, message: &str) -> anyhow::Result<()>;

    /// The rendering entry point invoked by the scheduler loop. `spool_path`
    /// is the already-closed, fully received document. Implementations must
    /// poll `is_canceled` between chunks of work.
    async fn render(&self, spool_path: &Path, format: Option<&str>, is_canceled: &(dyn Fn() -> bool + Send + Sync)) -> RenderOutcome;
}

/// `autoadd_cb`: map a discovered device to a driver name, or `None` if this
/// embedder doesn't recognise it.
pub type AutoAddFn = dyn Fn(&str, &str, &str) -> Option<String> + Send + Sync;

/// A minimal driver that accepts any document and reports success without
/// touching any device transport. Used by the bootstrap binary's "dummy"
/// printer and by tests that only exercise the IPP/job-lifecycle surface.
pub struct NullDriver {
    pub format: String,
}

#[async_trait::async_trait]
impl Driver for NullDriver {
    async fn init(&self, _device_uri: &str) -> anyhow::Result<DriverData> {
        Ok(DriverData {
            format: self.format.clone(),
            ..DriverData::default()
        })
    }

    async fn identify(&self, _actions: IdentifyActions, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn render(&self, _spool_path: &Path, _format: Option<&str>, is_canceled: &(dyn Fn() -> bool + Send + Sync)) -> RenderOutcome {
        if is_canceled() {
            RenderOutcome::Canceled
        } else {
            RenderOutcome::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_driver_completes_uncancelled_jobs() {
        let driver = NullDriver { format: "application/pdf".to_string() };
        let outcome = driver.render(Path::new("/tmp/x"), Some("application/pdf"), &|| false).await;
        assert_eq!(outcome, RenderOutcome::Completed);
    }

    #[tokio::test]
    async fn null_driver_reports_canceled_when_flag_set() {
        let driver = NullDriver { format: "application/pdf".to_string() };
        let outcome = driver.render(Path::new("/tmp/x"), None, &|| true).await;
        assert_eq!(outcome, RenderOutcome::Canceled);
    }

    #[tokio::test]
    async fn init_reports_configured_format() {
        let driver = NullDriver { format: "image/pwg-raster".to_string() };
        let data = driver.init("socket://localhost:9100").await.unwrap();
        assert_eq!(data.format, "image/pwg-raster");
    }
}
