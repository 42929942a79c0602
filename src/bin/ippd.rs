//! Standalone bootstrap binary: reads `BootstrapConfig`, builds a `System`,
//! seeds its configured printers and serves IPP over HTTP. Everything here
//! is also reachable as a library (`System`, `IppDispatcher`, `server::serve_ipp`)
//! for embedders who want to drive the object model themselves instead of
//! running this binary.

use ippd::config::BootstrapConfig;
use ippd::dispatcher::IppDispatcher;
use ippd::driver::NullDriver;
use ippd::printer::{run_scheduler, RawSocketIngest};
use ippd::server::serve_ipp;
use ippd::system::{System, SystemInfo};
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "ippd.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::var("IPPD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match std::fs::read_to_string(&config_path) {
        Ok(text) => {
            log::info!("loading bootstrap config from \"{config_path}\"");
            BootstrapConfig::from_toml_str(&text)?
        }
        Err(e) => {
            log::warn!("no bootstrap config at \"{config_path}\" ({e}), using built-in defaults");
            BootstrapConfig::default()
        }
    };

    let system_info: SystemInfo = config.to_system_info();
    let system = Arc::new(System::new(system_info));

    // Embedders register their own `Driver` implementations; the bootstrap
    // binary only ships the no-op `NullDriver` so the daemon is useful
    // out of the box for testing the IPP surface without real hardware.
    system.register_driver("null", Arc::new(NullDriver { format: "application/pdf".to_string() }) as Arc<dyn ippd::driver::Driver>).await;

    for seed in &config.printers {
        let printer = system
            .create_printer(seed.name.clone(), seed.device_uri.clone(), seed.driver.clone(), seed.max_active_jobs)
            .await?;
        log::info!("seeded printer \"{}\" (id={})", printer.name, printer.id);
        tokio::spawn(run_scheduler(system.clone(), printer.clone()));
        let ingest = RawSocketIngest::new(printer.id);
        ingest.spawn(printer.clone(), system.info.spool_dir.clone()).await;
    }

    let dispatcher = Arc::new(IppDispatcher::new(system));
    let addr = SocketAddr::new(config.listen_addr, config.http_port);
    log::info!("listening on {addr}");
    serve_ipp(addr, dispatcher).await
}
