use super::Printer;
use crate::job::Job;
use log::{info, warn};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

const ACCEPT_TIMEOUT: Duration = Duration::from_secs(1);
const SATURATED_BACKOFF: Duration = Duration::from_millis(100);
const ACTIVITY_WATCHDOG: Duration = Duration::from_secs(60);
const HANGUP_GRACE: Duration = Duration::from_secs(10);

/// `addRawListeners`/`runRaw`: the alternate ingest path on `9099 + printer_id`
/// that turns a bare byte stream into a job, for clients too old or too
/// simple to speak IPP. One task per bound socket family.
pub struct RawSocketIngest {
    port: u16,
}

impl RawSocketIngest {
    pub fn new(printer_id: i32) -> RawSocketIngest {
        RawSocketIngest { port: 9099 + printer_id as u16 }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Binds v4 and v6 listeners (best-effort; a bind failure here is not
    /// fatal to the printer per §5's non-fatal-error list) and spawns the
    /// accept loop. Returns immediately; the loop runs for the printer's
    /// lifetime.
    pub async fn spawn(self, printer: Arc<Printer>, spool_dir: PathBuf) {
        let v4 = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], self.port))).await;
        let v6 = TcpListener::bind(SocketAddr::from(([0u16, 0, 0, 0, 0, 0, 0, 1], self.port))).await;

        match &v4 {
            Ok(_) => info!("raw listener bound on 0.0.0.0:{}", self.port),
            Err(e) => warn!("raw listener failed to bind 0.0.0.0:{}: {e}", self.port),
        }
        match &v6 {
            Ok(_) => info!("raw listener bound on [::1]:{}", self.port),
            Err(e) => warn!("raw listener failed to bind [::1]:{}: {e}", self.port),
        }

        if let Ok(listener) = v4 {
            let printer = printer.clone();
            let spool_dir = spool_dir.clone();
            tokio::spawn(async move { accept_loop(listener, printer, spool_dir).await });
        }
        if let Ok(listener) = v6 {
            tokio::spawn(async move { accept_loop(listener, printer, spool_dir).await });
        }
    }
}

async fn accept_loop(listener: TcpListener, printer: Arc<Printer>, spool_dir: PathBuf) {
    loop {
        if printer.is_deleted.load(std::sync::atomic::Ordering::Acquire) {
            return;
        }
        if printer.max_active_jobs > 0 && printer.active_job_count().await >= printer.max_active_jobs {
            tokio::time::sleep(SATURATED_BACKOFF).await;
            continue;
        }

        match tokio::time::timeout(ACCEPT_TIMEOUT, listener.accept()).await {
            Ok(Ok((socket, addr))) => {
                let printer = printer.clone();
                let spool_dir = spool_dir.clone();
                tokio::spawn(async move { drain_connection(socket, addr, printer, spool_dir).await });
            }
            Ok(Err(e)) => {
                warn!("raw accept error: {e}");
            }
            Err(_) => {}
        }
    }
}

async fn drain_connection(mut socket: TcpStream, addr: SocketAddr, printer: Arc<Printer>, spool_dir: PathBuf) {
    let format = printer.driver_data.read().await.format.clone();
    let job_id = match printer.create_job("guest".to_string(), None, ipp::attribute::IppAttributes::new()).await {
        Ok(id) => id,
        Err(e) => {
            warn!("raw connection from {addr} rejected: {e}");
            return;
        }
    };
    let spool_path = Job::spool_file_path(&spool_dir, printer.id, job_id, 0, Some(&format));

    match drain_to_file(&mut socket, &spool_path).await {
        Ok(()) => {
            if let Some(job) = printer.find_job(job_id).await {
                job.write().await.submit_file(spool_path, Some(format));
            }
        }
        Err(e) => {
            warn!("raw connection from {addr} aborted: {e}");
            if let Some(job) = printer.find_job(job_id).await {
                job.write().await.set_state(crate::model::JobState::Aborted);
                let _ = tokio::fs::remove_file(&spool_path).await;
            }
        }
    }
}

async fn drain_to_file(socket: &mut TcpStream, spool_path: &PathBuf) -> io::Result<()> {
    let mut file = tokio::fs::File::create(spool_path).await?;
    let mut buf = [0u8; 8192];
    let mut last_activity = tokio::time::Instant::now();

    loop {
        let remaining = ACTIVITY_WATCHDOG.saturating_sub(last_activity.elapsed());
        let read = tokio::time::timeout(remaining.max(HANGUP_GRACE), socket.read(&mut buf)).await;
        match read {
            Ok(Ok(0)) => return Ok(()),
            Ok(Ok(n)) => {
                tokio::io::AsyncWriteExt::write_all(&mut file, &buf[..n]).await?;
                last_activity = tokio::time::Instant::now();
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(io::Error::new(io::ErrorKind::TimedOut, "raw ingest watchdog expired")),
        }
    }
}
