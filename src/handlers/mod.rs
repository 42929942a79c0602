//! Per-operation request handlers, split by the object that owns the
//! operation (§4.7 of the design): System-scoped and Printer/Job-scoped.

pub mod printer_handlers;
pub mod system_handlers;

use futures::io::AsyncReadExt;
use http::request::Parts as ReqParts;
use ipp::payload::IppPayload;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Reassemble the scheme/host the client used, for composing absolute
/// `printer-uri-supported`/`job-uri` values in responses.
pub(crate) fn base_url(head: &ReqParts) -> String {
    let scheme = head.uri.scheme_str().unwrap_or("ipp");
    let authority = head
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{authority}")
}

/// Drains an already-decoded IPP document payload into a spool file. The
/// payload is whatever the `ipp` crate's async parser attached to the
/// request (plain or decompressed via `crate::utils::decommpress_payload`).
pub(crate) async fn drain_payload(mut payload: IppPayload, path: &Path) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut buf = [0u8; 8192];
    loop {
        let n = payload.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        file.write_all(&buf[..n]).await?;
    }
}

/// §3 invariant: a job's spool file is removed once it reaches a terminal
/// state. Called after the job's write-lock has been released, since
/// filesystem I/O must never run while holding it (§5).
pub(crate) async fn cleanup_spool_file(path: Option<PathBuf>) {
    if let Some(path) = path {
        let _ = tokio::fs::remove_file(&path).await;
    }
}
