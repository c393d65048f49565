use anyhow::Result;
use embedded_svc::http::Method;
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::ota::EspOta;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::OtaWindow;

const CHUNK_SIZE: usize = 2048;

/// HTTP upload endpoint for firmware images, open only while the
/// window is.
pub struct OtaServer {
    _server: EspHttpServer<'static>,
}

impl OtaServer {
    pub fn start(hostname: &str, window: Arc<Mutex<OtaWindow>>, boot: Instant) -> Result<Self> {
        let mut server = EspHttpServer::new(&Configuration::default())?;

        let identity = hostname.to_string();
        server.fn_handler("/", Method::Get, move |req| {
            req.into_ok_response()?.write_all(identity.as_bytes())
        })?;

        server.fn_handler::<anyhow::Error, _>("/update", Method::Post, move |mut req| {
            let now_ms = boot.elapsed().as_millis() as u64;
            let open = window
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_open(now_ms);
            if !open {
                log::warn!("OTA: Upload refused, window closed");
                req.into_status_response(403)?
                    .write_all(b"OTA window closed")?;
                return Ok(());
            }

            log::info!("OTA: Receiving firmware image...");
            let mut ota = EspOta::new()?;
            let mut update = ota.initiate_update()?;
            let mut buf = [0u8; CHUNK_SIZE];
            let mut total = 0usize;

            loop {
                let n = req.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                if let Err(e) = update.write_all(&buf[..n]) {
                    log::warn!("OTA: Write failed after {} bytes", total);
                    update.abort()?;
                    return Err(e.into());
                }
                total += n;
            }

            update.complete()?;
            log::info!("OTA: Image of {} bytes written, restarting", total);
            req.into_ok_response()?.write_all(b"OK, restarting")?;

            esp_idf_svc::hal::reset::restart();
        })?;

        log::info!("OTA: Listening as '{}' on /update", hostname);
        Ok(Self { _server: server })
    }
}
