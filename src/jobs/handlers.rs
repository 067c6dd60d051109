//! # Handlers HTTP para Descargas
//! src/jobs/handlers.rs
//!
//! Implementa los endpoints:
//! - /fetch/<series_uid>
//! - /status/<series_uid>
//!
//! `fetch` responde apenas registra la descarga ("Download Started") y
//! recién después ejecuta el pipeline, en el mismo worker. El cliente
//! debe consultar `status` para ver cómo terminó.

use crate::fetch::{FetchFault, IO_FAULT_MESSAGE};
use crate::http::Response;
use crate::server::ServerContext;
use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info};

/// Handler para /status/<series_uid>
///
/// Los headers comunes los agrega quien envía la respuesta.
///
/// # Ejemplo de response
/// ```json
/// {"message":"Download Complete.","ok":true}
/// ```
pub fn status_handler(ctx: &ServerContext, series_uid: &str) -> Response {
    debug!(series_uid, "status requested");
    Response::json(&ctx.registry.status_json(series_uid))
}

/// Handler para /fetch/<series_uid>
///
/// Consume la conexión: escribe el estado inicial, la cierra y luego
/// bloquea hasta que el pipeline termina. Ningún error sale de acá; todos
/// terminan como estado de la serie en el registro.
pub fn fetch_handler<W: Write>(mut conn: W, ctx: &ServerContext, series_uid: &str) {
    let ticket = ctx
        .registry
        .begin_fetch(series_uid, ctx.allow_duplicate_fetches);

    let mut response = Response::json(&ticket.status().to_json());
    response.add_common_headers();
    let written = response.write_to(&mut conn);
    drop(conn);

    if let Err(e) = written {
        error!(series_uid, error = %e, "could not send fetch status");
        if ticket.is_started() {
            ctx.registry.set_failed(series_uid, IO_FAULT_MESSAGE);
        }
        return;
    }

    if !ticket.is_started() {
        info!(series_uid, "fetch already in progress, not starting another");
        return;
    }

    run_pipeline(ctx, series_uid);
}

/// Ejecuta el pipeline y deja el resultado en el registro
fn run_pipeline(ctx: &ServerContext, series_uid: &str) {
    info!(series_uid, dir = %ctx.download_dir.display(), "fetching series");

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        ctx.pipeline.fetch(series_uid, &ctx.download_dir)
    }))
    .unwrap_or_else(|payload| Err(FetchFault::Unknown(panic_message(payload.as_ref()))));

    match result {
        Ok(report) => {
            info!(series_uid, files = report.files, "fetch complete");
            ctx.registry.set_done(series_uid);
        }
        Err(fault) => {
            error!(series_uid, %fault, "fetch failed");
            ctx.registry.set_failed(series_uid, fault.status_message());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("pipeline panicked: {}", detail)
}
