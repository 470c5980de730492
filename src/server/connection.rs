//! Per-connection state machine and dispatch (spec.md §4.4).
//!
//! One reader thread per connection reads frames serially (preserving
//! per-connection read order) and hands each one to the worker pool as an
//! independent task, so concurrently outstanding operations on the same
//! connection run in parallel and may complete out of order; the response
//! tag lets the client demultiplexer sort that out.

use crate::constants::{MAX_FILTER_PRODUCTS, MAX_WAIT_CONSEC_N, MIN_WAIT_CONSEC_N};
use crate::credentials::CredentialStore;
use crate::net::FrameWriter;
use crate::notify::Notifier;
use crate::protocol::op;
use crate::protocol::{decode_request, Frame, Request};
use crate::storage::StorageEngine;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::pool::WorkerPool;

/// One-shot authentication transition, published without the storage lock
/// (spec.md §4.4): `authenticated` is written once, before the handler
/// thread that set it returns control to the pool, so a racing read from
/// another worker task on the same connection is always well-defined.
struct Session {
    authenticated: AtomicBool,
    user: Mutex<Option<String>>,
}

impl Session {
    fn new() -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            user: Mutex::new(None),
        }
    }
}

pub struct Collaborators {
    pub storage: Arc<StorageEngine>,
    pub notifier: Arc<Notifier>,
    pub credentials: Arc<CredentialStore>,
    pub pool: Arc<WorkerPool>,
}

/// Reads frames from `stream` until the connection closes, dispatching one
/// worker-pool task per frame. Runs on its own thread; returns when the
/// read side terminates.
pub fn run(stream: TcpStream, collaborators: Arc<Collaborators>) {
    if let Err(e) = stream.set_nodelay(true) {
        log::warn!("failed to set TCP_NODELAY: {e}");
    }
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    let (writer, mut reader) = match crate::net::stream::split_server(stream) {
        Ok(halves) => halves,
        Err(e) => {
            log::warn!("failed to set up connection to {peer}: {e}");
            return;
        }
    };
    let writer = Arc::new(writer);
    let session = Arc::new(Session::new());

    log::info!("accepted connection from {peer}");
    loop {
        let frame = match reader.receive() {
            Ok(frame) => frame,
            Err(e) => {
                log::info!("connection {peer} closed: {e}");
                return;
            }
        };

        let task_collaborators = collaborators.clone();
        let session = session.clone();
        let writer = writer.clone();
        collaborators
            .pool
            .submit(move || dispatch(frame, &task_collaborators, &session, &writer));
    }
}

fn dispatch(frame: Frame, collaborators: &Collaborators, session: &Session, writer: &FrameWriter) {
    let tag = frame.tag;
    eprintln!("DEBUG dispatch enter tag={tag} kind={}", frame.kind);
    let response = match decode_request(frame.kind, &frame.payload) {
        Ok(request) => handle(request, collaborators, session),
        Err(e) => Err(e.to_string()),
    };
    eprintln!("DEBUG dispatch handled tag={tag}");

    let outgoing = match response {
        Ok(payload) => Frame::ok(tag, payload),
        Err(message) => Frame::err(tag, &message),
    };
    eprintln!("DEBUG dispatch sending tag={tag}");
    if let Err(e) = writer.send(&outgoing) {
        log::warn!("failed to send response for tag {tag}: {e}");
    }
    eprintln!("DEBUG dispatch sent tag={tag}");
}

fn handle(request: Request, c: &Collaborators, session: &Session) -> Result<Vec<u8>, String> {
    let authenticated = session.authenticated.load(Ordering::Acquire);

    match &request {
        Request::Register { .. } | Request::Login { .. } => {}
        _ if !authenticated => return Err("not authenticated".to_string()),
        _ => {}
    }

    match request {
        Request::Register { user, pass } => {
            let created = c.credentials.register(&user, &pass).map_err(|e| e.to_string())?;
            Ok(op::encode_bool(created))
        }
        Request::Login { user, pass } => {
            let ok = c.credentials.verify(&user, &pass);
            if ok {
                *session.user.lock().expect("session lock poisoned") = Some(user);
                session.authenticated.store(true, Ordering::Release);
            }
            Ok(op::encode_bool(ok))
        }
        Request::AddEvent { product, qty, price } => {
            c.storage.add_event(&product, qty, price);
            c.notifier.register_sale(&product);
            Ok(Vec::new())
        }
        Request::NewDay => {
            c.storage.new_day().map_err(|e| e.to_string())?;
            c.notifier.new_day();
            Ok(Vec::new())
        }
        Request::Aggregate { kind, product, days } => {
            validate_aggregate_days(days, c.storage.retention_window())?;
            let result = c
                .storage
                .aggregate(kind, &product, days as i64)
                .map_err(|e| e.to_string())?;
            Ok(op::encode_double(result))
        }
        Request::Filter { day, products } => {
            validate_filter(day, &products, c.storage.current_day(), c.storage.retention_window())?;
            let sales = c
                .storage
                .get_events_for_day(day as i64, &products)
                .map_err(|e| e.to_string())?;
            Ok(op::encode_filter_response(&sales))
        }
        Request::WaitSimul { p1, p2 } => {
            if p1.is_empty() || p2.is_empty() {
                return Err("product names must not be empty".to_string());
            }
            let satisfied = c.notifier.wait_simultaneous(&p1, &p2);
            Ok(op::encode_bool(satisfied))
        }
        Request::WaitConsec { n } => {
            validate_wait_consec(n)?;
            let winner = c.notifier.wait_consecutive(n as i64);
            Ok(op::encode_optional_utf(winner.as_deref()))
        }
        Request::GetCurrentDay => Ok(op::encode_int(c.storage.current_day() as i32)),
    }
}

fn validate_aggregate_days(days: i32, retention_window: i64) -> Result<(), String> {
    if days < 1 || i64::from(days) > retention_window {
        return Err(format!("days must be in [1, {retention_window}]"));
    }
    Ok(())
}

fn validate_filter(day: i32, products: &[String], current_day: i64, retention_window: i64) -> Result<(), String> {
    if products.len() > MAX_FILTER_PRODUCTS {
        return Err(format!("filter size exceeds {MAX_FILTER_PRODUCTS}"));
    }
    let day = day as i64;
    if day < 0 || day >= current_day || day < (current_day - retention_window).max(0) {
        return Err(format!("day {day} is out of window"));
    }
    Ok(())
}

fn validate_wait_consec(n: i32) -> Result<(), String> {
    let n = i64::from(n);
    if n < MIN_WAIT_CONSEC_N || n > MAX_WAIT_CONSEC_N {
        return Err(format!("n must be in [{MIN_WAIT_CONSEC_N}, {MAX_WAIT_CONSEC_N}]"));
    }
    Ok(())
}
