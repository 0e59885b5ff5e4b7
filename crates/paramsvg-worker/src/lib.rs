//! Web worker entry point for parametric SVG processing.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`. The editor posts a request for every edit (merge) and every
//! import (extract); the worker runs it through `paramsvg-core` and
//! posts the result back.
//!
//! The UI may post several requests back to back, one per keystroke.
//! Each response echoes the request's `generation` so the UI can drop
//! stale results; the worker itself keeps no state between messages.

pub mod protocol;

pub use protocol::{Reply, Request, Response, WorkerError, handle, handle_json};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Message protocol: the main thread sends a JS object with:
/// - `requestJson`: `String` containing a JSON-serialized [`Request`]
/// - `generation`: `f64` generation counter (passed through to response)
///
/// On success the worker responds with a JS object containing:
/// - `generation`: `f64` matching the request generation
/// - `ok`: `true`
/// - `responseJson`: `String` containing a JSON-serialized [`Response`]
///
/// Invalid markup is *not* a failure: it is a successful response whose
/// `fileContents` carries an `error` for the toast.
///
/// On a protocol failure the worker responds with:
/// - `generation`: `f64`
/// - `ok`: `false`
/// - `errorJson`: `String` containing a JSON-serialized [`WorkerError`]
///
/// # Worker entry point
///
/// Called automatically when the WASM module is instantiated in the
/// worker context.
#[wasm_bindgen(start)]
pub fn worker_main() {
    console_error_panic_hook::set_once();
    // Fails only if a logger is already installed.
    let _ = console_log::init_with_level(log::Level::Debug);

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not running in a DedicatedWorkerGlobalScope");

    let onmessage =
        Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
            handle_message(&event);
        });
    global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget(); // lives for the worker lifetime

    log::info!("paramsvg worker ready");
}

/// Handle an incoming message from the main thread.
fn handle_message(event: &web_sys::MessageEvent) {
    let data = event.data();

    let generation = js_sys::Reflect::get(&data, &JsValue::from_str("generation"))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(-1.0);

    let result = js_sys::Reflect::get(&data, &JsValue::from_str("requestJson"))
        .ok()
        .and_then(|v| v.as_string())
        .ok_or_else(|| WorkerError::InvalidRequest("missing requestJson field".to_string()))
        .and_then(|request_json| handle_json(&request_json));
    if let Err(err) = &result {
        log::warn!("rejected worker request: {err}");
    }
    post(generation, &Reply::from(result));
}

/// Build the `{ generation, ok, responseJson | errorJson }` object and
/// post it.
///
/// A reply that cannot be delivered throws, so the failure reaches the
/// worker's `onerror` instead of leaving the generation unanswered.
fn post(generation: f64, reply: &Reply) {
    let response = js_sys::Object::new();
    let set = |key: &str, val: &JsValue| {
        js_sys::Reflect::set(&response, &JsValue::from_str(key), val)
            .expect_throw("failed to set response field");
    };
    set("generation", &JsValue::from_f64(generation));
    set("ok", &JsValue::from_bool(reply.ok));
    set(reply.field(), &JsValue::from_str(&reply.json));

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not in worker scope");
    if let Err(err) = global.post_message(&response) {
        log::error!("failed to post reply for generation {generation}: {err:?}");
        wasm_bindgen::throw_str("failed to postMessage");
    }
}
