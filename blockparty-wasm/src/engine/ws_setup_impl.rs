use blockparty_core::utils::CONNECT_TIMEOUT_MS;
use blockparty_core::{JoinData, SignalingMessage};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::WebSocket;

use crate::engine::{ConnectionState, Engine, EngineInner};
use crate::logger::Logger;

impl Engine {
    /// Opens the relay socket and joins the room. The promise resolves once
    /// the relay lists this player, and rejects after ten seconds otherwise.
    pub fn connect(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        js_sys::Promise::new(&mut |resolve, reject| {
            {
                let mut inner_mut = inner.borrow_mut();
                if inner_mut.state != ConnectionState::Disconnected {
                    let _ = reject.call1(&JsValue::NULL, &"connect was already called".into());
                    return;
                }
                inner_mut.state = ConnectionState::Connecting;
                inner_mut.pending_connect = Some((resolve, reject));
            }

            if let Err(e) = Self::ws_setup(&inner) {
                Self::fail_connect(&inner, &e);
                return;
            }
            Self::arm_connect_timeout(&inner);
        })
    }

    pub(crate) fn ws_setup(inner: &Rc<RefCell<EngineInner>>) -> Result<(), JsValue> {
        let url = inner.borrow().relay_url.clone();
        let ws = WebSocket::new(&url)?;

        let onopen_callback = {
            let inner = inner.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                Logger::info("Relay socket open");
                let inner_ref = inner.borrow();
                let join = SignalingMessage::JoinRoom {
                    from: inner_ref.identity.player_id.clone(),
                    room_id: inner_ref.identity.room_id.clone(),
                    data: JoinData {
                        player_name: inner_ref.identity.player_name.clone(),
                    },
                };
                if let Err(e) = inner_ref.send_signal(&join) {
                    Logger::error("Failed to send join", &e);
                }
            }))
        };
        ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
        onopen_callback.forget();

        let onmessage_callback = {
            let inner = inner.clone();
            Closure::<dyn FnMut(web_sys::MessageEvent)>::wrap(Box::new(
                move |e: web_sys::MessageEvent| {
                    if let Some(text) = e.data().as_string() {
                        Self::handle_signal(&inner, text);
                    }
                },
            ))
        };
        ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
        onmessage_callback.forget();

        let onclose_callback = {
            let inner = inner.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                Logger::warn("Relay socket closed");
                Self::fail_connect(&inner, &"relay closed the connection".into());
            }))
        };
        ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
        onclose_callback.forget();

        inner.borrow_mut().ws = Some(ws);
        Ok(())
    }

    fn arm_connect_timeout(inner: &Rc<RefCell<EngineInner>>) {
        let inner_timeout = inner.clone();
        let on_timeout = Closure::once_into_js(move || {
            let pending = inner_timeout.borrow().pending_connect.is_some();
            if pending {
                Logger::warn("Relay did not acknowledge the join in time");
                Self::fail_connect(&inner_timeout, &"connect timed out".into());
            }
        });

        let Some(window) = web_sys::window() else {
            Logger::warn("No window, connect has no timeout");
            return;
        };
        if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            on_timeout.unchecked_ref(),
            CONNECT_TIMEOUT_MS as i32,
        ) {
            Logger::error("Failed to arm connect timeout", &e);
        }
    }

    /// Rejects a pending `connect` and drops the socket. No-op once joined.
    fn fail_connect(inner: &Rc<RefCell<EngineInner>>, reason: &JsValue) {
        let (reject, ws) = {
            let mut inner_mut = inner.borrow_mut();
            let Some((_, reject)) = inner_mut.pending_connect.take() else {
                return;
            };
            inner_mut.state = ConnectionState::Closed;
            (reject, inner_mut.ws.take())
        };

        if let Some(ws) = ws {
            let _ = ws.close();
        }
        let _ = reject.call1(&JsValue::NULL, reason);
    }
}
