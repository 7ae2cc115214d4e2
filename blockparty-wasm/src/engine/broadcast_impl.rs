use blockparty_core::utils::BROADCAST_INTERVAL_MS;
use blockparty_core::{GameState, SignalingMessage};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};

use crate::engine::{Broadcast, ConnectionState, Engine, EngineInner, js_err, now_ms};
use crate::logger::Logger;

impl Engine {
    /// Sends one snapshot through the relay and on every open channel.
    pub fn send_state(&self, state: GameState) -> Result<(), JsValue> {
        Self::send_state_inner(&self.inner, state)
    }

    /// Calls `source` every 100 ms and sends what it returns. Replaces any
    /// broadcast already running.
    pub fn start_broadcast(&self, source: js_sys::Function) -> Result<(), JsValue> {
        Self::stop_broadcast_inner(&self.inner);

        let inner = self.inner.clone();
        let tick = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            let value = match source.call0(&JsValue::NULL) {
                Ok(value) => value,
                Err(e) => {
                    Logger::error("State source threw", &e);
                    return;
                }
            };
            let state = match serde_wasm_bindgen::from_value::<GameState>(value) {
                Ok(state) => state,
                Err(e) => {
                    Logger::warn(&format!("State source returned an invalid state: {}", e));
                    return;
                }
            };
            if let Err(e) = Self::send_state_inner(&inner, state) {
                Logger::debug(&format!("Broadcast tick skipped: {:?}", e));
            }
        }));

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let interval_id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            BROADCAST_INTERVAL_MS as i32,
        )?;

        self.inner.borrow_mut().broadcast = Some(Broadcast {
            interval_id,
            _tick: tick,
        });
        Ok(())
    }

    pub fn stop_broadcast(&self) {
        Self::stop_broadcast_inner(&self.inner);
    }

    pub(crate) fn stop_broadcast_inner(inner: &Rc<RefCell<EngineInner>>) {
        let Some(broadcast) = inner.borrow_mut().broadcast.take() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(broadcast.interval_id);
        }
    }

    fn send_state_inner(
        inner: &Rc<RefCell<EngineInner>>,
        mut state: GameState,
    ) -> Result<(), JsValue> {
        let mut inner_mut = inner.borrow_mut();
        if inner_mut.state != ConnectionState::Joined {
            return Err(JsValue::from_str("not in a room"));
        }

        inner_mut.clock.stamp(&mut state, now_ms());
        let direct = serde_json::to_string(&state).map_err(js_err)?;

        let relayed = SignalingMessage::GameState {
            from: inner_mut.identity.player_id.clone(),
            room_id: inner_mut.identity.room_id.clone(),
            data: state,
        };
        let inner_ref = &*inner_mut;

        let relay = std::iter::once(("relay".to_string(), inner_ref.send_signal(&relayed)));
        let channels = inner_ref.links.iter().filter_map(|(peer, link)| {
            let dc = link.dc.as_ref()?;
            (dc.ready_state() == web_sys::RtcDataChannelState::Open)
                .then(|| (peer.to_string(), dc.send_with_str(&direct)))
        });
        for (path, e) in failed_sends(relay.chain(channels)) {
            Logger::debug(&format!("Send to {} failed: {:?}", path, e));
        }
        Ok(())
    }
}

/// Drains every send attempt and keeps the failures, so one dead path never
/// stops the others.
fn failed_sends<L, E>(attempts: impl IntoIterator<Item = (L, Result<(), E>)>) -> Vec<(L, E)> {
    attempts
        .into_iter()
        .filter_map(|(path, result)| result.err().map(|e| (path, e)))
        .collect()
}
