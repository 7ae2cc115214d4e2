use blockparty_core::{GameState, PlayerId};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::engine::{Engine, EngineInner};
use crate::logger::Logger;

impl Engine {
    pub(super) fn setup_data_channel(
        inner: &Rc<RefCell<EngineInner>>,
        peer: &PlayerId,
        serial: u64,
        dc: web_sys::RtcDataChannel,
    ) {
        let on_msg = {
            let inner = inner.clone();
            let peer = peer.clone();
            Closure::<dyn FnMut(web_sys::MessageEvent)>::wrap(Box::new(
                move |ev: web_sys::MessageEvent| {
                    let Some(text) = ev.data().as_string() else {
                        return;
                    };
                    match serde_json::from_str::<GameState>(&text) {
                        Ok(state) => Self::apply_state(&inner, &peer, &state),
                        Err(e) => Logger::warn(&format!("Bad state from {}: {}", peer, e)),
                    }
                },
            ))
        };
        dc.set_onmessage(Some(on_msg.as_ref().unchecked_ref()));
        on_msg.forget();

        let on_open = {
            let inner = inner.clone();
            let peer = peer.clone();
            let channel = dc.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                let mut inner_mut = inner.borrow_mut();
                if !inner_mut.is_current(&peer, serial) {
                    return;
                }
                if let Some(link) = inner_mut.links.get_mut(&peer) {
                    link.dc = Some(channel.clone());
                }
                match inner_mut.peers.get_mut(&peer).map(|n| n.channel_open()) {
                    Some(Ok(())) => Logger::info(&format!("Direct channel with {} open", peer)),
                    Some(Err(e)) => Logger::warn(&format!("Channel with {}: {}", peer, e)),
                    None => {}
                }
            }))
        };
        dc.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        on_open.forget();

        let on_close = {
            let inner = inner.clone();
            let peer = peer.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                let current = inner.borrow().is_current(&peer, serial);
                if current {
                    Logger::warn(&format!(
                        "Direct channel with {} closed, falling back to relay",
                        peer
                    ));
                    Self::drop_link(&inner, &peer);
                }
            }))
        };
        dc.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();
    }
}
