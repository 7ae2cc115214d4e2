use blockparty_core::sync::{Identity, PeerTable, Roster, StartEligibility, StateClock};
use blockparty_core::{IceServerConfig, PlayerId, SignalingMessage};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use crate::logger::Logger;

mod broadcast_impl;
mod create_pc_impl;
mod handle_remote_offer_impl;
mod handle_signal_impl;
mod init_connection_impl;
mod setup_data_channel_impl;
mod ws_setup_impl;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Joined,
    Closed,
}

/// Direct connection to one remote player.
pub(crate) struct Link {
    pc: web_sys::RtcPeerConnection,
    dc: Option<web_sys::RtcDataChannel>,
    serial: u64,
}

pub(crate) struct Broadcast {
    interval_id: i32,
    _tick: Closure<dyn FnMut()>,
}

pub(crate) struct EngineInner {
    identity: Identity,
    relay_url: String,
    ice_servers: Vec<IceServerConfig>,
    state: ConnectionState,
    ws: Option<web_sys::WebSocket>,

    peers: PeerTable,
    links: HashMap<PlayerId, Link>,
    next_serial: u64,
    roster: Roster,
    clock: StateClock,

    on_peer_state: Option<js_sys::Function>,
    on_roster: Option<js_sys::Function>,
    /// `resolve`/`reject` of the promise returned by `connect`.
    pending_connect: Option<(js_sys::Function, js_sys::Function)>,
    broadcast: Option<Broadcast>,
}

impl EngineInner {
    fn send_signal(&self, message: &SignalingMessage) -> Result<(), JsValue> {
        let json = message.to_json().map_err(js_err)?;
        match &self.ws {
            Some(ws) => ws.send_with_str(&json),
            None => Err(JsValue::from_str("not connected to the relay")),
        }
    }

    fn is_current(&self, peer: &PlayerId, serial: u64) -> bool {
        self.links
            .get(peer)
            .is_some_and(|link| link.serial == serial)
    }
}

pub struct Engine {
    inner: Rc<RefCell<EngineInner>>,
}

impl Engine {
    pub fn new(identity: Identity, relay_url: String, ice_servers: Vec<IceServerConfig>) -> Self {
        let peers = PeerTable::new(identity.player_id.clone());
        let roster = Roster::new(identity.player_id.clone());

        Self {
            inner: Rc::new(RefCell::new(EngineInner {
                identity,
                relay_url,
                ice_servers,
                state: ConnectionState::Disconnected,
                ws: None,
                peers,
                links: HashMap::new(),
                next_serial: 0,
                roster,
                clock: StateClock::new(),
                on_peer_state: None,
                on_roster: None,
                pending_connect: None,
                broadcast: None,
            })),
        }
    }

    pub fn identity(&self) -> Identity {
        self.inner.borrow().identity.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    pub fn set_on_peer_state(&self, callback: js_sys::Function) {
        self.inner.borrow_mut().on_peer_state = Some(callback);
    }

    pub fn set_on_roster(&self, callback: js_sys::Function) {
        self.inner.borrow_mut().on_roster = Some(callback);
    }

    pub fn can_start(&self) -> bool {
        matches!(
            self.inner.borrow().roster.can_start(now_ms()),
            StartEligibility::Allowed
        )
    }

    /// Leaves the room and releases every connection. Safe to call twice.
    pub fn disconnect(&self) {
        Self::stop_broadcast_inner(&self.inner);

        let (ws, links, pending) = {
            let mut inner = self.inner.borrow_mut();
            if matches!(
                inner.state,
                ConnectionState::Disconnected | ConnectionState::Closed
            ) {
                return;
            }

            let leave = SignalingMessage::LeaveRoom {
                from: inner.identity.player_id.clone(),
                room_id: inner.identity.room_id.clone(),
            };
            if let Err(e) = inner.send_signal(&leave) {
                Logger::debug(&format!("Could not send leave: {:?}", e));
            }

            inner.state = ConnectionState::Closed;
            inner.peers.close_all();
            inner.roster.clear();
            let links: Vec<Link> = inner.links.drain().map(|(_, link)| link).collect();
            (inner.ws.take(), links, inner.pending_connect.take())
        };

        for link in links {
            close_link_handles(link);
        }
        if let Some(ws) = ws {
            let _ = ws.close();
        }
        if let Some((_, reject)) = pending {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("disconnected"));
        }
        Logger::info("Left the room");
    }

    /// Closes the connection with `peer` but keeps its negotiation entry.
    pub(crate) fn close_link(inner: &Rc<RefCell<EngineInner>>, peer: &PlayerId) {
        let link = inner.borrow_mut().links.remove(peer);
        if let Some(link) = link {
            close_link_handles(link);
        }
    }

    /// Forgets the peer's negotiation too; it stays reachable through the relay.
    pub(crate) fn drop_link(inner: &Rc<RefCell<EngineInner>>, peer: &PlayerId) {
        inner.borrow_mut().peers.remove(peer);
        Self::close_link(inner, peer);
    }

    fn notify(callback: Option<js_sys::Function>, args: &[JsValue]) {
        let Some(callback) = callback else { return };
        let result = match args {
            [a] => callback.call1(&JsValue::NULL, a),
            [a, b] => callback.call2(&JsValue::NULL, a, b),
            _ => callback.call0(&JsValue::NULL),
        };
        if let Err(e) = result {
            Logger::error("Callback threw", &e);
        }
    }
}

/// Plain JS object (`null` for `None`) rather than `Map`/`undefined`.
pub(crate) fn to_js<T: Serialize>(value: &T) -> Option<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| Logger::warn(&format!("Could not convert value for JS: {}", e)))
        .ok()
}

fn close_link_handles(link: Link) {
    if let Some(dc) = link.dc {
        dc.close();
    }
    link.pc.close();
}

pub(crate) fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

pub(crate) fn js_err(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
