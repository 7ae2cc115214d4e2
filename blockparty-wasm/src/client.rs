use blockparty_core::sync::Identity;
use blockparty_core::{GameState, PlayerId, RoomId, default_ice_servers};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::engine::{ConnectionState, Engine, to_js};

/// Page-facing handle to one room membership.
#[wasm_bindgen]
pub struct BlockPartyClient {
    engine: Engine,
}

#[wasm_bindgen]
impl BlockPartyClient {
    #[wasm_bindgen(constructor)]
    pub fn new(
        relay_url: String,
        room_id: String,
        player_id: String,
        player_name: String,
    ) -> Result<BlockPartyClient, JsValue> {
        let room_id = RoomId::from_user_input(&room_id)
            .ok_or_else(|| JsValue::from_str("room id must not be empty"))?;
        let identity = Identity::new(room_id, PlayerId::from(player_id), player_name);
        Ok(Self {
            engine: Engine::new(identity, relay_url, default_ice_servers()),
        })
    }

    /// Client for a freshly generated room and player id.
    #[wasm_bindgen(js_name = createRoom)]
    pub fn create_room(relay_url: String, player_name: String) -> BlockPartyClient {
        Self {
            engine: Engine::new(
                Identity::create_room(player_name),
                relay_url,
                default_ice_servers(),
            ),
        }
    }

    /// Resolves once the relay lists this player in the room.
    pub fn connect(&self) -> js_sys::Promise {
        self.engine.connect()
    }

    #[wasm_bindgen(js_name = sendState)]
    pub fn send_state(&self, state: JsValue) -> Result<(), JsValue> {
        let state: GameState = serde_wasm_bindgen::from_value(state)?;
        self.engine.send_state(state)
    }

    /// `source` is called every 100 ms and must return the current game state.
    #[wasm_bindgen(js_name = startBroadcast)]
    pub fn start_broadcast(&self, source: js_sys::Function) -> Result<(), JsValue> {
        self.engine.start_broadcast(source)
    }

    #[wasm_bindgen(js_name = stopBroadcast)]
    pub fn stop_broadcast(&self) {
        self.engine.stop_broadcast();
    }

    #[wasm_bindgen(js_name = onPeerState)]
    pub fn on_peer_state(&self, callback: js_sys::Function) {
        self.engine.set_on_peer_state(callback);
    }

    #[wasm_bindgen(js_name = onRoster)]
    pub fn on_roster(&self, callback: js_sys::Function) {
        self.engine.set_on_roster(callback);
    }

    #[wasm_bindgen(js_name = canStart)]
    pub fn can_start(&self) -> bool {
        self.engine.can_start()
    }

    #[wasm_bindgen(getter)]
    pub fn connected(&self) -> bool {
        self.engine.state() == ConnectionState::Joined
    }

    #[wasm_bindgen(getter, js_name = roomId)]
    pub fn room_id(&self) -> String {
        self.engine.identity().room_id.to_string()
    }

    #[wasm_bindgen(getter, js_name = playerId)]
    pub fn player_id(&self) -> String {
        self.engine.identity().player_id.to_string()
    }

    /// `room=..&player=..&name=..` for a rejoin link.
    #[wasm_bindgen(js_name = shareQuery)]
    pub fn share_query(&self) -> String {
        self.engine.identity().to_query()
    }

    pub fn disconnect(&self) {
        self.engine.disconnect();
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationIdentity {
    room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    player_name: Option<String>,
}

/// Reads `room`, `player` and `name` from the page URL.
///
/// Returns `{roomId, playerId, playerName}`, just `{roomId}` when the link
/// names a room but no player, or `null`.
#[wasm_bindgen(js_name = identityFromLocation)]
pub fn identity_from_location() -> Result<JsValue, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let search = window.location().search()?;

    let found = match Identity::from_query(&search) {
        Ok(Some(identity)) => LocationIdentity {
            room_id: identity.room_id.to_string(),
            player_id: Some(identity.player_id.to_string()),
            player_name: Some(identity.player_name),
        },
        Err(room_id) => LocationIdentity {
            room_id: room_id.to_string(),
            player_id: None,
            player_name: None,
        },
        Ok(None) => return Ok(JsValue::NULL),
    };
    Ok(to_js(&found).unwrap_or(JsValue::NULL))
}
