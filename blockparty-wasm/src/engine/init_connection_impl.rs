use blockparty_core::utils::DATA_CHANNEL_LABEL;
use blockparty_core::{PlayerId, SessionDescription, SignalingMessage};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsValue;

use crate::engine::{Engine, EngineInner, js_err};
use crate::logger::Logger;

impl Engine {
    /// Initiator side: opens the `gameData` channel and offers to `peer`.
    pub(super) async fn init_connection(
        inner: &Rc<RefCell<EngineInner>>,
        peer: &PlayerId,
    ) -> Result<(), JsValue> {
        Self::with_negotiation(inner, peer, |n| n.begin_offer())?;

        let (pc, serial) = Self::create_pc(inner, peer)?;
        let dc = pc.create_data_channel(DATA_CHANNEL_LABEL);
        Self::setup_data_channel(inner, peer, serial, dc);

        let offer = wasm_bindgen_futures::JsFuture::from(pc.create_offer()).await?;
        let offer_sdp = sdp_of(&offer)?;

        let desc = web_sys::RtcSessionDescriptionInit::new(web_sys::RtcSdpType::Offer);
        desc.set_sdp(&offer_sdp);
        wasm_bindgen_futures::JsFuture::from(pc.set_local_description(&desc)).await?;

        if !inner.borrow().is_current(peer, serial) {
            return Ok(());
        }

        Logger::info(&format!("Sending offer to {}", peer));
        {
            let inner_ref = inner.borrow();
            inner_ref.send_signal(&SignalingMessage::Offer {
                from: inner_ref.identity.player_id.clone(),
                to: peer.clone(),
                room_id: inner_ref.identity.room_id.clone(),
                data: SessionDescription::offer(offer_sdp),
            })?;
        }
        Self::with_negotiation(inner, peer, |n| n.offer_sent())
    }

    pub(super) async fn handle_answer(
        inner: &Rc<RefCell<EngineInner>>,
        from: &PlayerId,
        sdp: String,
    ) -> Result<(), JsValue> {
        let Some(pc) = inner.borrow().links.get(from).map(|link| link.pc.clone()) else {
            Logger::debug(&format!("Answer from {} without a pending offer", from));
            return Ok(());
        };

        let desc = web_sys::RtcSessionDescriptionInit::new(web_sys::RtcSdpType::Answer);
        desc.set_sdp(&sdp);
        wasm_bindgen_futures::JsFuture::from(pc.set_remote_description(&desc)).await?;
        Logger::info(&format!("Remote description set (answer from {})", from));

        let pending = Self::with_negotiation(inner, from, |n| n.answer_applied())?;
        for candidate in &pending {
            Self::add_candidate(&pc, candidate).await?;
        }
        Ok(())
    }

    pub(super) fn with_negotiation<T, E: std::fmt::Display>(
        inner: &Rc<RefCell<EngineInner>>,
        peer: &PlayerId,
        f: impl FnOnce(&mut blockparty_core::sync::Negotiation) -> Result<T, E>,
    ) -> Result<T, JsValue> {
        let mut inner_mut = inner.borrow_mut();
        let negotiation = inner_mut
            .peers
            .get_mut(peer)
            .ok_or_else(|| JsValue::from_str(&format!("no negotiation with {peer}")))?;
        f(negotiation).map_err(js_err)
    }
}

pub(super) fn sdp_of(description: &JsValue) -> Result<String, JsValue> {
    js_sys::Reflect::get(description, &"sdp".into())?
        .as_string()
        .ok_or_else(|| JsValue::from_str("session description without sdp"))
}
