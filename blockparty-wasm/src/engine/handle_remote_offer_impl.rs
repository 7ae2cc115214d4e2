use blockparty_core::{PlayerId, SessionDescription, SignalingMessage};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsValue;

use crate::engine::init_connection_impl::sdp_of;
use crate::engine::{Engine, EngineInner, js_err};
use crate::logger::Logger;

impl Engine {
    /// Responder side: applies the offer, answers, and waits for the
    /// initiator's data channel.
    pub(super) async fn handle_remote_offer(
        inner: &Rc<RefCell<EngineInner>>,
        from: &PlayerId,
        remote_sdp: String,
    ) -> Result<(), JsValue> {
        let replaced = inner.borrow_mut().peers.accept_offer(from).map_err(js_err)?;
        if replaced {
            Logger::debug(&format!("Replacing earlier connection with {}", from));
        }

        let (pc, serial) = Self::create_pc(inner, from)?;

        let desc_init = web_sys::RtcSessionDescriptionInit::new(web_sys::RtcSdpType::Offer);
        desc_init.set_sdp(&remote_sdp);
        wasm_bindgen_futures::JsFuture::from(pc.set_remote_description(&desc_init)).await?;

        let pending = Self::with_negotiation(inner, from, |n| n.offer_applied())?;
        for candidate in &pending {
            Self::add_candidate(&pc, candidate).await?;
        }

        let answer = wasm_bindgen_futures::JsFuture::from(pc.create_answer()).await?;
        let answer_sdp = sdp_of(&answer)?;

        let answer_init = web_sys::RtcSessionDescriptionInit::new(web_sys::RtcSdpType::Answer);
        answer_init.set_sdp(&answer_sdp);
        wasm_bindgen_futures::JsFuture::from(pc.set_local_description(&answer_init)).await?;

        let inner_ref = inner.borrow();
        if !inner_ref.is_current(from, serial) {
            return Ok(());
        }
        Logger::info(&format!("Sending answer to {}", from));
        inner_ref.send_signal(&SignalingMessage::Answer {
            from: inner_ref.identity.player_id.clone(),
            to: from.clone(),
            room_id: inner_ref.identity.room_id.clone(),
            data: SessionDescription::answer(answer_sdp),
        })
    }
}
