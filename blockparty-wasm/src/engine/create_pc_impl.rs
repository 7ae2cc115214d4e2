use blockparty_core::{IceCandidate, PlayerId, SignalingMessage, default_ice_servers};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

use crate::engine::{Engine, EngineInner, Link, close_link_handles};
use crate::logger::Logger;

impl Engine {
    /// Creates the connection object for `peer` and registers it as the
    /// peer's current link, closing whatever link it replaces.
    pub(crate) fn create_pc(
        inner: &Rc<RefCell<EngineInner>>,
        peer: &PlayerId,
    ) -> Result<(web_sys::RtcPeerConnection, u64), JsValue> {
        let rtc_config = web_sys::RtcConfiguration::new();
        let ice_servers_arr = js_sys::Array::new();

        {
            let inner_ref = inner.borrow();
            let servers = if inner_ref.ice_servers.is_empty() {
                default_ice_servers()
            } else {
                inner_ref.ice_servers.clone()
            };
            for server_config in &servers {
                let rtc_ice_server = web_sys::RtcIceServer::new();

                let urls = js_sys::Array::new();
                for url in &server_config.urls {
                    urls.push(&JsValue::from_str(url));
                }
                rtc_ice_server.set_urls(&urls);

                if let Some(username) = &server_config.username {
                    rtc_ice_server.set_username(username);
                }
                if let Some(credential) = &server_config.credential {
                    rtc_ice_server.set_credential(credential);
                }

                ice_servers_arr.push(&rtc_ice_server);
            }
        }
        rtc_config.set_ice_servers(&ice_servers_arr);

        let pc = web_sys::RtcPeerConnection::new_with_configuration(&rtc_config)?;

        let serial = {
            let mut inner_mut = inner.borrow_mut();
            inner_mut.next_serial += 1;
            inner_mut.next_serial
        };

        let inner_ice = inner.clone();
        let peer_ice = peer.clone();
        let onice = Closure::wrap(Box::new(move |ev: web_sys::RtcPeerConnectionIceEvent| {
            let Some(candidate) = ev.candidate() else {
                return;
            };
            let inner_ref = inner_ice.borrow();
            if !inner_ref.is_current(&peer_ice, serial) {
                return;
            }
            let message = SignalingMessage::IceCandidate {
                from: inner_ref.identity.player_id.clone(),
                to: peer_ice.clone(),
                room_id: inner_ref.identity.room_id.clone(),
                data: IceCandidate {
                    candidate: candidate.candidate(),
                    sdp_mid: candidate.sdp_mid(),
                    sdp_m_line_index: candidate.sdp_m_line_index(),
                    username_fragment: None,
                },
            };
            if let Err(e) = inner_ref.send_signal(&message) {
                Logger::error("Failed to send ICE candidate", &e);
            }
        })
            as Box<dyn FnMut(web_sys::RtcPeerConnectionIceEvent)>);
        pc.set_onicecandidate(Some(onice.as_ref().unchecked_ref()));
        onice.forget();

        // Responder side: the initiator opened the channel.
        let inner_dc = inner.clone();
        let peer_dc = peer.clone();
        let ondatachannel_callback =
            Closure::wrap(Box::new(move |ev: web_sys::RtcDataChannelEvent| {
                let dc = ev.channel();
                Logger::info(&format!("Received data channel '{}' from {}", dc.label(), peer_dc));
                Self::setup_data_channel(&inner_dc, &peer_dc, serial, dc);
            }) as Box<dyn FnMut(web_sys::RtcDataChannelEvent)>);
        pc.set_ondatachannel(Some(ondatachannel_callback.as_ref().unchecked_ref()));
        ondatachannel_callback.forget();

        let replaced = inner.borrow_mut().links.insert(
            peer.clone(),
            Link {
                pc: pc.clone(),
                dc: None,
                serial,
            },
        );
        if let Some(old) = replaced {
            close_link_handles(old);
        }

        Ok((pc, serial))
    }

    pub(crate) async fn add_candidate(
        pc: &web_sys::RtcPeerConnection,
        candidate: &IceCandidate,
    ) -> Result<(), JsValue> {
        let init = web_sys::RtcIceCandidateInit::new(&candidate.candidate);
        init.set_sdp_mid(candidate.sdp_mid.as_deref());
        init.set_sdp_m_line_index(candidate.sdp_m_line_index);

        let promise = pc.add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init));
        wasm_bindgen_futures::JsFuture::from(promise).await?;
        Ok(())
    }
}
