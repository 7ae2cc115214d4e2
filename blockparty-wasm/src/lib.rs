//! Browser binding: the same room protocol as the native client, driven by
//! `WebSocket` and `RTCPeerConnection` from the page.

mod client;
mod engine;
mod logger;

pub use client::{BlockPartyClient, identity_from_location};
