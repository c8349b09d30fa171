//! Chatbox notifications over OSC/UDP.
//!
//! Each message is a single OSC packet: `[text, send_immediately, play_sound]`.

use anyhow::{anyhow, Context, Result};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

use crate::automation::config::OscConfig;
use crate::automation::services::StatusNotifier;

/// The chatbox drops anything longer.
pub const MAX_CHATBOX_CHARS: usize = 144;

pub struct OscNotifier {
    socket: UdpSocket,
    address: String,
}

impl OscNotifier {
    pub fn connect(config: &OscConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind OSC socket")?;
        let target = format!("{}:{}", config.host, config.port);
        socket
            .connect(&target)
            .with_context(|| format!("Failed to connect OSC socket to {}", target))?;

        crate::log(&format!("OSC target: {} {}", target, config.address));
        Ok(Self {
            socket,
            address: config.address.clone(),
        })
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Encodes the chatbox packet for `text`.
pub fn encode_chatbox_message(address: &str, text: &str) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: vec![
            OscType::String(truncate_chars(text, MAX_CHATBOX_CHARS)),
            OscType::Bool(true),
            OscType::Bool(false),
        ],
    });
    encoder::encode(&packet).map_err(|e| anyhow!("Failed to encode OSC packet: {:?}", e))
}

impl StatusNotifier for OscNotifier {
    fn send(&mut self, text: &str) -> Result<()> {
        let bytes = encode_chatbox_message(&self.address, text)?;
        self.socket
            .send(&bytes)
            .context("Failed to send OSC message")?;
        Ok(())
    }
}
