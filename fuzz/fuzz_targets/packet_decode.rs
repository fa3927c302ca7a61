//! Fuzz target for the Engine.IO / Socket.IO text decoders
//!
//! Feeds arbitrary text through every decoding layer a server frame passes:
//! Engine.IO packet, Socket.IO packet, typed server event.
//!
//! # Invariants
//!
//! - Decoding never panics. Invalid input is an `Err`.
//! - An Engine.IO packet that decodes re-encodes to text decoding to the same
//!   packet.
//! - A Socket.IO packet that decodes re-encodes to text that decodes again.
//!   Equality is not required: ` 5` after the type reads as data but its
//!   encoding reads as an ack id.

#![no_main]

use libfuzzer_sys::fuzz_target;
use taskdeck_proto::{EnginePacket, ServerEvent, SocketPacket};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(packet) = EnginePacket::decode(text) {
        if let Ok(encoded) = packet.encode() {
            assert_eq!(EnginePacket::decode(&encoded).ok(), Some(packet));
        }
    }

    let Ok(packet) = SocketPacket::decode(text) else {
        return;
    };
    let _ = ServerEvent::from_packet(&packet);

    if let Ok(encoded) = packet.encode() {
        assert!(SocketPacket::decode(&encoded).is_ok());
    }
});
