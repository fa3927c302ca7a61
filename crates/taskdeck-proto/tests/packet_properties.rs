//! Property-based tests for packet decoding.
//!
//! Decoding is fed directly from the network, so the properties here focus
//! on robustness: arbitrary text must never panic, and anything we encode
//! must come back unchanged.

use proptest::prelude::*;
use serde_json::{Value, json};
use taskdeck_proto::{ClientCommand, EnginePacket, PacketKind, ServerEvent, SocketPacket};

/// Strategy for small JSON argument values.
fn json_arg() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<u32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ,\\[\\]{}\"]{0,24}".prop_map(Value::String),
        ("[a-z]{1,8}", "[a-z0-9]{0,8}").prop_map(|(key, value)| {
            let mut map = serde_json::Map::new();
            map.insert(key, Value::String(value));
            Value::Object(map)
        }),
    ]
}

proptest! {
    #[test]
    fn engine_decode_never_panics(text in "\\PC{0,64}") {
        let _ = EnginePacket::decode(&text);
    }

    #[test]
    fn socket_decode_never_panics(text in "\\PC{0,64}") {
        let _ = SocketPacket::decode(&text);
    }

    #[test]
    fn event_packets_survive_the_wire(
        name in "[a-zA-Z]{1,16}",
        arg in proptest::option::of(json_arg()),
        ack_id in proptest::option::of(any::<u64>()),
        namespace in prop_oneof![Just("/".to_string()), "/[a-z]{1,6}"],
    ) {
        let mut packet = SocketPacket::event(&name, arg);
        packet.ack_id = ack_id;
        packet.namespace = namespace;

        let engine_text = packet.clone().into_engine().unwrap().encode().unwrap();
        let EnginePacket::Message(body) = EnginePacket::decode(&engine_text).unwrap() else {
            return Err(TestCaseError::fail("expected engine message"));
        };
        let decoded = SocketPacket::decode(&body).unwrap();

        prop_assert_eq!(decoded.kind, PacketKind::Event);
        prop_assert_eq!(decoded.event_name(), Some(name.as_str()));
        prop_assert_eq!(decoded, packet);
    }

    #[test]
    fn unknown_server_events_are_tolerated(name in "[a-z]{1,12}Changed") {
        let packet = SocketPacket::event(&name, Some(json!({ "x": 1 })));
        let event = ServerEvent::from_packet(&packet).unwrap();
        prop_assert_eq!(event, ServerEvent::Unknown { name });
    }

    #[test]
    fn typing_command_decodes_back(peer in "u[0-9]{1,6}", is_typing in any::<bool>()) {
        let command = ClientCommand::Typing(taskdeck_proto::payloads::presence::TypingNotice {
            receiver_id: peer.as_str().into(),
            is_typing,
        });

        let decoded = ClientCommand::from_packet(&command.to_packet().unwrap()).unwrap();
        prop_assert_eq!(decoded, command);
    }
}
