use bytes::Bytes;
use nixielink::protocol::messages::{
    DisplaySettings, HeatSettings, HeatSettingsGet, SceneSettings, SearchCommand, SearchStatus,
    WifiCredentials, WifiSearchPoll, WifiSettings, WifiSettingsSet,
};
use nixielink::protocol::{CodecError, Decode, InboundFrame, Opcode, Packet, ReplyKind, Request};

#[test]
fn test_scenario_frame_bytes() {
    let mut packet = Packet::new(Opcode::new(5).unwrap(), "scenario");
    packet.writer_mut().put_bool(true);
    packet.writer_mut().put_i8(-20);
    packet.writer_mut().put_cstr("abc", 10).unwrap();

    let bytes = packet.to_bytes();
    assert_eq!(bytes.len(), 13);
    assert_eq!(
        bytes.as_ref(),
        &[5, 1, 236, b'a', b'b', b'c', 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn test_request_frame_has_no_length_prefix() {
    let poll = WifiSearchPoll {
        command: SearchCommand::Start,
        index: 0,
    };
    let packet = poll.to_packet().unwrap();

    assert_eq!(packet.opcode(), Opcode::WIFI_SEARCH_POLL);
    assert_eq!(packet.name(), WifiSearchPoll::NAME);
    assert_eq!(packet.to_bytes().as_ref(), &[27, 1, 0]);
}

#[test]
fn test_reply_frame_decodes_past_opcode() {
    let mut frame = vec![27u8, 2];
    let mut ssid = b"clockwork".to_vec();
    ssid.resize(33, 0);
    frame.extend_from_slice(&ssid);
    frame.push(-67i8 as u8);
    frame.push(1);

    let frame = InboundFrame::new(Bytes::from(frame));
    assert_eq!(frame.kind().unwrap(), ReplyKind::Reply(Opcode::WIFI_SEARCH_POLL));

    let mut payload = frame.payload().unwrap();
    let status = SearchStatus::decode(&mut payload).unwrap();
    assert_eq!(
        status,
        SearchStatus::Found {
            ssid: "clockwork".into(),
            rssi: -67,
            private: true,
        }
    );
    assert!(payload.is_empty());
}

#[test]
fn test_retry_frame() {
    let frame = InboundFrame::new(Bytes::from_static(&[0]));
    assert_eq!(frame.kind().unwrap(), ReplyKind::Retry);
}

#[test]
fn test_truncated_reply_is_an_error() {
    let frame = InboundFrame::new(Bytes::from_static(&[27, 2, b'x']));
    let mut payload = frame.payload().unwrap();
    assert!(matches!(
        SearchStatus::decode(&mut payload),
        Err(CodecError::Truncated { .. })
    ));
}

#[test]
fn test_oversized_field_rejects_whole_request() {
    let settings = WifiSettings {
        station: WifiCredentials {
            enabled: true,
            channel: 6,
            ssid: "a".repeat(33),
            password: String::new(),
        },
        access_point: WifiCredentials::default(),
    };

    let err = WifiSettingsSet(settings).to_packet().unwrap_err();
    assert_eq!(err, CodecError::TextTooLong { len: 33, size: 33 });
}

#[test]
fn test_wifi_settings_frame_size() {
    let packet = WifiSettingsSet(WifiSettings::default()).to_packet().unwrap();
    // opcode + 2 × (enabled + channel + ssid + password)
    assert_eq!(packet.len(), 1 + 2 * (1 + 1 + 33 + 13));
}

#[test]
fn test_scene_reply_frame() {
    // Connected network scene: neons 0 and 2 lit (bits 0x01, 0x02), shown for 5 s
    let mut frame = vec![23u8, 1, 0x82];
    frame.extend(std::iter::repeat([0x10, 0x20, 0x30]).take(6).flatten());
    frame.extend_from_slice(&[0x03, 2, 2, 0, 3, 1, 5]);

    let frame = InboundFrame::new(Bytes::from(frame));
    assert_eq!(frame.kind().unwrap(), ReplyKind::Reply(Opcode::CNET_SETTINGS_GET));

    let mut payload = frame.payload().unwrap();
    let scene = SceneSettings::decode(&mut payload).unwrap();
    assert!(payload.is_empty());

    let display: DisplaySettings = scene.display;
    assert_eq!(display.backlight.smooth, 2);
    assert_eq!(display.backlight.mode, 2);
    assert_eq!(display.backlight.colors[5].r, 0x20);
    assert_eq!(display.backlight.colors[5].g, 0x10);
    assert!(display.neons.is_lit(0));
    assert!(display.neons.is_lit(2));
    assert!(!display.neons.is_lit(1));
    assert_eq!(display.digit_effect, 3);
    assert!(scene.enabled);
    assert_eq!(scene.timeout, 5);
}

#[test]
fn test_heat_reply_frame() {
    let frame = InboundFrame::new(Bytes::from_static(&[17, 4, 0x60]));
    let mut payload = frame.payload().unwrap();
    let heat = HeatSettings::decode(&mut payload).unwrap();

    assert_eq!(HeatSettingsGet::OPCODE, Opcode::HEAT_SETTINGS_GET);
    assert_eq!(heat.hour, 4);
    // Saturday and Sunday
    assert!(heat.runs_on(5) && heat.runs_on(6));
    assert!(!heat.runs_on(0));
}
