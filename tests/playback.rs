use tinyspot::{
    client::Client,
    clock::ManualClock,
    config::Config,
    credentials::Credentials,
    error::ErrorKind,
    playback::{RepeatMode, MAX_DEVICES},
    session::TokenState,
    transport::{ScriptedTransport, Transport},
};

const CURRENTLY_PLAYING: &str = r#"{
    "timestamp": 1700000000000,
    "context": null,
    "progress_ms": 12345,
    "is_playing": true,
    "currently_playing_type": "track",
    "item": {
        "name": "Song",
        "uri": "spotify:track:6rqhFgbbKwnb9MLmUQDhG6",
        "duration_ms": 215000,
        "artists": [{ "name": "Featured", "uri": "spotify:artist:featured" }],
        "album": {
            "name": "Album",
            "uri": "spotify:album:1",
            "artists": [
                { "name": "Artist", "uri": "spotify:artist:1" },
                { "name": "Other", "uri": "spotify:artist:2" }
            ],
            "images": [
                { "url": "https://i.scdn.co/image/large", "height": 640, "width": 640 },
                { "url": "https://i.scdn.co/image/small", "height": 64, "width": 64 }
            ]
        }
    }
}"#;

const PLAYER: &str = r#"{
    "device": {
        "id": "5fbb3ba6aa454b5534c4ba43a8c7e8e45a63ad0e",
        "is_active": true,
        "is_private_session": false,
        "is_restricted": false,
        "name": "Kitchen speaker",
        "type": "Speaker",
        "volume_percent": 59
    },
    "shuffle_state": true,
    "repeat_state": "context",
    "progress_ms": 44272,
    "is_playing": false
}"#;

fn authorized(transport: ScriptedTransport) -> Client<ScriptedTransport, ManualClock> {
    let mut client = Client::with_clock(
        transport,
        Credentials::new("id", "secret", "refresh"),
        Config::default(),
        ManualClock::default(),
    );
    client
        .session_mut()
        .set_bearer_token("token", None)
        .unwrap();
    client
}

#[test]
fn currently_playing_is_decoded() {
    let mut transport = ScriptedTransport::new();
    transport.push_json(CURRENTLY_PLAYING);
    let mut client = authorized(transport);

    let playing = client.get_currently_playing(None).unwrap();
    assert!(playing.is_playing);
    assert_eq!(playing.progress_ms, 12345);
    assert_eq!(playing.duration_ms, 215_000);
    assert_eq!(playing.track_name, "Song");
    assert_eq!(playing.track_uri, "spotify:track:6rqhFgbbKwnb9MLmUQDhG6");
    assert_eq!(playing.album_name, "Album");
    assert_eq!(playing.first_artist_name, "Artist");
    assert_eq!(playing.first_artist_uri, "spotify:artist:1");
    assert_eq!(playing.image_url, "https://i.scdn.co/image/large");

    let request = client.transport().last_exchange().unwrap().request_text();
    assert!(request.starts_with("GET /v1/me/player/currently-playing HTTP/1.1\r\n"));
    assert!(request.contains("Host: api.spotify.com\r\n"));
    assert!(request.contains("Accept: application/json\r\n"));
    assert!(request.contains("Authorization: Bearer token\r\n"));
    assert!(request.contains("Cache-Control: no-cache\r\n"));
    assert!(request.ends_with("\r\n\r\n"));
}

#[test]
fn minimal_document_decodes_with_defaults() {
    let mut transport = ScriptedTransport::new();
    transport.push_json(r#"{"is_playing":true,"progress_ms":12345,"item":{"name":"Song"}}"#);
    let mut client = authorized(transport);

    let playing = client.get_currently_playing(None).unwrap();
    assert!(playing.is_playing);
    assert_eq!(playing.progress_ms, 12345);
    assert_eq!(playing.track_name, "Song");
    assert!(playing.first_artist_name.is_empty());
    assert!(playing.image_url.is_empty());
    assert_eq!(playing.duration_ms, 0);
}

#[test]
fn chunked_response_is_decoded() {
    let body = r#"{"is_playing":true,"progress_ms":7,"item":{"name":"Chunked"}}"#;
    let (head, tail) = body.split_at(20);
    let raw = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n\
         {:x}\r\n{head}\r\n{:x}\r\n{tail}\r\n0\r\n\r\n",
        head.len(),
        tail.len()
    );
    let mut transport = ScriptedTransport::new();
    transport.push_response(raw).with_read_limit(7);
    let mut client = authorized(transport);

    let playing = client.get_currently_playing(None).unwrap();
    assert_eq!(playing.track_name, "Chunked");
    assert_eq!(playing.progress_ms, 7);
}

#[test]
fn market_is_sent_as_query() {
    let mut transport = ScriptedTransport::new();
    transport.push_json("{}").push_json("{}");
    let mut client = authorized(transport);

    client.get_currently_playing(Some("SE")).unwrap();
    assert_eq!(
        client.transport().last_exchange().unwrap().request_line(),
        "GET /v1/me/player/currently-playing?market=SE HTTP/1.1"
    );

    client.get_player_details(Some("DE")).unwrap();
    assert_eq!(
        client.transport().last_exchange().unwrap().request_line(),
        "GET /v1/me/player?market=DE HTTP/1.1"
    );
}

#[test]
fn malformed_market_sends_nothing() {
    let mut transport = ScriptedTransport::new();
    transport.push_json("{}");
    let mut client = authorized(transport);

    let err = client.get_currently_playing(Some("S&E")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert!(client.transport().exchanges().is_empty());
}

#[test]
fn unauthorized_returns_error_and_nothing_else() {
    let mut transport = ScriptedTransport::new();
    transport.push_status(
        401,
        r#"{"error":{"status":401,"message":"The access token expired"}}"#,
    );
    let mut client = authorized(transport);

    let err = client.get_currently_playing(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(client.session().state(), TokenState::Expiring);
}

#[test]
fn nothing_playing_is_not_found() {
    let mut transport = ScriptedTransport::new();
    transport.push_response("HTTP/1.1 204 No Content\r\n\r\n");
    let mut client = authorized(transport);

    let err = client.get_currently_playing(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn garbage_status_line_is_data_loss() {
    let mut transport = ScriptedTransport::new();
    transport.push_response("GARBAGE\r\n\r\n{}");
    let mut client = authorized(transport);

    let err = client.get_player_details(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DataLoss);
    assert!(!client.transport().is_connected());
}

#[test]
fn truncated_or_empty_body_is_invalid_argument() {
    let mut transport = ScriptedTransport::new();
    transport.push_json(r#"{"is_playing":tr"#).push_json("");
    let mut client = authorized(transport);

    let err = client.get_player_details(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let err = client.get_player_details(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn wrong_field_type_fails_whole_fetch() {
    let mut transport = ScriptedTransport::new();
    transport.push_json(r#"{"is_playing":true,"progress_ms":"soon"}"#);
    let mut client = authorized(transport);

    assert!(client.get_currently_playing(None).is_err());
}

#[test]
fn player_details_are_decoded() {
    let mut transport = ScriptedTransport::new();
    transport.push_json(PLAYER);
    let mut client = authorized(transport);

    let details = client.get_player_details(None).unwrap();
    assert_eq!(details.device.id, "5fbb3ba6aa454b5534c4ba43a8c7e8e45a63ad0e");
    assert_eq!(details.device.name, "Kitchen speaker");
    assert_eq!(details.device.kind, "Speaker");
    assert_eq!(details.device.volume_percent, 59);
    assert!(details.device.is_active);
    assert!(details.shuffle_state);
    assert!(!details.is_playing);
    assert_eq!(details.progress_ms, 44272);
    assert_eq!(details.repeat_state, RepeatMode::Context);
}

#[test]
fn repeat_mode_round_trips_through_command_and_decoder() {
    for mode in [RepeatMode::Track, RepeatMode::Context, RepeatMode::Off] {
        let mut transport = ScriptedTransport::new();
        transport
            .push_status(204, "")
            .push_json(&format!(r#"{{"repeat_state":"{mode}"}}"#));
        let mut client = authorized(transport);

        client.set_repeat_mode(mode, None).unwrap();
        let sent = client.transport().last_exchange().unwrap().request_line();
        assert_eq!(sent, format!("PUT /v1/me/player/repeat?state={mode} HTTP/1.1"));

        let details = client.get_player_details(None).unwrap();
        assert_eq!(details.repeat_state, mode);
    }
}

#[test]
fn first_device_and_device_list() {
    let devices = r#"{"devices":[
        {"id":"a","name":"Phone","type":"Smartphone","is_active":false,"volume_percent":100},
        {"id":"b","name":"Laptop","type":"Computer","is_active":true,"volume_percent":null}
    ]}"#;
    let mut transport = ScriptedTransport::new();
    transport
        .push_json(devices)
        .push_json(devices)
        .push_json(r#"{"devices":[]}"#);
    let mut client = authorized(transport);

    let first = client.first_device().unwrap();
    assert_eq!(first.id, "a");
    assert_eq!(first.name, "Phone");

    let all = client.devices().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].kind, "Computer");
    assert_eq!(all[1].volume_percent, 0);
    assert!(all[1].is_active);

    let err = client.first_device().unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn device_list_is_capped() {
    let list: Vec<String> = (0..12)
        .map(|i| format!(r#"{{"id":"{i}","name":"Device {i}"}}"#))
        .collect();
    let mut transport = ScriptedTransport::new();
    transport.push_json(&format!(r#"{{"devices":[{}]}}"#, list.join(",")));
    let mut client = authorized(transport);

    let devices = client.devices().unwrap();
    assert_eq!(devices.len(), MAX_DEVICES);
    assert_eq!(devices[7].name, "Device 7");
}

#[test]
fn long_fields_are_truncated_not_rejected() {
    let name = "ä".repeat(40);
    let mut transport = ScriptedTransport::new();
    transport.push_json(&format!(r#"{{"item":{{"name":"{name}"}}}}"#));
    let mut client = authorized(transport);

    let playing = client.get_currently_playing(None).unwrap();
    // 31 two-byte characters fit in 63 bytes.
    assert_eq!(playing.track_name.chars().count(), 31);
    assert!(name.starts_with(playing.track_name.as_str()));
}
