use tinyspot::{
    client::Client,
    clock::ManualClock,
    config::Config,
    credentials::Credentials,
    error::ErrorKind,
    session::TokenState,
    transport::ScriptedTransport,
};

const T0: u64 = 1_000_000;

fn client(transport: ScriptedTransport, clock: &ManualClock) -> Client<ScriptedTransport, ManualClock> {
    Client::with_clock(
        transport,
        Credentials::new("id", "secret", "refresh"),
        Config::default(),
        clock.clone(),
    )
}

#[test]
fn token_is_reused_until_margin_then_refreshed() {
    let clock = ManualClock::starting_at(T0);
    let mut transport = ScriptedTransport::new();
    transport
        .push_json(r#"{"access_token":"first","token_type":"Bearer","expires_in":60}"#)
        .push_json("{}")
        .push_json(r#"{"access_token":"second","token_type":"Bearer","expires_in":60}"#)
        .push_json("{}");
    let mut client = client(transport, &clock);

    client.refresh_access_token().unwrap();
    assert_eq!(client.token_state(), TokenState::Authenticated);

    // One millisecond before the two second margin kicks in.
    clock.set(T0 + 57_999);
    assert!(!client.check_and_refresh_access_token().unwrap());
    client.get_player_details(None).unwrap();
    assert_eq!(client.transport().exchanges().len(), 2);

    clock.set(T0 + 58_000);
    assert_eq!(client.token_state(), TokenState::Expiring);
    client.get_player_details(None).unwrap();
    assert_eq!(client.access_token(), Some("second"));

    let exchanges = client.transport().exchanges();
    assert_eq!(exchanges.len(), 4);
    assert_eq!(exchanges[2].host, "accounts.spotify.com");
    assert!(exchanges[3]
        .request_text()
        .contains("Authorization: Bearer second\r\n"));
}

#[test]
fn refresh_request_is_form_encoded() {
    let clock = ManualClock::starting_at(T0);
    let mut transport = ScriptedTransport::new();
    transport.push_json(r#"{"access_token":"tok","expires_in":3600}"#);
    let mut client = Client::with_clock(
        transport,
        Credentials::new("id", "s3cr3t&more", "re=fresh"),
        Config::default(),
        clock,
    );

    client.refresh_access_token().unwrap();

    let exchange = client.transport().last_exchange().unwrap();
    assert_eq!(exchange.host, "accounts.spotify.com");
    assert_eq!(exchange.port, 443);
    let request = exchange.request_text();
    assert!(request.starts_with("POST /api/token HTTP/1.1\r\n"));
    assert!(request.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
    assert!(request.ends_with(
        "\r\n\r\ngrant_type=refresh_token&refresh_token=re%3Dfresh&client_id=id&client_secret=s3cr3t%26more"
    ));
}

#[test]
fn rotated_refresh_token_is_kept() {
    let clock = ManualClock::starting_at(T0);
    let mut transport = ScriptedTransport::new();
    transport.push_json(r#"{"access_token":"tok","expires_in":3600,"refresh_token":"rotated"}"#);
    let mut client = client(transport, &clock);

    client.refresh_access_token().unwrap();
    assert_eq!(client.refresh_token(), "rotated");
}

#[test]
fn explicit_refresh_failure_keeps_session() {
    let clock = ManualClock::starting_at(T0);
    let mut transport = ScriptedTransport::new();
    transport
        .push_json(r#"{"access_token":"first","expires_in":3600}"#)
        .push_status(503, "");
    let mut client = client(transport, &clock);

    client.refresh_access_token().unwrap();
    let err = client.refresh_access_token().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unavailable);
    assert_eq!(client.access_token(), Some("first"));
    assert_eq!(client.token_state(), TokenState::Authenticated);
}

#[test]
fn gate_failure_drops_stale_token() {
    let clock = ManualClock::starting_at(T0);
    let mut transport = ScriptedTransport::new();
    transport
        .push_json(r#"{"access_token":"first","expires_in":10}"#)
        .push_response("HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nnot json!");
    let mut client = client(transport, &clock);

    client.refresh_access_token().unwrap();
    clock.advance(8_000);
    assert_eq!(client.token_state(), TokenState::Expiring);

    assert!(client.check_and_refresh_access_token().is_err());
    assert_eq!(client.token_state(), TokenState::Unauthenticated);
    assert_eq!(client.access_token(), None);
}

#[test]
fn refresh_without_credentials_sends_nothing() {
    let clock = ManualClock::starting_at(T0);
    let mut client = Client::with_clock(
        ScriptedTransport::new(),
        Credentials::new("id", "secret", ""),
        Config::default(),
        clock,
    );

    let err = client.refresh_access_token().unwrap_err();
    assert_eq!(err.kind, ErrorKind::FailedPrecondition);
    assert!(client.transport().exchanges().is_empty());
}

#[test]
fn code_exchange_stores_both_tokens() {
    let clock = ManualClock::starting_at(T0);
    let mut transport = ScriptedTransport::new();
    transport.push_json(
        r#"{"access_token":"access","token_type":"Bearer","scope":"user-read-playback-state",
            "expires_in":3600,"refresh_token":"long-lived"}"#,
    );
    let mut client = Client::with_clock(
        transport,
        Credentials::new("id", "secret", ""),
        Config::default(),
        clock,
    );

    let refresh_token = client
        .request_access_tokens("the-code", "http://localhost:8888/callback")
        .unwrap();
    assert_eq!(refresh_token, "long-lived");
    assert_eq!(client.access_token(), Some("access"));
    assert_eq!(client.token_state(), TokenState::Authenticated);

    let request = client.transport().last_exchange().unwrap().request_text();
    assert!(request.ends_with(
        "grant_type=authorization_code&code=the-code\
         &redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback&client_id=id&client_secret=secret"
    ));
}

#[test]
fn authorize_url_carries_client_and_scopes() {
    let client = Client::new(
        ScriptedTransport::new(),
        Credentials::new("id", "secret", ""),
        Config::default(),
    );

    let url = client
        .authorize_url(
            "http://localhost:8888/callback",
            &["user-read-playback-state", "user-modify-playback-state"],
        )
        .unwrap();
    assert_eq!(url.host_str(), Some("accounts.spotify.com"));
    assert_eq!(url.path(), "/authorize");

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("client_id".into(), "id".into())));
    assert!(pairs.contains(&("response_type".into(), "code".into())));
    assert!(pairs.contains(&(
        "scope".into(),
        "user-read-playback-state user-modify-playback-state".into()
    )));
}

#[test]
fn bearer_only_client_works_until_stale() {
    let mut transport = ScriptedTransport::new();
    transport.push_status(204, "");
    let mut client = Client::with_bearer_token(transport, "given", Config::default()).unwrap();

    client.pause(None).unwrap();
    assert!(client
        .transport()
        .last_exchange()
        .unwrap()
        .request_text()
        .contains("Authorization: Bearer given\r\n"));
}
