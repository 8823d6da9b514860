use tinyspot::{
    client::Client, config::Config, credentials::Credentials, error::ErrorKind,
    image::IMAGE_ACCEPT, transport::ScriptedTransport,
};

fn client(transport: ScriptedTransport) -> Client<ScriptedTransport> {
    Client::new(transport, Credentials::default(), Config::default())
}

#[test]
fn image_is_streamed_into_sink() {
    let image: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    let mut raw = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        image.len()
    )
    .into_bytes();
    raw.extend_from_slice(&image);

    let mut transport = ScriptedTransport::new();
    transport.push_response(raw).with_read_limit(1460);
    let mut client = client(transport);

    let mut sink = Vec::new();
    let written = client
        .get_image("https://i.scdn.co/image/ab67616d0000b273", &mut sink)
        .unwrap();
    assert_eq!(written, 5000);
    assert_eq!(sink, image);

    let exchange = client.transport().last_exchange().unwrap();
    assert_eq!(exchange.host, "i.scdn.co");
    assert_eq!(
        exchange.request_line(),
        "GET /image/ab67616d0000b273 HTTP/1.1"
    );
    let request = exchange.request_text();
    assert!(request.contains(&format!("Accept: {IMAGE_ACCEPT}\r\n")));
    assert!(!request.contains("Authorization"));
    assert!(client.transport().pauses() > 1);
}

#[test]
fn plain_http_is_rejected_without_connecting() {
    let mut transport = ScriptedTransport::new();
    transport.push_status(200, "unused");
    let mut client = client(transport);

    let err = client
        .get_image("http://i.scdn.co/image/ab67", &mut Vec::new())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert!(client.transport().exchanges().is_empty());
    assert_eq!(client.transport().pending_responses(), 1);
}

#[test]
fn missing_image_is_an_error() {
    let mut transport = ScriptedTransport::new();
    transport.push_status(404, "");
    let mut client = client(transport);

    let mut sink = Vec::new();
    let err = client
        .get_image("https://i.scdn.co/image/gone", &mut sink)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(sink.is_empty());
}

#[test]
fn empty_or_unframed_image_is_an_error() {
    let mut transport = ScriptedTransport::new();
    transport
        .push_status(200, "")
        .push_response("HTTP/1.1 200 OK\r\n\r\nbytes until close");
    let mut client = client(transport);

    let err = client
        .get_image("https://i.scdn.co/image/empty", &mut Vec::new())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DataLoss);

    let err = client
        .get_image("https://i.scdn.co/image/unframed", &mut Vec::new())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DataLoss);
}

#[test]
fn chunked_image_is_streamed() {
    let mut transport = ScriptedTransport::new();
    transport.push_response(
        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
    );
    let mut client = client(transport);

    let mut sink = Vec::new();
    assert_eq!(
        client
            .get_image("https://i.scdn.co/image/chunked", &mut sink)
            .unwrap(),
        5
    );
    assert_eq!(sink, b"abcde");
}
