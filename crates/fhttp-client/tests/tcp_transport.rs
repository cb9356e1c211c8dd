//! Framing tests for the TCP transport against a loopback listener.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use fhttp_client::{Failure, FlipperHttp, TcpTransport, Transport};
use fhttp_protocol::MAX_LINE_LENGTH;

/// Spawn a fake board that answers each received command with the next
/// list of chunks, written with a short pause between them.
fn spawn_board<S>(replies: Vec<Vec<S>>) -> (String, thread::JoinHandle<Vec<String>>)
where
    S: AsRef<str> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        let mut received = Vec::new();

        for chunks in replies {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            received.push(line);

            for chunk in chunks {
                writer.write_all(chunk.as_ref().as_bytes()).unwrap();
                writer.flush().unwrap();
                thread::sleep(Duration::from_millis(5));
            }
        }

        // Hold the link open until the client hangs up.
        let mut rest = String::new();
        let _ = reader.read_line(&mut rest);
        received
    });

    (address, handle)
}

#[test]
fn test_split_line_and_crlf() {
    let (address, board) = spawn_board(vec![vec!["[PO", "NG]\r", "\n"]]);

    let mut transport = TcpTransport::connect_tcp(address.as_str(), MAX_LINE_LENGTH).unwrap();
    transport.write(b"[PING]\n").unwrap();

    let line = transport.read_line(Duration::from_secs(2)).unwrap();
    assert_eq!(line, Some("[PONG]".to_string()));

    transport.close().unwrap();
    assert_eq!(board.join().unwrap(), vec!["[PING]\n".to_string()]);
}

#[test]
fn test_several_lines_in_one_chunk() {
    let (address, board) = spawn_board(vec![vec!["[GET/SUCCESS]\r\n\r\nhello\n[GET/END]\n"]]);

    let mut transport = TcpTransport::connect_tcp(address.as_str(), MAX_LINE_LENGTH).unwrap();
    transport.write(b"[GET]http://example.com\n").unwrap();

    let timeout = Duration::from_secs(2);
    assert_eq!(transport.read_line(timeout).unwrap(), Some("[GET/SUCCESS]".to_string()));
    assert_eq!(transport.read_line(timeout).unwrap(), Some("hello".to_string()));
    assert_eq!(transport.read_line(timeout).unwrap(), Some("[GET/END]".to_string()));
    assert_eq!(transport.buffered_len(), 0);

    transport.close().unwrap();
    board.join().unwrap();
}

#[test]
fn test_quiet_link_times_out() {
    let (address, board) = spawn_board(vec![Vec::<&str>::new()]);

    let mut transport = TcpTransport::connect_tcp(address.as_str(), MAX_LINE_LENGTH).unwrap();
    transport.write(b"[LED/ON]\n").unwrap();

    assert_eq!(transport.read_line(Duration::from_millis(50)).unwrap(), None);

    transport.close().unwrap();
    board.join().unwrap();
}

#[test]
fn test_client_over_tcp() {
    let (address, board) = spawn_board(vec![
        vec!["[PONG]\n"],
        vec!["[GET/SUCCESS]\n", "{\"fact\":\"Cats purr.\"}\n", "[GET/END]\n"],
    ]);

    let transport = TcpTransport::connect_tcp(address.as_str(), MAX_LINE_LENGTH).unwrap();
    let mut client = FlipperHttp::with_defaults(transport);

    assert!(client.ping().unwrap());
    assert_eq!(
        client.get_request("https://catfact.ninja/fact").unwrap(),
        "{\"fact\":\"Cats purr.\"}"
    );

    client.close().unwrap();
    assert_eq!(
        board.join().unwrap(),
        vec![
            "[PING]\n".to_string(),
            "[GET]https://catfact.ninja/fact\n".to_string(),
        ]
    );
}

#[test]
fn test_overlong_body_never_leaks_its_tail() {
    let body = format!("{{\"data\":\"{}\",\"end\":\"TAIL\"}}\n", "x".repeat(5000));
    let (address, board) = spawn_board(vec![
        vec!["[GET/SUCCESS]\n".to_string(), body, "[GET/END]\n".to_string()],
        vec!["[PONG]\n".to_string()],
    ]);

    let transport = TcpTransport::connect_tcp(address.as_str(), MAX_LINE_LENGTH).unwrap();
    let mut client = FlipperHttp::with_defaults(transport);

    let text = client.get_request("https://example.com/big").unwrap();
    assert_eq!(text, "");
    assert!(!text.contains("TAIL"));
    assert_eq!(client.last_failure(), Some(Failure::ProtocolMismatch));

    // The end marker was drained, so the next reply lines up.
    assert!(client.ping().unwrap());

    client.close().unwrap();
    board.join().unwrap();
}
