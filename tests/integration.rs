//! Integration tests for adbwire.
//!
//! Each test plays the server side of the wire protocol, either over an
//! in-memory duplex pipe or a real loopback TCP socket, and drives the
//! client through a complete exchange.

use std::time::Duration;

use adbwire::protocol::{build_frame, Command, Frame, FrameBuffer};
use adbwire::{run_session, AdbError, Client, Connection, LOCAL_STREAM_ID};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const REMOTE_CONN_ID: u32 = 0x1234;
const REMOTE_STREAM_ID: u32 = 0x10;
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Read one complete frame from the client side of the wire.
async fn read_frame<S>(stream: &mut S, buffer: &mut FrameBuffer) -> Frame
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        if let Some(frame) = buffer.next_frame().unwrap() {
            return frame;
        }
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "client closed the connection mid-script");
        buffer.extend(&buf[..n]);
    }
}

/// Accept the CNXN greeting and answer it, then accept the OPEN.
///
/// Returns the OPEN frame so tests can assert on the shell request.
async fn accept_handshake<S>(stream: &mut S, buffer: &mut FrameBuffer) -> Frame
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let cnxn = read_frame(stream, buffer).await;
    assert_eq!(cnxn.command(), Command::Cnxn);

    stream
        .write_all(&build_frame(Command::Cnxn, REMOTE_CONN_ID, 4096, b"device::"))
        .await
        .unwrap();

    let open = read_frame(stream, buffer).await;
    assert_eq!(open.command(), Command::Open);
    assert_eq!(open.arg0(), LOCAL_STREAM_ID);
    assert_eq!(open.arg1(), REMOTE_CONN_ID);
    open
}

#[tokio::test]
async fn test_happy_path_shell_exchange() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        let open = accept_handshake(&mut server_side, &mut buffer).await;
        assert_eq!(open.payload(), b"shell: echo hi \0");

        server_side
            .write_all(&build_frame(
                Command::Okay,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"",
            ))
            .await
            .unwrap();
        server_side
            .write_all(&build_frame(
                Command::Wrte,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"hi\n",
            ))
            .await
            .unwrap();

        let ack = read_frame(&mut server_side, &mut buffer).await;
        assert_eq!(ack.command(), Command::Okay);
        assert_eq!(ack.arg0(), LOCAL_STREAM_ID);
        assert_eq!(ack.arg1(), REMOTE_STREAM_ID);

        server_side
            .write_all(&build_frame(
                Command::Clse,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"",
            ))
            .await
            .unwrap();

        let echo = read_frame(&mut server_side, &mut buffer).await;
        assert_eq!(echo.command(), Command::Clse);
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("echo hi").unwrap();
    let output = run_session(&mut client_side, &mut conn, greeting, IO_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(output, "hi\n");
    server.await.unwrap();
}

#[tokio::test]
async fn test_immediate_rejection_yields_empty_success() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        accept_handshake(&mut server_side, &mut buffer).await;

        // Reject the stream outright, no WRTE
        server_side
            .write_all(&build_frame(
                Command::Clse,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"",
            ))
            .await
            .unwrap();

        let echo = read_frame(&mut server_side, &mut buffer).await;
        assert_eq!(echo.command(), Command::Clse);
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("echo hi").unwrap();
    let output = run_session(&mut client_side, &mut conn, greeting, IO_TIMEOUT)
        .await
        .unwrap();

    // Empty but successful, distinct from an error
    assert_eq!(output, "");
    server.await.unwrap();
}

#[tokio::test]
async fn test_batched_frames_processed_in_one_delivery() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        accept_handshake(&mut server_side, &mut buffer).await;

        // OKAY + two WRTEs + CLSE concatenated into a single write
        let mut batch = build_frame(Command::Okay, REMOTE_STREAM_ID, LOCAL_STREAM_ID, b"");
        batch.extend(build_frame(
            Command::Wrte,
            REMOTE_STREAM_ID,
            LOCAL_STREAM_ID,
            b"first ",
        ));
        batch.extend(build_frame(
            Command::Wrte,
            REMOTE_STREAM_ID,
            LOCAL_STREAM_ID,
            b"second",
        ));
        batch.extend(build_frame(
            Command::Clse,
            REMOTE_STREAM_ID,
            LOCAL_STREAM_ID,
            b"",
        ));
        server_side.write_all(&batch).await.unwrap();

        // Two acks and the close echo come back
        for expected in [Command::Okay, Command::Okay, Command::Clse] {
            let frame = read_frame(&mut server_side, &mut buffer).await;
            assert_eq!(frame.command(), expected);
        }
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("cat file").unwrap();
    let output = run_session(&mut client_side, &mut conn, greeting, IO_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(output, "first second");
    server.await.unwrap();
}

#[tokio::test]
async fn test_auth_challenge_fails_the_connection() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        let cnxn = read_frame(&mut server_side, &mut buffer).await;
        assert_eq!(cnxn.command(), Command::Cnxn);

        // Demand authentication instead of accepting
        server_side
            .write_all(&build_frame(Command::Auth, 1, 0, b"challenge-token-data"))
            .await
            .unwrap();
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("echo hi").unwrap();
    let err = run_session(&mut client_side, &mut conn, greeting, IO_TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdbError::UnexpectedCommand {
            command: Command::Auth,
            ..
        }
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn test_corrupt_magic_fails_the_connection() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        accept_handshake(&mut server_side, &mut buffer).await;

        let mut bytes = build_frame(Command::Okay, REMOTE_STREAM_ID, LOCAL_STREAM_ID, b"");
        bytes[20] ^= 0xFF;
        server_side.write_all(&bytes).await.unwrap();
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("echo hi").unwrap();
    let err = run_session(&mut client_side, &mut conn, greeting, IO_TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, AdbError::FramingCorruption(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_disconnect_mid_stream_carries_partial_output() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        accept_handshake(&mut server_side, &mut buffer).await;

        server_side
            .write_all(&build_frame(
                Command::Okay,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"",
            ))
            .await
            .unwrap();
        server_side
            .write_all(&build_frame(
                Command::Wrte,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"partial out",
            ))
            .await
            .unwrap();

        // Wait for the ack so the write side is drained, then vanish
        let ack = read_frame(&mut server_side, &mut buffer).await;
        assert_eq!(ack.command(), Command::Okay);
        drop(server_side);
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("cat big").unwrap();
    let err = run_session(&mut client_side, &mut conn, greeting, IO_TIMEOUT)
        .await
        .unwrap_err();

    match err {
        AdbError::Disconnected { partial } => assert_eq!(partial, b"partial out"),
        other => panic!("unexpected error: {}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let (mut client_side, mut server_side) = tokio::io::duplex(4096);

    let server = tokio::spawn(async move {
        let mut buffer = FrameBuffer::new();
        let cnxn = read_frame(&mut server_side, &mut buffer).await;
        assert_eq!(cnxn.command(), Command::Cnxn);

        // Hold the socket open without ever answering
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(server_side);
    });

    let mut conn = Connection::new("test-device");
    let greeting = conn.start("echo hi").unwrap();
    let err = run_session(
        &mut client_side,
        &mut conn,
        greeting,
        Duration::from_millis(100),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AdbError::Timeout));
    server.abort();
}

#[tokio::test]
async fn test_client_shell_over_loopback_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buffer = FrameBuffer::new();

        let open = accept_handshake(&mut stream, &mut buffer).await;
        assert_eq!(open.payload(), b"shell: uname -a \0");

        stream
            .write_all(&build_frame(
                Command::Okay,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"",
            ))
            .await
            .unwrap();
        stream
            .write_all(&build_frame(
                Command::Wrte,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"Linux localhost\n",
            ))
            .await
            .unwrap();

        let ack = read_frame(&mut stream, &mut buffer).await;
        assert_eq!(ack.command(), Command::Okay);

        stream
            .write_all(&build_frame(
                Command::Clse,
                REMOTE_STREAM_ID,
                LOCAL_STREAM_ID,
                b"",
            ))
            .await
            .unwrap();

        let echo = read_frame(&mut stream, &mut buffer).await;
        assert_eq!(echo.command(), Command::Clse);
    });

    let mut client = Client::builder().host("127.0.0.1").port(port).build();

    let output = client.shell("uname -a").await.unwrap();
    assert_eq!(output, "Linux localhost\n");
    server.await.unwrap();

    // The connection slot is free again after a completed exchange
    let second = client.shell("echo again").await;
    assert!(second.is_err()); // nothing is listening anymore
}

#[tokio::test]
async fn test_connect_failure_releases_the_slot() {
    // Port from a listener we immediately drop: connection refused
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = Client::builder()
        .host("127.0.0.1")
        .port(port)
        .io_timeout(Duration::from_millis(200))
        .build();

    let first = client.shell("echo hi").await;
    assert!(matches!(first, Err(AdbError::Transport(_))));

    // A failed attempt must not leave the client busy
    let second = client.shell("echo hi").await;
    assert!(matches!(second, Err(AdbError::Transport(_))));
}
