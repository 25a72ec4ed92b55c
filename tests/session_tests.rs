//! End-to-end scenarios driving [`ftpc::Session`] against the mock control server in
//! `tests/common`.

mod common;

use common::{init_tracing, open_pasv, parse_port_command, read_line, send_line, spawn_control};
use ftpc::{AccessType, ConnectionMode, Error, Session, TransferMode};
use std::io::{Cursor, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn simple_login_and_list() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "331 send password");
        assert_eq!(read_line(&mut reader), "PASS x");
        send_line(&mut writer, "230 logged in");
        assert_eq!(read_line(&mut reader), "TYPE A");
        send_line(&mut writer, "200 type set to A");
        assert_eq!(read_line(&mut reader), "PASV");
        let data_listener = open_pasv(&mut writer);
        assert_eq!(read_line(&mut reader), "LIST .");
        send_line(&mut writer, "150 opening ASCII mode data connection");
        let (mut data, _) = data_listener.accept().unwrap();
        data.write_all(b"file1\r\nfile2\r\n").unwrap();
        let _ = data.shutdown(std::net::Shutdown::Both);
        send_line(&mut writer, "226 transfer complete");
        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "x").unwrap();

    let mut listing = Vec::new();
    session
        .list(".", AccessType::ListVerbose, &mut listing)
        .unwrap();
    assert_eq!(listing, b"file1\nfile2\n");
    assert!(session.last_response().unwrap().starts_with("226"));

    session.quit().unwrap();
    server.join().unwrap();
}

#[test]
fn text_mode_round_trip() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "331 send password");
        assert_eq!(read_line(&mut reader), "PASS x");
        send_line(&mut writer, "230 logged in");

        assert_eq!(read_line(&mut reader), "TYPE A");
        send_line(&mut writer, "200 type set to A");
        assert_eq!(read_line(&mut reader), "PASV");
        let data_listener = open_pasv(&mut writer);
        assert_eq!(read_line(&mut reader), "STOR roundtrip.txt");
        send_line(&mut writer, "150 opening ASCII mode data connection");
        let (mut data, _) = data_listener.accept().unwrap();
        let mut received = Vec::new();
        data.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"abc\r\ndef\r\n");
        send_line(&mut writer, "226 transfer complete");

        assert_eq!(read_line(&mut reader), "TYPE A");
        send_line(&mut writer, "200 type set to A");
        assert_eq!(read_line(&mut reader), "PASV");
        let data_listener = open_pasv(&mut writer);
        assert_eq!(read_line(&mut reader), "RETR roundtrip.txt");
        send_line(&mut writer, "150 opening ASCII mode data connection");
        let (mut data, _) = data_listener.accept().unwrap();
        data.write_all(&received).unwrap();
        let _ = data.shutdown(std::net::Shutdown::Both);
        send_line(&mut writer, "226 transfer complete");

        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "x").unwrap();

    let sent = session
        .store(
            "roundtrip.txt",
            TransferMode::Ascii,
            &mut Cursor::new(b"abc\ndef\n".to_vec()),
        )
        .unwrap();
    assert_eq!(sent, 8);

    let mut out = Vec::new();
    let received = session
        .retrieve("roundtrip.txt", TransferMode::Ascii, &mut out)
        .unwrap();
    assert_eq!(received, 8);
    assert_eq!(out, b"abc\ndef\n");

    session.quit().unwrap();
    server.join().unwrap();
}

#[test]
fn progress_cancellation_unlinks_partial_download() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "331 send password");
        assert_eq!(read_line(&mut reader), "PASS x");
        send_line(&mut writer, "230 logged in");
        assert_eq!(read_line(&mut reader), "TYPE I");
        send_line(&mut writer, "200 type set to I");
        assert_eq!(read_line(&mut reader), "PASV");
        let data_listener = open_pasv(&mut writer);
        assert_eq!(read_line(&mut reader), "RETR huge.bin");
        send_line(&mut writer, "150 opening BINARY mode data connection");
        let (mut data, _) = data_listener.accept().unwrap();
        let payload = vec![b'x'; 100 * 1024];
        // The client cancels partway through; a write error here just means it stopped reading.
        let _ = data.write_all(&payload);
        let _ = data.shutdown(std::net::Shutdown::Both);
        send_line(&mut writer, "226 transfer complete");
        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "x").unwrap();

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    session.set_callback(
        Box::new(move |_bytes| {
            flag.store(true, Ordering::SeqCst);
            false
        }),
        Duration::ZERO,
        4096,
    );

    let path = std::env::temp_dir().join(format!("ftpc-test-{}.bin", std::process::id()));
    let result = session.get(Some(&path), "huge.bin", TransferMode::Image);

    assert!(cancelled.load(Ordering::SeqCst));
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(!path.exists(), "partial download should have been removed");

    session.quit().unwrap();
    server.join().unwrap();
}

#[test]
fn user_accepted_without_password() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "230 OK, no password needed");
        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "unused").unwrap();
    assert!(session.last_response().unwrap().starts_with("230"));

    session.quit().unwrap();
    server.join().unwrap();
}

#[test]
fn session_survives_failed_command() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "331 send password");
        assert_eq!(read_line(&mut reader), "PASS x");
        send_line(&mut writer, "230 logged in");
        assert_eq!(read_line(&mut reader), "DELE nonexistent");
        send_line(&mut writer, "550 No such file or directory");
        assert_eq!(read_line(&mut reader), "PWD");
        send_line(&mut writer, "257 \"/home/anon\" is the current directory");
        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "x").unwrap();

    match session.delete("nonexistent") {
        Err(Error::Protocol { expected, response }) => {
            assert_eq!(expected, b'2');
            assert!(response.starts_with("550"));
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }

    let cwd = session.pwd().unwrap();
    assert_eq!(cwd, "/home/anon");

    session.quit().unwrap();
    server.join().unwrap();
}

#[test]
fn active_mode_transfer() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "331 send password");
        assert_eq!(read_line(&mut reader), "PASS x");
        send_line(&mut writer, "230 logged in");
        assert_eq!(read_line(&mut reader), "TYPE A");
        send_line(&mut writer, "200 type set to A");

        let port_cmd = read_line(&mut reader);
        let data_addr = parse_port_command(&port_cmd);
        send_line(&mut writer, "200 PORT command successful");

        assert_eq!(read_line(&mut reader), "LIST .");
        send_line(&mut writer, "150 opening ASCII mode data connection");

        // Active mode means the server, not the client, opens the data connection.
        let mut data = TcpStream::connect(data_addr).expect("connect to client's PORT listener");
        data.write_all(b"file1\r\nfile2\r\n").unwrap();
        let _ = data.shutdown(std::net::Shutdown::Both);
        send_line(&mut writer, "226 transfer complete");

        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "x").unwrap();
    session.set_connection_mode(ConnectionMode::Active);

    let mut listing = Vec::new();
    session
        .list(".", AccessType::ListVerbose, &mut listing)
        .unwrap();
    assert_eq!(listing, b"file1\nfile2\n");
    assert!(session.last_response().unwrap().starts_with("226"));

    session.quit().unwrap();
    server.join().unwrap();
}

#[test]
fn active_mode_control_channel_rejects_data_connection() {
    init_tracing();
    let (addr, server) = spawn_control(|mut writer, mut reader| {
        send_line(&mut writer, "220 mock ftp ready");
        assert_eq!(read_line(&mut reader), "USER anon");
        send_line(&mut writer, "331 send password");
        assert_eq!(read_line(&mut reader), "PASS x");
        send_line(&mut writer, "230 logged in");
        assert_eq!(read_line(&mut reader), "TYPE I");
        send_line(&mut writer, "200 type set to I");

        let port_cmd = read_line(&mut reader);
        let _ = parse_port_command(&port_cmd);
        send_line(&mut writer, "200 PORT command successful");

        assert_eq!(read_line(&mut reader), "RETR missing.bin");
        send_line(&mut writer, "150 opening BINARY mode data connection");
        // The server never actually opens the data connection it just promised; it reports
        // failure on the control channel instead, which the client must notice ahead of its
        // accept() timeout rather than block for the full 30s.
        send_line(&mut writer, "425 Can't open data connection");

        assert_eq!(read_line(&mut reader), "QUIT");
        send_line(&mut writer, "221 goodbye");
    });

    let mut session = Session::connect(addr).unwrap();
    session.login("anon", "x").unwrap();
    session.set_connection_mode(ConnectionMode::Active);

    let mut sink = Vec::new();
    let result = session.retrieve("missing.bin", TransferMode::Image, &mut sink);

    match result {
        Err(Error::Protocol { expected, response }) => {
            assert_eq!(expected, b'2');
            assert!(response.contains("425"));
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }

    session.quit().unwrap();
    server.join().unwrap();
}
