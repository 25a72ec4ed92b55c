//! Small helpers for driving a one-shot, in-process FTP control connection from a background
//! thread, used to exercise [`ftpc::Session`] end to end without a real FTP daemon.

use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;

/// Install a `tracing` subscriber for the duration of the test binary, so failures come with
/// trace-level logs from the crate under test. Safe to call from every test: `try_init` no-ops
/// once a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Bind an ephemeral control-channel listener and run `handler` against the first connection
/// accepted, on a background thread. Returns the bound address the test's [`ftpc::Session`]
/// should connect to, and a handle the test should join after its own session work is done.
pub fn spawn_control<F>(handler: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(TcpStream, BufReader<TcpStream>) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock control listener");
    let addr = listener.local_addr().expect("local_addr");

    let join = std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept control connection");
        let reader = BufReader::new(stream.try_clone().expect("clone control stream"));
        handler(stream, reader);
    });

    (addr, join)
}

/// Write `line` (without CRLF) followed by the wire terminator.
pub fn send_line(writer: &mut TcpStream, line: &str) {
    writer.write_all(line.as_bytes()).expect("write reply");
    writer.write_all(b"\r\n").expect("write reply terminator");
}

/// Read one CRLF/LF-terminated line, with the terminator stripped. Panics at EOF — every helper
/// caller knows exactly how many lines it expects.
pub fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    let n = reader.read_line(&mut line).expect("read command line");
    assert_ne!(n, 0, "control connection closed early");
    line.trim_end_matches(['\r', '\n']).to_string()
}

/// Bind an ephemeral data listener, reply `227 Entering Passive Mode (...)` on `writer`, and
/// return the listener for the caller to `accept()` once the transfer command itself has been
/// acknowledged (matching real PASV sequencing: `PASV` only promises a listening endpoint, the
/// connection itself is made after the transfer command's preliminary reply).
pub fn open_pasv(writer: &mut TcpStream) -> TcpListener {
    let data_listener = TcpListener::bind("127.0.0.1:0").expect("bind mock data listener");
    let port = data_listener.local_addr().expect("data local_addr").port();
    send_line(
        writer,
        &format!(
            "227 Entering Passive Mode (127,0,0,1,{},{}).",
            port >> 8,
            port & 0xff
        ),
    );
    data_listener
}

/// Parse an active-mode `PORT h1,h2,h3,h4,p1,p2` command back into the socket address the client
/// is listening on, for a mock server that plays the "connects out to the client" half of active
/// mode.
pub fn parse_port_command(cmd: &str) -> SocketAddr {
    let operand = cmd.strip_prefix("PORT ").expect("a PORT command");
    let octets: Vec<u16> = operand
        .split(',')
        .map(|part| part.parse().expect("decimal PORT operand"))
        .collect();
    let [h1, h2, h3, h4, p1, p2] = octets[..] else {
        panic!("PORT command did not carry exactly six operands: {cmd}");
    };
    let ip = Ipv4Addr::new(h1 as u8, h2 as u8, h3 as u8, h4 as u8);
    let port = (p1 << 8) | p2;
    SocketAddr::from((ip, port))
}
