// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! The control connection and the public command facade built on top of it.

use crate::buffer::LineBuffer;
use crate::callback::{Callback, CallbackOptions};
use crate::options::{
    AccessType, ConnectionMode, TransferMode, ACCEPT_TIMEOUT, COMMAND_BUFFER_SIZE,
    DEFAULT_CONTROL_PORT,
};
use crate::pasv::{format_port_command, parse_pasv_reply, parse_pwd_reply, parse_size_reply};
use crate::response::read_response;
use crate::stream::DataStream;
use crate::Error;

use std::io::Write as _;
use std::net::{IpAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Logging target for the file.
const LOG_TARGET: &str = "ftpc::session";

/// What to do with the data socket once the preliminary reply is handled in
/// [`Session::access`].
enum PendingData {
    Connected(TcpStream),
    Listening(TcpListener),
}

/// A synchronous FTP control connection.
///
/// Owns exactly one TCP control channel and, transiently, at most one [`DataStream`] — the
/// latter is enforced at compile time: [`DataStream::<'a>`] borrows the `Session` it was opened
/// from for its entire lifetime, so the borrow checker refuses a second concurrent data transfer
/// and refuses a `Session` method call that would race with one already in flight.
pub struct Session {
    control: TcpStream,
    buffer: LineBuffer,
    response: Vec<u8>,
    mode: ConnectionMode,
    pub(crate) callback: CallbackOptions,
}

impl Session {
    /// Connect to `addr` and read the server's greeting (expected `220`).
    pub fn connect(addr: impl ToSocketAddrs) -> crate::Result<Self> {
        let control = TcpStream::connect(addr)?;
        Self::from_control_stream(control)
    }

    /// Connect to `host` on the default control port ([`DEFAULT_CONTROL_PORT`]).
    pub fn connect_host(host: &str) -> crate::Result<Self> {
        Self::connect((host, DEFAULT_CONTROL_PORT))
    }

    fn from_control_stream(control: TcpStream) -> crate::Result<Self> {
        control.set_nodelay(true)?;
        let mut session = Self {
            control,
            buffer: LineBuffer::new(),
            response: Vec::new(),
            mode: ConnectionMode::default(),
            callback: CallbackOptions::default(),
        };
        if !session.read_reply(b'2')? {
            return Err(session.protocol_error(b'2'));
        }
        Ok(session)
    }

    /// `USER`, and `PASS` unless the server accepts `USER` alone with a `2xx`.
    pub fn login(&mut self, user: &str, pass: &str) -> crate::Result<()> {
        let matched = self.send_command(&format!("USER {user}"), b'3')?;
        if !matched {
            if self.response.first() == Some(&b'2') {
                tracing::trace!(target: LOG_TARGET, "server accepted USER without PASS");
                return Ok(());
            }
            return Err(self.protocol_error(b'3'));
        }
        self.command(&format!("PASS {pass}"), b'2')
    }

    /// `QUIT`. Consumes the session; the control socket closes on drop regardless of whether the
    /// server replies before that happens, matching the original client's unconditional teardown.
    pub fn quit(mut self) -> crate::Result<()> {
        let _ = self.send_command("QUIT", b'2');
        Ok(())
    }

    /// `SITE <command>`.
    pub fn site(&mut self, command: &str) -> crate::Result<()> {
        self.command(&format!("SITE {command}"), b'2')
    }

    /// `SYST`, returning the server's reported system type (the token immediately after the
    /// reply code).
    pub fn syst(&mut self) -> crate::Result<String> {
        self.command("SYST", b'2')?;
        let text = self.response_str();
        let rest = &text[4.min(text.len())..];
        let end = rest.find(' ').unwrap_or(rest.len());
        Ok(rest[..end].to_string())
    }

    /// `TYPE` followed by `SIZE <path>`.
    pub fn file_size(&mut self, path: &str, mode: TransferMode) -> crate::Result<u64> {
        self.command(&format!("TYPE {}", mode.code()), b'2')?;
        self.command(&format!("SIZE {path}"), b'2')?;
        parse_size_reply(self.response_str())
    }

    /// `MDTM <path>`, returning the raw `YYYYMMDDHHMMSS[.sss]` timestamp operand.
    pub fn mod_date(&mut self, path: &str) -> crate::Result<String> {
        self.command(&format!("MDTM {path}"), b'2')?;
        let text = self.response_str();
        Ok(text[4.min(text.len())..].to_string())
    }

    /// `CWD <path>`.
    pub fn change_dir(&mut self, path: &str) -> crate::Result<()> {
        self.command(&format!("CWD {path}"), b'2')
    }

    /// `CDUP`.
    pub fn change_dir_up(&mut self) -> crate::Result<()> {
        self.command("CDUP", b'2')
    }

    /// `MKD <path>`.
    pub fn make_dir(&mut self, path: &str) -> crate::Result<()> {
        self.command(&format!("MKD {path}"), b'2')
    }

    /// `RMD <path>`.
    pub fn remove_dir(&mut self, path: &str) -> crate::Result<()> {
        self.command(&format!("RMD {path}"), b'2')
    }

    /// `PWD`, returning the quoted working directory.
    pub fn pwd(&mut self) -> crate::Result<String> {
        self.command("PWD", b'2')?;
        parse_pwd_reply(self.response_str())
    }

    /// `DELE <path>`.
    pub fn delete(&mut self, path: &str) -> crate::Result<()> {
        self.command(&format!("DELE {path}"), b'2')
    }

    /// `RNFR <from>` followed by `RNTO <to>`.
    pub fn rename(&mut self, from: &str, to: &str) -> crate::Result<()> {
        self.command(&format!("RNFR {from}"), b'3')?;
        self.command(&format!("RNTO {to}"), b'2')
    }

    /// Open a data stream for `path` under `access_type`, in `mode`.
    ///
    /// `path` may be empty for [`AccessType::Nlst`]/[`AccessType::ListVerbose`]/
    /// [`AccessType::Mlsd`] (the server defaults to the working directory); it must be non-empty
    /// for [`AccessType::Retr`]/[`AccessType::Stor`].
    pub fn access(
        &mut self,
        path: &str,
        access_type: AccessType,
        mode: TransferMode,
    ) -> crate::Result<DataStream<'_>> {
        if access_type.requires_path() && path.is_empty() {
            return Err(Error::Precondition(
                "a non-empty path is required for RETR/STOR".into(),
            ));
        }

        self.command(&format!("TYPE {}", mode.code()), b'2')?;

        let direction = access_type.direction();
        let pending = self.open_data_socket()?;

        let mut cmd = access_type.command().to_string();
        if !path.is_empty() {
            cmd.push(' ');
            cmd.push_str(path);
        }
        let opened = self.send_command(&cmd, b'1');
        let opened = match opened {
            Ok(v) => v,
            Err(e) => {
                shutdown_pending(&pending);
                return Err(e);
            }
        };
        if !opened {
            shutdown_pending(&pending);
            return Err(self.protocol_error(b'1'));
        }

        let socket = match pending {
            PendingData::Connected(stream) => stream,
            PendingData::Listening(listener) => self.accept_connection(listener)?,
        };
        socket.set_nodelay(true)?;

        let text_mode = mode == TransferMode::Ascii;
        tracing::trace!(target: LOG_TARGET, ?access_type, ?direction, "data stream opened");
        Ok(DataStream::new(self, socket, text_mode, direction))
    }

    /// Convenience: download `remote` as `LIST`/`NLST`/`MLSD`/`RETR` output, copying every byte
    /// read to `sink`. Returns the number of bytes copied.
    pub fn retrieve(
        &mut self,
        remote: &str,
        mode: TransferMode,
        sink: &mut impl std::io::Write,
    ) -> crate::Result<u64> {
        let mut stream = self.access(remote, AccessType::Retr, mode)?;
        let n = stream.copy_to(sink)?;
        stream.close()?;
        Ok(n)
    }

    /// Convenience: upload every byte read from `source` as a `STOR`. Returns the number of bytes
    /// sent.
    pub fn store(
        &mut self,
        remote: &str,
        mode: TransferMode,
        source: &mut impl std::io::Read,
    ) -> crate::Result<u64> {
        let mut stream = self.access(remote, AccessType::Stor, mode)?;
        let n = stream.copy_from(source)?;
        stream.close()?;
        Ok(n)
    }

    /// List `path` (or the working directory, if empty) with `access_type`, copying raw listing
    /// bytes to `sink`.
    pub fn list(
        &mut self,
        path: &str,
        access_type: AccessType,
        sink: &mut impl std::io::Write,
    ) -> crate::Result<u64> {
        if matches!(access_type, AccessType::Retr | AccessType::Stor) {
            return Err(Error::Precondition(
                "list() requires a listing AccessType (Nlst/ListVerbose/Mlsd)".into(),
            ));
        }
        let mut stream = self.access(path, access_type, TransferMode::Ascii)?;
        let n = stream.copy_to(sink)?;
        stream.close()?;
        Ok(n)
    }

    /// Switch between [`ConnectionMode::Passive`] (default) and [`ConnectionMode::Active`] for
    /// subsequently opened data streams.
    pub fn set_connection_mode(&mut self, mode: ConnectionMode) {
        self.mode = mode;
    }

    /// Register a progress/idle callback. Replaces any previously registered callback.
    ///
    /// Sets the callback closure, idle-time, and byte-threshold fields atomically, mirroring the
    /// original client's `FtpSetCallback`.
    pub fn set_callback(&mut self, callback: Callback, idle_time: Duration, byte_threshold: u64) {
        self.set_callback_options(CallbackOptions {
            callback: Some(callback),
            idle_time,
            byte_threshold,
        });
    }

    /// Register a progress/idle callback from an already-assembled [`CallbackOptions`].
    pub fn set_callback_options(&mut self, options: CallbackOptions) {
        self.callback = options;
    }

    /// Set how often (wall-clock) the idle callback fires while a data-channel wait is blocked,
    /// independent of registering a callback function.
    pub fn set_idle_time(&mut self, idle_time: Duration) {
        self.callback.idle_time = idle_time;
    }

    /// Set how many bytes may pass on a data channel before the callback fires, independent of
    /// `idle_time`.
    pub fn set_byte_threshold(&mut self, byte_threshold: u64) {
        self.callback.byte_threshold = byte_threshold;
    }

    /// Remove a previously registered callback and zero its associated thresholds.
    pub fn clear_callback(&mut self) {
        self.callback = CallbackOptions::default();
    }

    /// Raw bytes of the last reply read off the control channel, as sent by the server
    /// (including its trailing line terminator).
    pub fn last_response(&self) -> Option<&str> {
        std::str::from_utf8(&self.response).ok()
    }

    /// The leading digit of the last reply read off the control channel, if any — used by
    /// [`DataStream::close`](crate::DataStream::close) to decide whether a final completion
    /// reply is still pending.
    pub(crate) fn last_response_leading_digit(&self) -> Option<u8> {
        self.response.first().copied()
    }

    /// `response` with any trailing `\r`/`\n` trimmed, for internal field extraction.
    fn response_str(&self) -> &str {
        std::str::from_utf8(&self.response)
            .unwrap_or("")
            .trim_end_matches(['\r', '\n'])
    }

    pub(crate) fn protocol_error(&self, expected: u8) -> Error {
        Error::Protocol {
            expected,
            response: self.response_str().to_string(),
        }
    }

    pub(crate) fn read_reply(&mut self, expected_digit: u8) -> crate::Result<bool> {
        read_response(
            &mut self.buffer,
            &mut self.control,
            &mut self.response,
            expected_digit,
        )
    }

    /// Send `cmd` (appending the `\r\n` terminator) and read the reply, returning whether its
    /// leading digit is `expected_digit`.
    pub(crate) fn send_command(&mut self, cmd: &str, expected_digit: u8) -> crate::Result<bool> {
        if cmd.len() + 2 > COMMAND_BUFFER_SIZE {
            return Err(Error::Precondition(format!(
                "command exceeds the {COMMAND_BUFFER_SIZE}-byte limit: {cmd}"
            )));
        }
        tracing::trace!(target: LOG_TARGET, command = cmd, "sending command");
        self.control.write_all(cmd.as_bytes())?;
        self.control.write_all(b"\r\n")?;
        self.read_reply(expected_digit)
    }

    /// Like [`Self::send_command`], but turns a non-matching reply into `Err`.
    fn command(&mut self, cmd: &str, expected_digit: u8) -> crate::Result<()> {
        if self.send_command(cmd, expected_digit)? {
            Ok(())
        } else {
            Err(self.protocol_error(expected_digit))
        }
    }

    /// Establish the data socket per [`Self::mode`]: connect for `Passive`, listen for `Active`.
    /// Issues `PASV`/`PORT` as needed but does not yet send the transfer command itself.
    fn open_data_socket(&mut self) -> crate::Result<PendingData> {
        match self.mode {
            ConnectionMode::Passive => {
                self.command("PASV", b'2')?;
                let addr = parse_pasv_reply(self.response_str())?;
                let stream = TcpStream::connect(addr)?;
                Ok(PendingData::Connected(stream))
            }
            ConnectionMode::Active => {
                let local = self.control.local_addr()?;
                let bind_ip = match local.ip() {
                    IpAddr::V4(v4) => v4,
                    IpAddr::V6(_) => {
                        return Err(Error::Precondition(
                            "active mode requires an IPv4 control connection".into(),
                        ))
                    }
                };
                let listener = TcpListener::bind((bind_ip, 0))?;
                let bound = listener.local_addr()?;
                let bound = std::net::SocketAddrV4::new(bind_ip, bound.port());
                self.command(&format_port_command(bound), b'2')?;
                Ok(PendingData::Listening(listener))
            }
        }
    }

    /// Active-mode only: wait up to [`ACCEPT_TIMEOUT`] for the server to connect back to
    /// `listener`. A reply arriving on the control channel first means the server rejected the
    /// data connection instead of opening it; that reply is consumed and surfaced as a protocol
    /// error.
    fn accept_connection(&mut self, listener: TcpListener) -> crate::Result<TcpStream> {
        let deadline = Instant::now() + ACCEPT_TIMEOUT;
        listener.set_nonblocking(true)?;
        self.control.set_nonblocking(true)?;

        let outcome = loop {
            match listener.accept() {
                Ok((stream, _)) => break Ok(stream),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => break Err(Error::Io(e)),
            }

            match self.control.peek(&mut [0u8; 1]) {
                Ok(_) => {
                    let _ = self.read_reply(b'2');
                    let response = self.response_str().to_string();
                    break Err(Error::Protocol {
                        expected: b'2',
                        response: format!("data connection rejected before accept: {response}"),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => break Err(Error::Io(e)),
            }

            if Instant::now() >= deadline {
                break Err(Error::Timeout(
                    "accept connection timed out waiting for the server to open the active-mode \
                     data connection"
                        .into(),
                ));
            }
            std::thread::sleep(Duration::from_millis(10));
        };

        let _ = self.control.set_nonblocking(false);
        let stream = outcome?;
        stream.set_nonblocking(false)?;
        Ok(stream)
    }
}

fn shutdown_pending(pending: &PendingData) {
    let _ = match pending {
        PendingData::Connected(s) => s.shutdown(std::net::Shutdown::Both),
        PendingData::Listening(_) => Ok(()),
    };
}
