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

//! The ephemeral data connection opened by [`Session::access`](crate::Session::access).

use crate::buffer::{LineBuffer, RecvOutcome};
use crate::options::Direction;
use crate::session::Session;
use crate::Error;

use std::io::{Read, Write};
use std::net::TcpStream;

/// Logging target for the file.
const LOG_TARGET: &str = "ftpc::stream";

/// Default scratch buffer size for [`DataStream::copy_to`]/[`DataStream::copy_from`].
const COPY_BUFFER_SIZE: usize = 8192;

/// An open FTP data connection, borrowed out of the [`Session`] it was opened from.
///
/// The `'a` borrow is the whole of the ownership story: while a `DataStream` is alive, the
/// compiler statically refuses any other use of its parent `Session` — there is no runtime
/// "one data stream at a time" flag to get out of sync, and no way to let a `DataStream` outlive
/// the control connection its final reply depends on.
pub struct DataStream<'a> {
    session: &'a mut Session,
    socket: TcpStream,
    buffer: Option<LineBuffer>,
    direction: Direction,
    total_bytes: u64,
    bytes_since_callback: u64,
    closed: bool,
    cancelled: bool,
}

impl<'a> DataStream<'a> {
    pub(crate) fn new(
        session: &'a mut Session,
        socket: TcpStream,
        text_mode: bool,
        direction: Direction,
    ) -> Self {
        Self {
            session,
            socket,
            buffer: text_mode.then(LineBuffer::new),
            direction,
            total_bytes: 0,
            bytes_since_callback: 0,
            closed: false,
            cancelled: false,
        }
    }

    /// Cumulative bytes transferred on this stream so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.total_bytes
    }

    /// Whether the progress callback has cancelled this stream (returned `false` at some point).
    /// A `0` return from [`Self::read`]/[`Self::write`] is otherwise ambiguous with a clean
    /// end-of-stream or full write; callers that need to tell the two apart (e.g. the `get`/`put`
    /// convenience wrappers deciding whether to discard a partial download) check this flag.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Defined for symmetry with [`Session::last_response`](crate::Session::last_response): a
    /// data stream has no response area of its own (its role is `read`/`write`, not `control`),
    /// so this always returns `None`.
    pub fn last_response(&self) -> Option<&str> {
        None
    }

    /// Read into `buf`. In text mode this reads at most one line per call (translating `\r\n` to
    /// `\n`, same as the control channel); in binary mode it reads whatever is immediately
    /// available, capped at `buf.len()`.
    ///
    /// Returns `0` both on an orderly end-of-stream and when the byte-threshold callback
    /// cancels — the same ambiguity the original client has, since by the time the callback
    /// fires the bytes for this call have already landed in `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> crate::Result<usize> {
        self.require_direction(Direction::Read)?;

        let n = if self.buffer.is_some() {
            let mut buffer = self.buffer.take().unwrap();
            let mut line = Vec::new();
            let result = buffer.read_line(&mut line, buf.len(), |chunk| self.recv_raw(chunk));
            self.buffer = Some(buffer);
            result?;
            buf[..line.len()].copy_from_slice(&line);
            line.len()
        } else {
            match self.recv_raw(buf)? {
                RecvOutcome::Data(n) => n,
                RecvOutcome::Eof | RecvOutcome::Cancelled => 0,
            }
        };

        self.account(n)
    }

    /// Write `buf`. In text mode, bare `\n` is translated to `\r\n`; in binary mode bytes pass
    /// through unmodified. Returns the number of *source* bytes consumed, which is `buf.len()`
    /// unless an idle-timeout cancellation cut the flush short.
    pub fn write(&mut self, buf: &[u8]) -> crate::Result<usize> {
        self.require_direction(Direction::Write)?;

        let n = if self.buffer.is_some() {
            let mut buffer = self.buffer.take().unwrap();
            let result = buffer.write_line(buf, |chunk| self.send_raw(chunk));
            self.buffer = Some(buffer);
            result?
        } else {
            self.send_raw(buf)?;
            buf.len()
        };

        self.account(n)
    }

    /// Copy every byte read on this stream into `sink`. Intended for `RETR`/`LIST`/`NLST`/`MLSD`
    /// streams.
    ///
    /// A clean end-of-stream returns `Ok(total)`; a progress-callback cancellation returns
    /// [`Error::Cancelled`] instead, with `total` lost — callers that want to keep whatever was
    /// copied before cancelling should drive [`Self::read`] directly.
    pub fn copy_to(&mut self, sink: &mut impl Write) -> crate::Result<u64> {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                if self.cancelled {
                    return Err(Error::Cancelled);
                }
                break;
            }
            sink.write_all(&buf[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Write every byte read from `source` onto this stream. Intended for `STOR` streams.
    ///
    /// A progress-callback cancellation returns [`Error::Cancelled`], same as [`Self::copy_to`].
    pub fn copy_from(&mut self, source: &mut impl Read) -> crate::Result<u64> {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = source.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let mut sent = 0;
            while sent < n {
                let w = self.write(&buf[sent..n])?;
                if w == 0 {
                    return Err(Error::Cancelled);
                }
                sent += w;
            }
            total += n as u64;
        }
        Ok(total)
    }

    /// Shut down the data socket and read the control channel's final `226`/`250`-class reply.
    ///
    /// Called automatically on drop if not called explicitly; calling it directly lets transfer
    /// failures surface as a returned `Err` instead of being swallowed at drop time.
    pub fn close(mut self) -> crate::Result<()> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> crate::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let _ = self.socket.shutdown(std::net::Shutdown::Both);

        // The final `2xx` completion reply is only pending if the last thing read off the
        // control channel wasn't already a failure — a `4xx`/`5xx` means the server has nothing
        // more to say about this transfer.
        if matches!(self.session.last_response_leading_digit(), Some(b'4') | Some(b'5')) {
            return Ok(());
        }
        if !self.session.read_reply(b'2')? {
            return Err(self.session.protocol_error(b'2'));
        }
        Ok(())
    }

    fn require_direction(&self, expected: Direction) -> crate::Result<()> {
        if self.direction == expected {
            Ok(())
        } else {
            Err(Error::Precondition(format!(
                "{expected:?} attempted on a {:?} data stream",
                self.direction
            )))
        }
    }

    fn account(&mut self, n: usize) -> crate::Result<usize> {
        if n == 0 {
            return Ok(0);
        }
        self.total_bytes += n as u64;
        let opts = &mut self.session.callback;
        if opts.byte_threshold == 0 {
            return Ok(n);
        }
        let Some(callback) = opts.callback.as_mut() else {
            return Ok(n);
        };
        self.bytes_since_callback += n as u64;
        if self.bytes_since_callback > opts.byte_threshold {
            self.bytes_since_callback = 0;
            if !callback(self.total_bytes) {
                tracing::trace!(target: LOG_TARGET, "byte-threshold callback cancelled transfer");
                self.cancelled = true;
                return Ok(0);
            }
        }
        Ok(n)
    }

    /// One underlying recv, blocking on the idle-timeout interval and invoking the callback on
    /// each tick if one is registered and applicable. `Ok(RecvOutcome::Cancelled)` means the
    /// callback returned `false` before any data arrived.
    fn recv_raw(&mut self, buf: &mut [u8]) -> crate::Result<RecvOutcome> {
        let interval = Some(&self.session.callback)
            .filter(|c| c.applies_to_transfer() && !c.idle_time.is_zero())
            .map(|c| c.idle_time);

        let Some(interval) = interval else {
            return match self.socket.read(buf) {
                Ok(0) => Ok(RecvOutcome::Eof),
                Ok(n) => Ok(RecvOutcome::Data(n)),
                Err(e) => Err(Error::Io(e)),
            };
        };

        self.socket.set_read_timeout(Some(interval))?;
        loop {
            match self.socket.read(buf) {
                Ok(0) => return Ok(RecvOutcome::Eof),
                Ok(n) => return Ok(RecvOutcome::Data(n)),
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    let total = self.total_bytes;
                    let callback = self
                        .session
                        .callback
                        .callback
                        .as_mut()
                        .expect("checked above");
                    if !callback(total) {
                        self.cancelled = true;
                        return Ok(RecvOutcome::Cancelled);
                    }
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// One underlying send of a full chunk, with the same idle-timeout/callback gating as
    /// [`Self::recv_raw`]. Returns `Err(Error::Cancelled)` if the callback cancels before the
    /// chunk finishes going out.
    fn send_raw(&mut self, mut chunk: &[u8]) -> crate::Result<()> {
        let interval = Some(&self.session.callback)
            .filter(|c| c.applies_to_transfer() && !c.idle_time.is_zero())
            .map(|c| c.idle_time);
        self.socket.set_write_timeout(interval)?;

        while !chunk.is_empty() {
            match self.socket.write(chunk) {
                Ok(0) => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "data socket accepted zero bytes",
                    )))
                }
                Ok(n) => chunk = &chunk[n..],
                Err(e)
                    if interval.is_some()
                        && matches!(
                            e.kind(),
                            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                        ) =>
                {
                    let total = self.total_bytes;
                    let callback = self
                        .session
                        .callback
                        .callback
                        .as_mut()
                        .expect("checked above");
                    if !callback(total) {
                        return Err(Error::Cancelled);
                    }
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }
}

impl Drop for DataStream<'_> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close_inner() {
                tracing::warn!(target: LOG_TARGET, error = %e, "data stream close on drop failed");
            }
        }
    }
}
