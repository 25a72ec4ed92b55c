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

//! The buffered line channel shared by the control connection and text-mode data connections.
//!
//! [`Session`](crate::Session) and [`DataStream`](crate::DataStream) each own one of these. The
//! actual socket I/O (and the idle-callback gate, for data channels) is supplied by the caller as
//! a closure, so this type only ever deals in bytes.

use crate::options::LINE_BUFFER_SIZE;

/// Logging target for the file.
const LOG_TARGET: &str = "ftpc::buffer";

/// Outcome of one underlying recv attempt, as reported by the closure passed to
/// [`LineBuffer::read_line`].
pub(crate) enum RecvOutcome {
    /// `n` fresh bytes are available at the front of the scratch slice.
    Data(usize),
    /// Orderly end-of-stream.
    Eof,
    /// The idle callback requested cancellation while waiting for data.
    Cancelled,
}

/// Fixed-size buffered reader/writer, decoupled from any particular socket type.
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
    /// Offset of the next unread byte.
    get: usize,
    /// Number of unread bytes starting at `get`.
    avail: usize,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buf: vec![0u8; LINE_BUFFER_SIZE],
            get: 0,
            avail: 0,
        }
    }

    /// Read a line (up to and including `\n`) into `out`, capped at `max` bytes.
    ///
    /// `recv` is called whenever the buffer needs more bytes than it currently holds; it performs
    /// one underlying read (including any idle-wait/callback retries) and reports the result via
    /// [`RecvOutcome`].
    ///
    /// A `\r\n` terminator has its `\r` dropped; the returned length accounts for the drop.
    /// Returns `Ok(0)` on an orderly end-of-stream with nothing buffered, and leaves `out`
    /// containing whatever was assembled so far if `recv` reports [`RecvOutcome::Cancelled`]
    /// (matching the original's short-read-on-cancellation behavior).
    pub(crate) fn read_line(
        &mut self,
        out: &mut Vec<u8>,
        max: usize,
        mut recv: impl FnMut(&mut [u8]) -> crate::Result<RecvOutcome>,
    ) -> crate::Result<usize> {
        out.clear();
        if max == 0 {
            return Ok(0);
        }

        let mut eof = false;
        loop {
            if self.avail > 0 {
                let take = std::cmp::min(max - out.len(), self.avail);
                let start = self.get;
                let chunk = &self.buf[start..start + take];

                if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
                    out.extend_from_slice(&chunk[..=pos]);
                    self.get += pos + 1;
                    self.avail -= pos + 1;

                    if out.len() >= 2 && out[out.len() - 2] == b'\r' {
                        out.remove(out.len() - 2);
                    }
                    return Ok(out.len());
                }

                out.extend_from_slice(chunk);
                self.get += take;
                self.avail -= take;
            }

            if out.len() >= max {
                return Ok(out.len());
            }
            if self.avail == 0 {
                self.get = 0;
            }
            if eof {
                return Ok(out.len());
            }

            if self.get + self.avail == self.buf.len() {
                self.buf.copy_within(self.get..self.get + self.avail, 0);
                self.get = 0;
            }

            match recv(&mut self.buf[self.get + self.avail..])? {
                RecvOutcome::Data(0) | RecvOutcome::Eof => eof = true,
                RecvOutcome::Data(n) => {
                    self.avail += n;
                    tracing::trace!(target: LOG_TARGET, bytes = n, "filled line buffer");
                }
                RecvOutcome::Cancelled => return Ok(out.len()),
            }
        }
    }

    /// Write `src`, translating bare `\n` to `\r\n`, flushing in `LINE_BUFFER_SIZE` chunks via
    /// `send`.
    ///
    /// `send` performs one underlying write of a full chunk (including any idle-wait/callback
    /// retries) and must return `Ok(())` only once every byte of the chunk it was given has been
    /// sent, or `Err(Error::Cancelled)` if the callback cancelled before any of it went out.
    ///
    /// On a cancelled flush, returns the number of *source* bytes consumed so far rather than an
    /// error, even though the internal buffer may have translated (and sent) more than that —
    /// see `DESIGN.md` for why this divergence is kept rather than tightened.
    pub(crate) fn write_line(
        &mut self,
        src: &[u8],
        mut send: impl FnMut(&[u8]) -> crate::Result<()>,
    ) -> crate::Result<usize> {
        let mut nb = 0usize;
        let mut last = 0u8;

        for (x, &byte) in src.iter().enumerate() {
            if byte == b'\n' && last != b'\r' {
                if nb == self.buf.len() {
                    if let Err(e) = send(&self.buf[..nb]) {
                        return cancelled_or_err(e, x);
                    }
                    nb = 0;
                }
                self.buf[nb] = b'\r';
                nb += 1;
            }
            if nb == self.buf.len() {
                if let Err(e) = send(&self.buf[..nb]) {
                    return cancelled_or_err(e, x);
                }
                nb = 0;
            }
            self.buf[nb] = byte;
            nb += 1;
            last = byte;
        }

        if nb > 0 {
            if let Err(e) = send(&self.buf[..nb]) {
                return cancelled_or_err(e, src.len());
            }
        }
        Ok(src.len())
    }
}

fn cancelled_or_err(e: crate::Error, consumed: usize) -> crate::Result<usize> {
    match e {
        crate::Error::Cancelled => Ok(consumed),
        other => Err(other),
    }
}
