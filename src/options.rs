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

use std::time::Duration;

/// Default TCP port of the control channel.
pub const DEFAULT_CONTROL_PORT: u16 = 21;

/// Size of the line buffer used for the control channel and for text-mode data channels.
pub const LINE_BUFFER_SIZE: usize = 4096;

/// Cap on the bytes retained from the most recent server reply.
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

/// Cap on a rendered command, including the trailing CRLF.
pub const COMMAND_BUFFER_SIZE: usize = 1024;

/// Timeout applied while waiting for the passive peer to `accept()` an active-mode data
/// connection.
pub const ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the data channel for a transfer is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// The server advertises a listening endpoint via `PASV` and the client connects to it.
    ///
    /// Default mode for a freshly connected [`Session`](crate::Session).
    Passive,

    /// The client advertises a listening endpoint via `PORT` and the server connects to it.
    Active,
}

impl Default for ConnectionMode {
    fn default() -> Self {
        Self::Passive
    }
}

/// Transfer representation negotiated with `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// `TYPE A` — text mode; `\n` is translated to `\r\n` on the wire and back on read.
    Ascii,

    /// `TYPE I` — binary mode; bytes pass through unmodified.
    Image,
}

impl TransferMode {
    /// The single ASCII character sent as the `TYPE` operand.
    pub(crate) fn code(self) -> char {
        match self {
            Self::Ascii => 'A',
            Self::Image => 'I',
        }
    }
}

/// Which command [`Session::access`](crate::Session::access) should issue and in which direction
/// the resulting [`DataStream`](crate::DataStream) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// `NLST` — bare directory listing, read direction.
    Nlst,
    /// `LIST` — verbose directory listing, read direction.
    ListVerbose,
    /// `MLSD` — machine-parsable directory listing, read direction.
    Mlsd,
    /// `RETR` — file download, read direction. Requires a non-empty path.
    Retr,
    /// `STOR` — file upload, write direction. Requires a non-empty path.
    Stor,
}

impl AccessType {
    pub(crate) fn command(self) -> &'static str {
        match self {
            Self::Nlst => "NLST",
            Self::ListVerbose => "LIST",
            Self::Mlsd => "MLSD",
            Self::Retr => "RETR",
            Self::Stor => "STOR",
        }
    }

    pub(crate) fn direction(self) -> Direction {
        match self {
            Self::Stor => Direction::Write,
            _ => Direction::Read,
        }
    }

    /// Whether the operand is semantically required (as opposed to `Retr`/`Stor`'s callers
    /// passing `"."` for the listing variants).
    pub(crate) fn requires_path(self) -> bool {
        matches!(self, Self::Retr | Self::Stor)
    }
}

/// Direction of an open [`DataStream`](crate::DataStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes flow from the server to the client.
    Read,
    /// Bytes flow from the client to the server.
    Write,
}
