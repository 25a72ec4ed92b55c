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

//! Reading a complete (possibly multi-line) server reply off the control channel.

use crate::buffer::{LineBuffer, RecvOutcome};
use crate::options::RESPONSE_BUFFER_SIZE;
use crate::Error;

use std::io::Read;
use std::net::TcpStream;

/// Logging target for the file.
const LOG_TARGET: &str = "ftpc::response";

fn recv(socket: &mut TcpStream, buf: &mut [u8]) -> crate::Result<RecvOutcome> {
    match socket.read(buf) {
        Ok(0) => Ok(RecvOutcome::Eof),
        Ok(n) => Ok(RecvOutcome::Data(n)),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Read one full reply (draining continuation lines) into `response`, replacing its previous
/// contents. The control channel has no idle-wait or cancellation concept, so a plain blocking
/// read backs every line.
///
/// Returns `true` if the reply's leading digit equals `expected_digit`.
pub(crate) fn read_response(
    buffer: &mut LineBuffer,
    socket: &mut TcpStream,
    response: &mut Vec<u8>,
    expected_digit: u8,
) -> crate::Result<bool> {
    let mut line = Vec::new();
    buffer.read_line(&mut line, RESPONSE_BUFFER_SIZE, |buf| recv(socket, buf))?;
    *response = line;

    if response.len() >= 4 && response[3] == b'-' {
        let prefix = [response[0], response[1], response[2], b' '];
        loop {
            let mut continuation = Vec::new();
            buffer.read_line(&mut continuation, RESPONSE_BUFFER_SIZE, |buf| {
                recv(socket, buf)
            })?;
            let is_final = continuation.len() >= 4 && continuation[..4] == prefix;
            *response = continuation;
            if is_final {
                break;
            }
        }
    }

    tracing::trace!(
        target: LOG_TARGET,
        response = %String::from_utf8_lossy(response),
        "read reply",
    );

    Ok(response.first() == Some(&expected_digit))
}
