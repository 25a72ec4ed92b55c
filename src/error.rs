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

/// `ftpc` error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the control or data socket.
    #[error("i/o error: `{0}`")]
    Io(#[from] std::io::Error),

    /// The server's reply didn't carry the expected leading digit.
    #[error("protocol error: expected `{}xx`, got `{response}`", *expected as char)]
    Protocol {
        /// Digit the caller required (`b'1'`..`b'5'`).
        expected: u8,
        /// Raw response text, verbatim.
        response: String,
    },

    /// An operation that blocks on socket readiness ran out of time.
    #[error("timeout: `{0}`")]
    Timeout(String),

    /// A caller-supplied argument or internal invariant was violated before any wire activity.
    #[error("precondition violated: `{0}`")]
    Precondition(String),

    /// The progress callback returned `false`.
    #[error("operation cancelled by callback")]
    Cancelled,

    /// A reply that is syntactically required to carry structured data (PASV, SIZE, PWD) didn't.
    #[error("malformed reply: `{0}`")]
    Malformed(String),
}
