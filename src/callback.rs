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

/// Idle/progress callback.
///
/// Invoked with the cumulative number of bytes transferred on the current data stream. Returning
/// `false` cancels the in-flight operation; any library operation this happens during surfaces
/// [`Error::Cancelled`](crate::Error::Cancelled) or a short read/write, per the call site.
///
/// The callback runs synchronously on the caller's thread, inside whatever `read`/`write`/`wait`
/// call is currently blocked. It must not call back into the [`Session`](crate::Session) it is
/// attached to — there is no reference available to do so, but a callback that blocks for a long
/// time blocks the transfer it is reporting on.
pub type Callback = Box<dyn FnMut(u64) -> bool + Send>;

/// Bundle of callback-related [`Session`](crate::Session) options.
///
/// Mirrors the keys of the original client's `FtpSetCallback`/`set_options` surface, minus the
/// opaque `void*` argument: a Rust closure captures whatever state that argument used to carry.
/// Every [`Session`](crate::Session) carries one of these (not an `Option`) so that
/// `set_idle_time`/`set_byte_threshold` can be called independently of registering a callback
/// function, matching the original's per-key `set_options`.
pub struct CallbackOptions {
    /// Function invoked on idle timeout and byte-threshold crossings, if one is registered.
    pub callback: Option<Callback>,
    /// How often (wall-clock) the callback fires while a wait is blocked.
    pub idle_time: Duration,
    /// How many bytes may pass before the callback fires, independent of `idle_time`.
    pub byte_threshold: u64,
}

impl std::fmt::Debug for CallbackOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackOptions")
            .field("callback", &self.callback.as_ref().map(|_| "<fn>"))
            .field("idle_time", &self.idle_time)
            .field("byte_threshold", &self.byte_threshold)
            .finish()
    }
}

impl Default for CallbackOptions {
    fn default() -> Self {
        Self {
            callback: None,
            idle_time: Duration::ZERO,
            byte_threshold: 0,
        }
    }
}

impl CallbackOptions {
    /// A [`DataStream`](crate::DataStream) only inherits the callback if one is registered *and*
    /// at least one of `idle_time`/`byte_threshold` is non-zero — matching the original's
    /// `openPort`, which leaves `idlecb` null otherwise even if a callback function was
    /// registered.
    pub(crate) fn applies_to_transfer(&self) -> bool {
        self.callback.is_some() && (!self.idle_time.is_zero() || self.byte_threshold != 0)
    }
}
