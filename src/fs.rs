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

//! `get`/`put` convenience wrappers over [`std::fs`], kept deliberately separate from the pure
//! transfer core in [`crate::stream`] — these are the only two functions in the crate that touch
//! the local filesystem.

use crate::options::TransferMode;
use crate::session::Session;

use std::fs::File;
use std::io;
use std::path::Path;

/// Logging target for the file.
const LOG_TARGET: &str = "ftpc::fs";

impl Session {
    /// Download `remote` into `local`, or into standard output if `local` is `None`.
    ///
    /// The local file is opened for writing and truncated; on any failure (including a failure
    /// partway through the transfer) a file that was created is removed rather than left
    /// truncated and partial.
    pub fn get(
        &mut self,
        local: Option<&Path>,
        remote: &str,
        mode: TransferMode,
    ) -> crate::Result<u64> {
        match local {
            Some(path) => {
                let mut file = File::create(path)?;
                match self.retrieve(remote, mode, &mut file) {
                    Ok(n) => Ok(n),
                    Err(e) => {
                        drop(file);
                        if let Err(remove_err) = std::fs::remove_file(path) {
                            tracing::warn!(
                                target: LOG_TARGET,
                                error = %remove_err,
                                path = %path.display(),
                                "failed to remove partial download after error",
                            );
                        }
                        Err(e)
                    }
                }
            }
            None => self.retrieve(remote, mode, &mut io::stdout()),
        }
    }

    /// Upload `local`, or standard input if `local` is `None`, to `remote`.
    pub fn put(
        &mut self,
        local: Option<&Path>,
        remote: &str,
        mode: TransferMode,
    ) -> crate::Result<u64> {
        match local {
            Some(path) => {
                let mut file = File::open(path)?;
                self.store(remote, mode, &mut file)
            }
            None => self.store(remote, mode, &mut io::stdin()),
        }
    }
}
