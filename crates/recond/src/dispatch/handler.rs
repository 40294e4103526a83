//! Connection handler reading one request and writing its response.

use std::io::{self, Read};
use std::sync::Arc;

use recon_jobs::{JobManager, ResultArchive};
use recon_plugins::PluginExecutor;
use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::errors::DispatchError;
use super::request::CommandRequest;
use super::response::ResponseWriter;
use super::router::{CommandRouter, DISPATCH_TARGET};

/// Largest accepted request line in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Parses and dispatches one JSONL request per connection.
pub(crate) struct DispatchConnectionHandler<E> {
    router: CommandRouter<E>,
}

impl<E: PluginExecutor + 'static> DispatchConnectionHandler<E> {
    pub(crate) const fn new(jobs: Arc<JobManager<E>>, archive: ResultArchive) -> Self {
        Self {
            router: CommandRouter::new(jobs, archive),
        }
    }

    fn dispatch(&self, mut stream: ConnectionStream) {
        let line = match read_request_line(&mut stream) {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                report(&mut ResponseWriter::new(&mut stream), &error);
                return;
            }
        };

        let mut writer = ResponseWriter::new(&mut stream);
        let request = match CommandRequest::parse(&line) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                report(&mut writer, &error);
                return;
            }
        };

        debug!(target: DISPATCH_TARGET, command = request.name(), "dispatching request");
        let status = match self.router.route(&request, &mut writer) {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    command = request.name(),
                    %error,
                    "request failed"
                );
                report(&mut writer, &error);
                return;
            }
        };
        if let Err(error) = writer.write_exit(status) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write exit");
        }
    }
}

impl<E: PluginExecutor + 'static> ConnectionHandler for DispatchConnectionHandler<E> {
    fn handle(&self, stream: ConnectionStream) {
        self.dispatch(stream);
    }
}

fn report<W: io::Write>(writer: &mut ResponseWriter<W>, error: &DispatchError) {
    if let Err(write_error) = writer.write_error(error) {
        debug!(target: DISPATCH_TARGET, error = %write_error, "client went away before error");
    }
}

/// Reads up to and including the first newline, or to EOF.
///
/// Returns `Ok(None)` when the client closes without sending anything.
fn read_request_line(stream: &mut impl Read) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let read = read_with_retry(stream, &mut chunk)?;
        if read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }
        let (received, _) = chunk.split_at(read);
        if let Some(newline) = received.iter().position(|byte| *byte == b'\n') {
            let (line, _) = received.split_at(newline + 1);
            buffer.extend_from_slice(line);
            enforce_limit(buffer.len())?;
            return Ok(Some(buffer));
        }
        buffer.extend_from_slice(received);
        enforce_limit(buffer.len())?;
    }
}

fn read_with_retry(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            result => return result,
        }
    }
}

fn enforce_limit(size: usize) -> Result<(), DispatchError> {
    if size > MAX_REQUEST_BYTES {
        return Err(DispatchError::request_too_large(size, MAX_REQUEST_BYTES));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::newline_terminated(b"{\"command\":\"list\"}\nextra".as_slice(), Some(b"{\"command\":\"list\"}\n".to_vec()))]
    #[case::eof_terminated(b"{\"command\":\"stats\"}".as_slice(), Some(b"{\"command\":\"stats\"}".to_vec()))]
    #[case::empty(b"".as_slice(), None)]
    fn reads_a_single_line(#[case] input: &[u8], #[case] expected: Option<Vec<u8>>) {
        let line = read_request_line(&mut Cursor::new(input)).expect("read line");
        assert_eq!(line, expected);
    }

    #[test]
    fn rejects_oversized_requests() {
        let input = vec![b'a'; MAX_REQUEST_BYTES + 1];
        let error = read_request_line(&mut Cursor::new(input)).expect_err("too large");
        assert!(matches!(error, DispatchError::RequestTooLarge { .. }));
        assert_eq!(error.exit_status(), 1);
    }
}
