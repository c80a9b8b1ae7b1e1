//! Blocking TCP helpers with bounded timeouts

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use burrow_navigation::Url;

use crate::error::FetchError;
use crate::Result;

/// Connect to the address of `url`, trying each resolved address in turn.
///
/// Reads and writes on the returned stream time out after `timeout`.
pub fn connect(url: &Url, timeout: Duration) -> Result<TcpStream> {
    let addr = url.address();
    let candidates = addr
        .to_socket_addrs()
        .map_err(|source| FetchError::Connection {
            addr: addr.clone(),
            source,
        })?;

    let mut last_error = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(timeout))
                    .and_then(|_| stream.set_write_timeout(Some(timeout)))
                    .map_err(|source| FetchError::Connection {
                        addr: addr.clone(),
                        source,
                    })?;
                tracing::debug!(addr = %addr, resolved = %candidate, "Connected");
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => io_error(&addr, e),
        None => FetchError::Connection {
            addr: addr.clone(),
            source: std::io::Error::new(ErrorKind::NotFound, "no addresses resolved"),
        },
    })
}

/// Write a request and read the response to end-of-stream
pub fn exchange<S: Read + Write>(stream: &mut S, addr: &str, request: &[u8]) -> Result<Vec<u8>> {
    stream
        .write_all(request)
        .and_then(|_| stream.flush())
        .map_err(|e| io_error(addr, e))?;

    let mut body = Vec::new();
    match stream.read_to_end(&mut body) {
        Ok(_) => Ok(body),
        // peers that close without a TLS close_notify still sent a full body
        Err(e) if e.kind() == ErrorKind::UnexpectedEof && !body.is_empty() => Ok(body),
        Err(e) => Err(io_error(addr, e)),
    }
}

pub fn io_error(addr: &str, source: std::io::Error) -> FetchError {
    match source.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => FetchError::Timeout {
            addr: addr.to_string(),
        },
        _ => FetchError::Connection {
            addr: addr.to_string(),
            source,
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// One-shot loopback server: records the first request line and
    /// answers with `response`.
    pub fn serve_once(response: Vec<u8>) -> (u16, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            reader.read_line(&mut request).unwrap();
            tx.send(request).unwrap();

            let mut stream = stream;
            stream.write_all(&response).unwrap();
        });

        (port, rx)
    }
}
