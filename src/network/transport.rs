//! Socket transport
//!
//! A duplex byte stream over TCP or a unix domain socket.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::config::Endpoint;
use crate::error::{LockwireError, Result};

/// An established socket
#[derive(Debug)]
pub enum Transport {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Transport {
    /// Connect to an endpoint
    ///
    /// For TCP every resolved address is tried in turn; the last failure is
    /// reported.
    pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Self> {
        let connect_error = |source: io::Error| LockwireError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        match endpoint {
            Endpoint::Tcp { host, port } => {
                let addrs = (host.as_str(), *port).to_socket_addrs().map_err(connect_error)?;

                let mut last_error = None;
                for addr in addrs {
                    let attempt = match timeout {
                        Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                        None => TcpStream::connect(addr),
                    };
                    match attempt {
                        Ok(stream) => {
                            // Disable Nagle's algorithm for low latency
                            stream.set_nodelay(true).map_err(connect_error)?;
                            return Ok(Transport::Tcp(stream));
                        }
                        Err(e) => last_error = Some(e),
                    }
                }

                Err(connect_error(last_error.unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
                })))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixStream::connect(path)
                .map(Transport::Unix)
                .map_err(connect_error),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(connect_error(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            ))),
        }
    }

    /// Clone the handle (both refer to the same socket)
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Transport::Tcp(stream) => stream.try_clone().map(Transport::Tcp),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.try_clone().map(Transport::Unix),
        }
    }

    /// Apply the same timeout to reads and writes
    pub fn set_timeouts(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
            #[cfg(unix)]
            Transport::Unix(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
        }
    }

    /// Shut down both directions
    pub fn shutdown(&self) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.flush(),
        }
    }
}
