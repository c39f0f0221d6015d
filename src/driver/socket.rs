use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use crate::interpreter::CommandInterpreter;
use crate::logging::{LogLevel, Logger, json_kv, json_str};

use super::line::{LOG_TARGET, LineDriver};
use super::DriverResult;

/// TCP transport. Each connection is a separate session with its own
/// interpreter from `factory`, served line by line until the peer hangs up.
pub struct SocketDriver<F>
where
    F: FnMut() -> CommandInterpreter,
{
    listener: TcpListener,
    factory: F,
    logger: Option<Logger>,
}

impl<F> SocketDriver<F>
where
    F: FnMut() -> CommandInterpreter,
{
    pub fn bind<A>(addr: A, factory: F) -> DriverResult<Self>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            factory,
            logger: None,
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn local_addr(&self) -> DriverResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections one after another, forever. A failed session is
    /// logged and the next connection is accepted.
    pub fn run(mut self) -> DriverResult<()> {
        loop {
            if let Err(err) = self.serve_one() {
                self.log(
                    LogLevel::Warn,
                    "session_failed",
                    [json_str("error", err.to_string())],
                );
            }
        }
    }

    /// Accept a single connection and serve it to completion. Returns the
    /// number of results written to the peer.
    pub fn serve_one(&mut self) -> DriverResult<usize> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true).ok();
        self.log(LogLevel::Info, "session_opened", [json_str("peer", peer.to_string())]);

        let written = self.serve_stream(stream)?;
        self.log(
            LogLevel::Info,
            "session_closed",
            [json_str("peer", peer.to_string()), json_kv("results", written)],
        );
        Ok(written)
    }

    fn serve_stream(&mut self, stream: TcpStream) -> DriverResult<usize> {
        let reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        let mut driver = LineDriver::new((self.factory)());
        driver.run(reader, &mut writer)
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            logger.emit(level, LOG_TARGET, message, fields);
        }
    }
}
