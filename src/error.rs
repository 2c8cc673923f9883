use thiserror::Error;
use tokio::time::error::Elapsed;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned if the password was rejected. The server signals this by
    /// answering the auth packet with a request id other than ours.
    #[error("bad password")]
    AuthFailed,
    /// Returned if neither of the two reads allowed during auth produced an
    /// auth response.
    #[error("invalid response type during auth: {0}")]
    InvalidAuthResponse(i32),
    /// Returned if a packet declares a size below the protocol minimum.
    #[error("unexpected packet format (declared size {0})")]
    UnexpectedFormat(i32),
    /// Returned before any I/O if a command body does not fit in one packet.
    #[error("command too long ({0} bytes)")]
    CommandTooLong(usize),
    /// Returned if the server declares a packet larger than we can ever hold.
    #[error("response too long (declared size {0})")]
    ResponseTooLong(i32),
    /// Returned if the host is down or behind a firewall.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] std::io::Error),
    /// The stream was successfully established, but there was a problem
    /// writing to the socket.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// The stream was successfully established, but there was a problem
    /// reading from the socket (including the server closing it).
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
    /// Returned if the server did not respond in time.
    #[error("timeout")]
    TimeoutError(#[from] Elapsed),
}

pub type Result<T> = std::result::Result<T, RconError>;
