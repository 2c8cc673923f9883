use crate::{
    config::{Config, ResponseMode},
    error::{RconError, Result},
    session::Session,
};
use bytes::BytesMut;
use log::{debug, trace};
use tokio::{sync::Mutex, time::timeout};

/// Simple asynchronous rcon client. Call `connect()` to establish a connection
/// and authenticate.
///
/// Commands are serialized: an `exec` keeps the connection to itself from the
/// moment its command is written until its response has been read, so a
/// `Client` can be shared between tasks.
///
/// ## Example
/// ```no_run
/// use sourcon::client::Client;
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let host = "dev.viora.sh:27016";
///     let client = Client::connect(host, "<put rcon password here>").await?;
///     let response = client.exec("echo hi").await?;
///
///     assert_eq!(response.body(), "hi");
///     Ok(())
/// }
/// ```
pub struct Client {
    session: Mutex<Session>,
    response_mode: ResponseMode,
}

/// Container struct for a response that can be glued together from multiple
/// packets sharing one request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: i32,
    body: String,
}

impl Response {
    /// Decodes a body received from the server. Servers are not strict about
    /// encodings, so invalid UTF-8 is replaced rather than rejected.
    pub(crate) fn from_bytes(id: i32, body: &[u8]) -> Self {
        Response {
            id,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

impl Client {
    pub async fn connect(host: &str, password: &str) -> Result<Self> {
        Self::connect_with(host, password, Config::default()).await
    }

    pub async fn connect_with(host: &str, password: &str, config: Config) -> Result<Self> {
        let session = Session::open_with(host, password, config).await?;
        Ok(Self::from_session(session))
    }

    /// Wraps an already authenticated session, taking the response mode from
    /// its config.
    pub fn from_session(session: Session) -> Self {
        Client {
            response_mode: session.config().response_mode,
            session: Mutex::new(session),
        }
    }

    /// Run a rcon command and wait for its response. Responses to other
    /// request ids that show up in the meantime are dropped.
    pub async fn exec(&self, command: &str) -> Result<Response> {
        let mut session = self.session.lock().await;
        let id = session.write(command).await?;

        let mut body = loop {
            let (response_id, body) = session.read_body().await?;
            if response_id == id {
                break BytesMut::from(&body[..]);
            }
            trace!("discarding response for id {} (want {})", response_id, id);
        };

        if let ResponseMode::Drain { idle } = self.response_mode {
            // srcds never says how many packets a response spans, so collect
            // until it goes quiet. Fragments are split at byte boundaries and
            // only decoded once they are joined.
            while let Ok(next) = timeout(idle, session.read_body()).await {
                let (response_id, next) = match next {
                    Ok(next) => next,
                    Err(RconError::ReceiveError(e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        debug!("host closed the connection after id {}", id);
                        break;
                    }
                    Err(e) => return Err(e),
                };
                if response_id == id {
                    trace!("appending {} more bytes for id {}", next.len(), id);
                    body.extend_from_slice(&next);
                } else {
                    trace!("discarding response for id {} (want {})", response_id, id);
                }
            }
        }

        Ok(Response::from_bytes(id, &body))
    }

    /// Closes the connection once no command is in flight.
    pub async fn close(self) -> Result<()> {
        self.session.into_inner().close().await
    }
}
