use std::{net::SocketAddr, pin::Pin};

use tokio::{
    io::AsyncWriteExt,
    net::{tcp::OwnedWriteHalf, TcpListener, TcpStream},
};
use tokio_stream::{Stream, StreamExt, StreamMap};
use tokio_util::{codec::FramedRead, sync::CancellationToken};

use crate::{
    ledger::Ledger,
    protocol::{Request, RequestCodec, Response},
    session::{ConnectionId, SessionTable},
};

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("failed to accept a connection: {0}")]
    Accept(#[source] tokio::io::Error),
}

// What a connection's read side produced
enum Event {
    Request(Request),
    Failed(tokio::io::Error),
    Closed,
}

type Inbound = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Serves every client from a single task.
///
/// The listener and the read side of every admitted connection are polled
/// together, and whichever is ready is handled to completion before the
/// next wait, so a ledger is only ever touched by one request at a time.
pub struct Server {
    listener: TcpListener,
    sessions: SessionTable<OwnedWriteHalf>,
    inbound: StreamMap<ConnectionId, Inbound>,
}

impl Server {
    pub fn new(listener: TcpListener, max_connections: Option<usize>) -> Self {
        Self {
            listener,
            sessions: SessionTable::new(max_connections),
            inbound: StreamMap::new(),
        }
    }

    pub fn local_addr(&self) -> tokio::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until `shutdown` is cancelled or accepting a connection fails.
    ///
    /// Open connections are closed when the server is dropped on return.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.map_err(ServerError::Accept)?;
                    self.admit(stream, peer);
                }

                Some((id, event)) = self.inbound.next() => {
                    self.handle_event(id, event).await;
                }
            }
        }

        tracing::info!(
            "shutting down, closing {} open connection(s)",
            self.sessions.len()
        );
        Ok(())
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        let (reader, writer) = stream.into_split();

        let id = match self.sessions.admit(writer) {
            Ok(id) => id,
            Err(err) => {
                // dropping both halves closes the connection
                tracing::warn!("rejected connection from {}: {}", peer, err);
                return;
            }
        };

        let events = FramedRead::new(reader, RequestCodec)
            .map(|frame| match frame {
                Ok(request) => Event::Request(request),
                Err(err) => Event::Failed(err),
            })
            .chain(tokio_stream::once(Event::Closed));
        self.inbound.insert(id, Box::pin(events));

        tracing::info!("connection {} admitted from {}", id, peer);
    }

    async fn handle_event(&mut self, id: ConnectionId, event: Event) {
        match event {
            Event::Request(request) => {
                let Some(session) = self.sessions.get_mut(id) else {
                    return;
                };

                let Some(response) = dispatch(id, &mut session.ledger, request) else {
                    return;
                };

                if let Err(err) = session.writer.write_all(&response.to_bytes()).await {
                    tracing::warn!("failed to respond to connection {}: {}", id, err);
                    self.disconnect(id);
                }
            }
            Event::Failed(err) => {
                tracing::warn!("failed to read from connection {}: {}", id, err);
                self.disconnect(id);
            }
            Event::Closed => self.disconnect(id),
        }
    }

    fn disconnect(&mut self, id: ConnectionId) {
        self.inbound.remove(&id);
        if let Some(session) = self.sessions.remove(id) {
            tracing::info!(
                "connection {} closed, dropping {} price(s)",
                id,
                session.ledger.len()
            );
        }
    }
}

/// Applies a request to the client's ledger, returning the response
/// to send back if the request expects one.
pub fn dispatch(id: ConnectionId, ledger: &mut Ledger, request: Request) -> Option<Response> {
    tracing::debug!("connection {} sent: {:?}", id, request);

    match request {
        Request::Insert { timestamp, price } => {
            if let Err(err) = ledger.insert(timestamp, price) {
                tracing::warn!("connection {}: dropped price at {}: {}", id, timestamp, err);
            }
            None
        }
        Request::Query { min_time, max_time } => {
            let response = Response::create_query_response(ledger.average(min_time, max_time));
            tracing::debug!("responding to connection {}: {:?}", id, response);
            Some(response)
        }
        Request::Unknown { ty } => {
            tracing::debug!("connection {}: ignoring message type {:#04X}", id, ty);
            None
        }
    }
}
