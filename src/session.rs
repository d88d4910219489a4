use std::{
    collections::{HashMap, TryReserveError},
    fmt,
};

use crate::ledger::Ledger;

/// Identifies one admitted connection. Ids are handed out in increasing
/// order and never reused for the lifetime of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AdmissionError {
    #[error("the server is already serving {0} connections")]
    AtCapacity(usize),

    #[error("failed to allocate a ledger: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Everything the server keeps about one open connection.
///
/// `W` is the write side of the connection, responses to queries go there.
#[derive(Debug)]
pub struct Session<W> {
    id: ConnectionId,
    pub ledger: Ledger,
    pub writer: W,
}

impl<W> Session<W> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

#[derive(Debug)]
pub struct SessionTable<W> {
    sessions: HashMap<ConnectionId, Session<W>>,
    next_id: u64,
    max_sessions: Option<usize>,
}

impl<W> SessionTable<W> {
    /// Creates an empty table, `max_sessions` of None means no limit.
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            sessions: HashMap::default(),
            next_id: 0,
            max_sessions,
        }
    }

    /// Tries to open a session for a new connection.
    ///
    /// on failure nothing is recorded and the connection should be closed.
    pub fn admit(&mut self, writer: W) -> Result<ConnectionId, AdmissionError> {
        if let Some(max) = self.max_sessions {
            if self.sessions.len() >= max {
                return Err(AdmissionError::AtCapacity(max));
            }
        }

        let ledger = Ledger::with_initial_capacity()?;
        self.sessions.try_reserve(1)?;

        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, Session { id, ledger, writer });

        Ok(id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Session<W>> {
        self.sessions.get_mut(&id)
    }

    /// Ends a session, releasing its ledger. Returns the removed session
    /// so the caller can close the connection.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Session<W>> {
        self.sessions.remove(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
