//! Process-wide session registry.
//!
//! Diagnostics arrive through a [`DiagnosticSink`] that only knows the id of
//! the session it was created for. The registry maps that id to the
//! session's [`DiagnosticRecord`] for as long as the session is open; any
//! report that cannot be matched to a live session lands in the fallback
//! record instead.
//!
//! ## Id lifecycle
//!
//! ```text
//! reserve -> (transport open) -> activate -> ... -> release
//!         \-> (open failed) ----------------------> release
//! ```
//!
//! A reserved id is not live: reports sent while the transport is still
//! logging in go to the fallback, which is how login failures are explained.
//! Released slots are reused with a bumped generation, so a stale id never
//! reaches a later session's record.
//!
//! ## Fallback lifecycle
//!
//! The fallback starts empty. Open failures consume it when they build their
//! error; everything else below the error threshold stays until
//! [`reset_fallback`] is called.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::diagnostics::{DiagnosticRecord, LibraryError, ServerMessage};

static DRIVER: Lazy<Mutex<DriverState>> = Lazy::new(|| Mutex::new(DriverState::default()));

/// Opaque identifier of a registered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Vacant,
    Reserved,
    Live(DiagnosticRecord),
}

#[derive(Debug, Default)]
struct Entry {
    generation: u32,
    slot: Slot,
}

#[derive(Debug, Default)]
struct DriverState {
    entries: Vec<Entry>,
    free: Vec<u32>,
    fallback: DiagnosticRecord,
}

impl DriverState {
    fn entry_mut(&mut self, id: SessionId) -> Option<&mut Entry> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
    }

    fn record_mut(&mut self, id: Option<SessionId>) -> &mut DiagnosticRecord {
        let Self {
            entries, fallback, ..
        } = self;
        let entry = id.and_then(|id| {
            entries
                .get_mut(id.index as usize)
                .filter(|entry| entry.generation == id.generation)
        });
        match entry {
            Some(Entry {
                slot: Slot::Live(record),
                ..
            }) => record,
            _ => fallback,
        }
    }
}

/// Allocate an id for a session that is about to open.
pub(crate) fn reserve() -> SessionId {
    let mut state = DRIVER.lock();
    if let Some(index) = state.free.pop() {
        let entry = &mut state.entries[index as usize];
        entry.slot = Slot::Reserved;
        return SessionId {
            index,
            generation: entry.generation,
        };
    }
    let index = u32::try_from(state.entries.len()).unwrap_or(u32::MAX);
    state.entries.push(Entry {
        generation: 0,
        slot: Slot::Reserved,
    });
    SessionId {
        index,
        generation: 0,
    }
}

/// Make a reserved id live, routing its diagnostics to its own record.
pub(crate) fn activate(id: SessionId) {
    let mut state = DRIVER.lock();
    if let Some(entry) = state.entry_mut(id) {
        entry.slot = Slot::Live(DiagnosticRecord::default());
    }
}

/// Release an id. Releasing twice or releasing a stale id is a no-op.
pub(crate) fn release(id: SessionId) {
    let mut state = DRIVER.lock();
    let Some(entry) = state.entry_mut(id) else {
        return;
    };
    if matches!(entry.slot, Slot::Vacant) {
        return;
    }
    entry.slot = Slot::Vacant;
    entry.generation = entry.generation.wrapping_add(1);
    state.free.push(id.index);
}

/// Check if `id` belongs to a live session.
#[must_use]
pub fn is_live(id: SessionId) -> bool {
    let state = DRIVER.lock();
    state
        .entries
        .get(id.index as usize)
        .is_some_and(|e| e.generation == id.generation && matches!(e.slot, Slot::Live(_)))
}

/// Number of live sessions in the process.
#[must_use]
pub fn live_sessions() -> usize {
    DRIVER
        .lock()
        .entries
        .iter()
        .filter(|e| matches!(e.slot, Slot::Live(_)))
        .count()
}

/// Run `f` on the record `id` routes to: its own when live, the fallback
/// otherwise. The lock is held only for the duration of `f`.
pub(crate) fn with_record<R>(
    id: Option<SessionId>,
    f: impl FnOnce(&mut DiagnosticRecord) -> R,
) -> R {
    let mut state = DRIVER.lock();
    f(state.record_mut(id))
}

/// Copy of the process-wide fallback record.
///
/// Holds diagnostics that could not be attributed to a live session, such
/// as the messages of a failed login.
#[must_use]
pub fn last_message() -> DiagnosticRecord {
    DRIVER.lock().fallback.clone()
}

/// Clear the process-wide fallback record.
pub fn reset_fallback() {
    DRIVER.lock().fallback.clear();
}

/// Delivery point for diagnostics, handed to the transport on open.
///
/// The sink carries only an id; every report is routed through the
/// registry at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticSink {
    id: Option<SessionId>,
}

impl DiagnosticSink {
    pub(crate) fn for_session(id: SessionId) -> Self {
        Self { id: Some(id) }
    }

    /// A sink that always reports to the fallback record.
    #[must_use]
    pub fn fallback() -> Self {
        Self { id: None }
    }

    /// The session this sink reports for.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.id
    }

    /// Deliver a server message.
    pub fn server_message(&self, msg: &ServerMessage) {
        let stored = with_record(self.id, |record| record.offer(msg));
        tracing::debug!(
            number = msg.number,
            severity = msg.severity,
            state = msg.state,
            stored = stored,
            message = %msg.message,
            "server message"
        );
    }

    /// Deliver a library error.
    pub fn library_error(&self, err: &LibraryError) {
        tracing::debug!(
            number = err.number,
            severity = err.severity,
            os_error = err.os_error,
            message = %err.message,
            "library error"
        );
        with_record(self.id, |record| record.absorb(err));
    }
}
