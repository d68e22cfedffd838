//! Debounced, version-ordered selection persistence.
//!
//! [`DebouncedBackend`] wraps another [`SelectionBackend`]. Saves are
//! buffered per attendee and only the newest snapshot is written once the
//! attendee has been quiet for the configured interval. Snapshots carry the
//! selection store's version, so a stale snapshot can never replace a newer
//! one, whichever order they arrive or complete in.
//!
//! A background Tokio task schedules the writes and runs each one on the
//! blocking pool. Failed writes are retried with exponential backoff until a
//! newer snapshot supersedes them or the attempt budget runs out.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::backend::{PersistenceError, SelectionBackend};
use crate::selection::PendingWrite;
use crate::types::{AttendeeId, EventId};

/// Default quiet interval before buffered selections are written.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(750);

/// Total write attempts for one snapshot, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Counters describing what the writer has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Snapshots written successfully.
    pub written: usize,
    /// Snapshots dropped because a newer one existed.
    pub superseded: usize,
    /// Failed write attempts.
    pub failed_attempts: usize,
    /// Snapshots abandoned after exhausting retries.
    pub abandoned: usize,
}

#[derive(Debug, Clone)]
struct Queued {
    write: PendingWrite,
    due: Instant,
    attempts: u32,
}

/// Per-attendee buffer of the latest unsaved snapshot.
///
/// The buffer never performs I/O. Due snapshots are taken out with
/// [`take_due`](Self::take_due), written by the caller and handed back with
/// [`complete`](Self::complete).
#[derive(Debug)]
pub struct WriteBuffer {
    quiet: Duration,
    pending: HashMap<AttendeeId, Queued>,
    in_flight: HashMap<AttendeeId, PendingWrite>,
    written: HashMap<AttendeeId, u64>,
    stats: WriterStats,
}

impl WriteBuffer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            written: HashMap::new(),
            stats: WriterStats::default(),
        }
    }

    /// Buffers `write`, restarting that attendee's quiet interval.
    ///
    /// Returns false if the snapshot is not newer than one already buffered,
    /// being written or written, in which case it is dropped.
    pub fn offer(&mut self, write: PendingWrite, now: Instant) -> bool {
        let stale_against_written = self
            .written
            .get(&write.attendee)
            .is_some_and(|&version| version >= write.version);
        let stale_against_in_flight = self
            .in_flight
            .get(&write.attendee)
            .is_some_and(|in_flight| in_flight.version >= write.version);
        let stale_against_pending = self
            .pending
            .get(&write.attendee)
            .is_some_and(|queued| queued.write.version > write.version);
        if stale_against_written || stale_against_in_flight || stale_against_pending {
            self.stats.superseded += 1;
            return false;
        }

        let queued = Queued {
            due: now + self.quiet,
            attempts: 0,
            write,
        };
        if self
            .pending
            .insert(queued.write.attendee.clone(), queued)
            .is_some()
        {
            self.stats.superseded += 1;
        }
        true
    }

    /// The earliest time a buffered snapshot becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|queued| queued.due).min()
    }

    /// The newest selection for `attendee` that storage may not have yet.
    pub fn latest(&self, attendee: &AttendeeId) -> Option<&PendingWrite> {
        self.pending
            .get(attendee)
            .map(|queued| &queued.write)
            .or_else(|| self.in_flight.get(attendee))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    pub const fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Removes every snapshot due at `now` (or all of them when `now` is
    /// `None`) and marks them as being written.
    fn take_due(&mut self, now: Option<Instant>) -> Vec<Queued> {
        let due: Vec<AttendeeId> = self
            .pending
            .iter()
            .filter(|(_, queued)| now.is_none_or(|now| queued.due <= now))
            .map(|(attendee, _)| attendee.clone())
            .collect();

        let mut taken = Vec::with_capacity(due.len());
        for attendee in due {
            if let Some(queued) = self.pending.remove(&attendee) {
                self.in_flight.insert(attendee, queued.write.clone());
                taken.push(queued);
            }
        }
        taken
    }

    /// Records the outcome of writing a snapshot from [`take_due`](Self::take_due).
    fn complete(&mut self, queued: Queued, result: Result<(), PersistenceError>) {
        let attendee = queued.write.attendee.clone();
        self.in_flight.remove(&attendee);
        match result {
            Ok(()) => {
                tracing::debug!(
                    attendee = %attendee,
                    version = queued.write.version,
                    events = queued.write.event_ids.len(),
                    "selection written"
                );
                let version = self.written.entry(attendee).or_default();
                *version = (*version).max(queued.write.version);
                self.stats.written += 1;
            }
            Err(error) => {
                self.stats.failed_attempts += 1;
                if self.pending.contains_key(&attendee) {
                    // A newer snapshot arrived while this one was being written.
                    self.stats.superseded += 1;
                    return;
                }
                self.retry_later(queued, &error);
            }
        }
    }

    fn retry_later(&mut self, mut queued: Queued, error: &PersistenceError) {
        queued.attempts += 1;
        if queued.attempts >= MAX_ATTEMPTS {
            tracing::warn!(
                attendee = %queued.write.attendee,
                version = queued.write.version,
                %error,
                "giving up on selection write; it stays in memory only"
            );
            self.stats.abandoned += 1;
            return;
        }
        let backoff = self.quiet * 2u32.pow(queued.attempts);
        tracing::warn!(
            attendee = %queued.write.attendee,
            attempt = queued.attempts,
            retry_in_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            %error,
            "selection write failed"
        );
        queued.due = Instant::now() + backoff;
        self.pending.insert(queued.write.attendee.clone(), queued);
    }
}

/// State shared between the writer handle and its task.
///
/// The buffer and the backend have separate locks, so buffering a save or
/// answering a load from the buffer never waits on storage I/O.
struct Shared<B> {
    buffer: Mutex<WriteBuffer>,
    backend: Mutex<B>,
}

impl<B> Shared<B> {
    fn buffer(&self) -> MutexGuard<'_, WriteBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn backend(&self) -> MutexGuard<'_, B> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Command {
    Wake,
    Flush(oneshot::Sender<()>),
}

/// A [`SelectionBackend`] that coalesces saves and writes them in the
/// background.
///
/// Loads see buffered snapshots before they are written, so switching away
/// from an attendee and back restores their latest selection even if the
/// write has not happened yet. Writes run on Tokio's blocking pool.
///
/// Versions come from a single [`SelectionStore`](crate::selection::SelectionStore),
/// so one writer serves one planner.
pub struct DebouncedBackend<B> {
    shared: Arc<Shared<B>>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl<B> DebouncedBackend<B>
where
    B: SelectionBackend + Send + 'static,
{
    /// Starts the writer task. Must be called from within a Tokio runtime.
    pub fn spawn(backend: B, quiet: Duration) -> Self {
        let shared = Arc::new(Shared {
            buffer: Mutex::new(WriteBuffer::new(quiet)),
            backend: Mutex::new(backend),
        });
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(Arc::clone(&shared), receiver));
        Self {
            shared,
            commands,
            task,
        }
    }

    /// Writes everything buffered now, without waiting for the quiet period.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Flush(done)).is_ok() {
            // The task only drops `done` if it has already exited.
            let _ = wait.await;
        }
    }

    /// Flushes outstanding snapshots and stops the writer task.
    pub async fn shutdown(self) -> WriterStats {
        let Self {
            shared,
            commands,
            task,
        } = self;
        drop(commands);
        if let Err(error) = task.await {
            tracing::error!(%error, "selection writer task failed");
        }
        shared.buffer().stats()
    }

    pub fn stats(&self) -> WriterStats {
        self.shared.buffer().stats()
    }
}

impl<B: SelectionBackend> SelectionBackend for DebouncedBackend<B> {
    fn load(&self, attendee: &AttendeeId) -> Result<Option<BTreeSet<EventId>>, PersistenceError> {
        if let Some(write) = self.shared.buffer().latest(attendee) {
            return Ok(Some(write.event_ids.clone()));
        }
        self.shared.backend().load(attendee)
    }

    fn save(&self, write: &PendingWrite) -> Result<(), PersistenceError> {
        let accepted = self.shared.buffer().offer(write.clone(), Instant::now());
        if accepted && self.commands.send(Command::Wake).is_err() {
            return Err(PersistenceError::Unavailable);
        }
        Ok(())
    }
}

async fn run_writer<B>(shared: Arc<Shared<B>>, mut commands: mpsc::UnboundedReceiver<Command>)
where
    B: SelectionBackend + Send + 'static,
{
    loop {
        let deadline = shared.buffer().next_deadline();
        tokio::select! {
            command = commands.recv() => match command {
                // A new snapshot arrived; loop to pick up its deadline.
                Some(Command::Wake) => {}
                Some(Command::Flush(done)) => {
                    write_due(&shared, None).await;
                    let _ = done.send(());
                }
                None => {
                    write_due(&shared, None).await;
                    for attendee in shared.buffer().pending.keys() {
                        tracing::warn!(attendee = %attendee, "selection not written before shutdown");
                    }
                    break;
                }
            },
            () = sleep_until(deadline) => write_due(&shared, Some(Instant::now())).await,
        }
    }
}

/// Writes the due snapshots one by one with the buffer unlocked.
async fn write_due<B>(shared: &Arc<Shared<B>>, now: Option<Instant>)
where
    B: SelectionBackend + Send + 'static,
{
    let due = shared.buffer().take_due(now);
    for queued in due {
        let write = queued.write.clone();
        let task_shared = Arc::clone(shared);
        let result = tokio::task::spawn_blocking(move || task_shared.backend().save(&write))
            .await
            .unwrap_or_else(|error| Err(PersistenceError::save(&queued.write.attendee, error)));
        shared.buffer().complete(queued, result);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    const QUIET: Duration = Duration::from_millis(500);

    fn write(attendee: &str, ids: &[&str], version: u64) -> PendingWrite {
        PendingWrite {
            attendee: AttendeeId::new(attendee).unwrap(),
            event_ids: ids.iter().map(|id| EventId::new(*id).unwrap()).collect(),
            version,
        }
    }

    fn ids(set: &BTreeSet<EventId>) -> Vec<&str> {
        set.iter().map(EventId::as_str).collect()
    }

    /// Writes due snapshots synchronously, the way the writer task does.
    fn write_due_now(buffer: &mut WriteBuffer, backend: &MemoryBackend, now: Option<Instant>) {
        for queued in buffer.take_due(now) {
            let result = backend.save(&queued.write);
            buffer.complete(queued, result);
        }
    }

    #[test]
    fn buffer_keeps_only_newest_snapshot_per_attendee() {
        let now = Instant::now();
        let mut buffer = WriteBuffer::new(QUIET);

        assert!(buffer.offer(write("anna", &["th-01"], 1), now));
        assert!(buffer.offer(write("anna", &["th-01", "th-02"], 2), now));
        assert!(!buffer.offer(write("anna", &[], 1), now));

        let anna = AttendeeId::new("anna").unwrap();
        assert_eq!(buffer.latest(&anna).unwrap().version, 2);
        assert_eq!(buffer.stats().superseded, 2);
    }

    #[test]
    fn buffer_restarts_quiet_interval_on_each_offer() {
        let start = Instant::now();
        let mut buffer = WriteBuffer::new(QUIET);

        buffer.offer(write("anna", &["th-01"], 1), start);
        assert_eq!(buffer.next_deadline(), Some(start + QUIET));

        let later = start + Duration::from_millis(300);
        buffer.offer(write("anna", &["th-02"], 2), later);
        assert_eq!(buffer.next_deadline(), Some(later + QUIET));
    }

    #[test]
    fn buffer_flushes_only_due_snapshots() {
        let start = Instant::now();
        let backend = MemoryBackend::new();
        let mut buffer = WriteBuffer::new(QUIET);

        buffer.offer(write("anna", &["th-01"], 1), start);
        buffer.offer(write("ben", &["fr-01"], 1), start + QUIET);

        write_due_now(&mut buffer, &backend, Some(start + QUIET));
        assert!(backend.stored(&AttendeeId::new("anna").unwrap()).is_some());
        assert!(backend.stored(&AttendeeId::new("ben").unwrap()).is_none());

        // Once written, an older snapshot can no longer be buffered.
        assert!(!buffer.offer(write("anna", &[], 1), start));
        write_due_now(&mut buffer, &backend, None);
        assert!(buffer.is_empty());
        assert_eq!(buffer.stats().written, 2);
    }

    #[test]
    fn snapshot_being_written_blocks_older_ones() {
        let now = Instant::now();
        let mut buffer = WriteBuffer::new(QUIET);
        let anna = AttendeeId::new("anna").unwrap();

        buffer.offer(write("anna", &["th-01", "th-02"], 4), now);
        let mut taken = buffer.take_due(None);
        assert_eq!(taken.len(), 1);
        assert_eq!(buffer.latest(&anna).unwrap().version, 4);

        assert!(!buffer.offer(write("anna", &["th-01"], 3), now));
        assert!(buffer.offer(write("anna", &[], 5), now));

        // The in-flight write fails, but a newer snapshot is already queued.
        let queued = taken.remove(0);
        buffer.complete(queued, Err(PersistenceError::Unavailable));
        assert_eq!(buffer.latest(&anna).unwrap().version, 5);
        assert_eq!(buffer.stats().failed_attempts, 1);
        assert_eq!(buffer.stats().superseded, 2);
    }

    /// Blocks its first save until released, reporting when it has started.
    struct GatedBackend {
        inner: MemoryBackend,
        gate: Mutex<Option<(mpsc::UnboundedSender<()>, std::sync::mpsc::Receiver<()>)>>,
    }

    impl SelectionBackend for GatedBackend {
        fn load(
            &self,
            attendee: &AttendeeId,
        ) -> Result<Option<BTreeSet<EventId>>, PersistenceError> {
            self.inner.load(attendee)
        }

        fn save(&self, write: &PendingWrite) -> Result<(), PersistenceError> {
            let gate = self.gate.lock().unwrap().take();
            if let Some((started, release)) = gate {
                started.send(()).unwrap();
                release.recv().unwrap();
            }
            self.inner.save(write)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn saves_and_loads_do_not_wait_for_a_slow_write() {
        let memory = MemoryBackend::new();
        let (started_tx, mut started) = mpsc::unbounded_channel();
        let (release, release_rx) = std::sync::mpsc::channel();
        let gated = GatedBackend {
            inner: memory.clone(),
            gate: Mutex::new(Some((started_tx, release_rx))),
        };
        let writer = DebouncedBackend::spawn(gated, QUIET);
        let anna = AttendeeId::new("anna").unwrap();

        writer.save(&write("anna", &["th-01"], 1)).unwrap();
        started.recv().await.unwrap();

        // The first write is stuck in storage; the handle stays responsive.
        assert_eq!(ids(&writer.load(&anna).unwrap().unwrap()), ["th-01"]);
        writer.save(&write("anna", &["th-01", "th-02"], 2)).unwrap();
        assert_eq!(ids(&writer.load(&anna).unwrap().unwrap()), ["th-01", "th-02"]);
        assert_eq!(memory.save_count(), 0);

        release.send(()).unwrap();
        let stats = writer.shutdown().await;
        assert_eq!(stats.written, 2);
        assert_eq!(ids(&memory.stored(&anna).unwrap()), ["th-01", "th-02"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_saves_are_coalesced_into_one_write() {
        let memory = MemoryBackend::new();
        let writer = DebouncedBackend::spawn(memory.clone(), QUIET);

        writer.save(&write("anna", &["th-01"], 1)).unwrap();
        writer.save(&write("anna", &["th-01", "th-02"], 2)).unwrap();
        writer.save(&write("anna", &["th-02"], 3)).unwrap();

        time::sleep(QUIET / 2).await;
        assert_eq!(memory.save_count(), 0);

        time::sleep(QUIET).await;
        assert_eq!(memory.save_count(), 1);
        let stored = memory.stored(&AttendeeId::new("anna").unwrap()).unwrap();
        assert_eq!(ids(&stored), ["th-02"]);

        let stats = writer.shutdown().await;
        assert_eq!(stats.written, 1);
        assert_eq!(stats.superseded, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_snapshot_never_overwrites_newer_state() {
        let memory = MemoryBackend::new();
        let writer = DebouncedBackend::spawn(memory.clone(), QUIET);

        writer.save(&write("anna", &["sa-01", "sa-02"], 5)).unwrap();
        writer.save(&write("anna", &["sa-01"], 3)).unwrap();
        time::sleep(QUIET * 2).await;

        // A stale snapshot arriving after the newer one was written is dropped too.
        writer.save(&write("anna", &[], 4)).unwrap();
        time::sleep(QUIET * 2).await;

        let stored = memory.stored(&AttendeeId::new("anna").unwrap()).unwrap();
        assert_eq!(ids(&stored), ["sa-01", "sa-02"]);
        assert_eq!(memory.save_count(), 1);
        writer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn load_sees_buffered_snapshot_before_it_is_written() {
        let memory = MemoryBackend::new();
        let writer = DebouncedBackend::spawn(memory.clone(), QUIET);
        let anna = AttendeeId::new("anna").unwrap();

        writer.save(&write("anna", &["th-05"], 1)).unwrap();
        assert_eq!(memory.stored(&anna), None);
        assert_eq!(ids(&writer.load(&anna).unwrap().unwrap()), ["th-05"]);
        assert_eq!(writer.load(&AttendeeId::new("ben").unwrap()).unwrap(), None);

        writer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn attendees_are_written_independently() {
        let memory = MemoryBackend::new();
        let writer = DebouncedBackend::spawn(memory.clone(), QUIET);

        writer.save(&write("anna", &["th-01"], 1)).unwrap();
        writer.save(&write("ben", &["fr-09"], 2)).unwrap();
        writer.flush().await;

        assert_eq!(
            ids(&memory.stored(&AttendeeId::new("anna").unwrap()).unwrap()),
            ["th-01"]
        );
        assert_eq!(
            ids(&memory.stored(&AttendeeId::new("ben").unwrap()).unwrap()),
            ["fr-09"]
        );
        writer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_is_retried_with_backoff() {
        let memory = MemoryBackend::new();
        memory.set_available(false);
        let writer = DebouncedBackend::spawn(memory.clone(), QUIET);
        let anna = AttendeeId::new("anna").unwrap();

        writer.save(&write("anna", &["th-01"], 1)).unwrap();
        // First attempt at QUIET fails; the retry is scheduled 2 * QUIET later.
        time::sleep(QUIET + QUIET / 2).await;
        assert_eq!(writer.stats().failed_attempts, 1);
        assert_eq!(memory.stored(&anna), None);

        memory.set_available(true);
        time::sleep(QUIET * 2).await;
        assert_eq!(ids(&memory.stored(&anna).unwrap()), ["th-01"]);

        let stats = writer.shutdown().await;
        assert_eq!(stats.written, 1);
        assert_eq!(stats.abandoned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn write_is_abandoned_after_retry_budget() {
        let memory = MemoryBackend::new();
        memory.set_available(false);
        let writer = DebouncedBackend::spawn(memory.clone(), QUIET);

        writer.save(&write("anna", &["th-01"], 1)).unwrap();
        time::sleep(QUIET * 20).await;

        let stats = writer.shutdown().await;
        assert_eq!(stats.failed_attempts, 3);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.written, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_writes_pending_snapshots_immediately() {
        let memory = MemoryBackend::new();
        let writer = DebouncedBackend::spawn(memory.clone(), Duration::from_secs(60));

        writer.save(&write("anna", &["su-01"], 1)).unwrap();
        let stats = writer.shutdown().await;

        assert_eq!(stats.written, 1);
        assert!(memory.stored(&AttendeeId::new("anna").unwrap()).is_some());
    }
}
