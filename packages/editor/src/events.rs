//! Editor events, transient notices and the busy indicator
//!
//! Front ends subscribe to [`EditorEvent`]s instead of polling the
//! controller. Notices auto-dismiss and only the latest one is shown. The
//! busy indicator is cleared when its guard drops, and a fallback timer
//! force-clears it if the guard never does.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::sync::SyncPhase;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Text view content replaced by a regenerated projection
    TextReplaced(String),
    /// Structured view rebuilt from text
    ModelRebuilt,
    DocumentLoaded,
    DocumentSaved,
    Notice(Notice),
    NoticeDismissed(u64),
    /// A collaborator answered 401; sign in again before retrying
    AuthRequired,
    BusyChanged(Option<String>),
    PhaseChanged(SyncPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub posted_at: Instant,
}

#[derive(Debug, Default)]
struct Board {
    notice: Option<Notice>,
    next_notice_id: u64,
    busy: Option<String>,
    busy_generation: u64,
}

/// Shared sink for notices, busy state and editor events
#[derive(Debug, Clone)]
pub struct Notifier {
    board: Arc<Mutex<Board>>,
    events: broadcast::Sender<EditorEvent>,
    notice_ttl: Duration,
    busy_fallback: Duration,
}

impl Notifier {
    pub fn new(notice_ttl: Duration, busy_fallback: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            board: Arc::new(Mutex::new(Board::default())),
            events,
            notice_ttl,
            busy_fallback,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: EditorEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show a notice, replacing the current one
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        let notice = {
            let mut board = self.board();
            board.next_notice_id += 1;
            let notice = Notice {
                id: board.next_notice_id,
                level,
                message: message.into(),
                posted_at: Instant::now(),
            };
            board.notice = Some(notice.clone());
            notice
        };

        tracing::debug!(id = notice.id, ?level, message = %notice.message, "notice posted");
        self.emit(EditorEvent::Notice(notice.clone()));
        self.schedule_dismiss(notice.id);
        notice
    }

    fn schedule_dismiss(&self, id: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let notifier = self.clone();
        let ttl = self.notice_ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            notifier.dismiss(id);
        });
    }

    /// Dismiss a notice if it is still the one shown
    pub fn dismiss(&self, id: u64) {
        let dismissed = {
            let mut board = self.board();
            if board.notice.as_ref().is_some_and(|n| n.id == id) {
                board.notice = None;
                true
            } else {
                false
            }
        };
        if dismissed {
            self.emit(EditorEvent::NoticeDismissed(id));
        }
    }

    /// Notice currently shown; expired ones count as dismissed
    pub fn current_notice(&self) -> Option<Notice> {
        let board = self.board();
        board
            .notice
            .clone()
            .filter(|n| n.posted_at.elapsed() < self.notice_ttl)
    }

    pub fn busy(&self) -> Option<String> {
        self.board().busy.clone()
    }

    /// Show the busy indicator until the returned guard drops
    pub fn begin_busy(&self, label: impl Into<String>) -> BusyGuard {
        let label = label.into();
        let generation = {
            let mut board = self.board();
            board.busy_generation += 1;
            board.busy = Some(label.clone());
            board.busy_generation
        };
        self.emit(EditorEvent::BusyChanged(Some(label)));

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let notifier = self.clone();
            let fallback = self.busy_fallback;
            handle.spawn(async move {
                tokio::time::sleep(fallback).await;
                if notifier.clear_busy(generation) {
                    tracing::warn!(?fallback, "busy indicator force-cleared");
                    notifier.notify(NoticeLevel::Warning, "Operation timed out, please retry");
                }
            });
        }

        BusyGuard {
            notifier: self.clone(),
            generation,
        }
    }

    /// Clear the indicator if `generation` still owns it
    fn clear_busy(&self, generation: u64) -> bool {
        let cleared = {
            let mut board = self.board();
            if board.busy_generation == generation && board.busy.is_some() {
                board.busy = None;
                true
            } else {
                false
            }
        };
        if cleared {
            self.emit(EditorEvent::BusyChanged(None));
        }
        cleared
    }
}

/// Clears the busy indicator on drop unless a newer one replaced it
#[derive(Debug)]
pub struct BusyGuard {
    notifier: Notifier,
    generation: u64,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.notifier.clear_busy(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> Notifier {
        Notifier::new(Duration::from_millis(3000), Duration::from_millis(15000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_notice_replaces_and_expires() {
        let notifier = notifier();
        let first = notifier.notify(NoticeLevel::Info, "first");
        notifier.notify(NoticeLevel::Error, "second");

        assert_eq!(notifier.current_notice().map(|n| n.message), Some("second".into()));

        // dismissing a replaced notice is a no-op
        notifier.dismiss(first.id);
        assert!(notifier.current_notice().is_some());

        tokio::time::advance(Duration::from_millis(3001)).await;
        assert_eq!(notifier.current_notice(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_guard_clears_on_drop() {
        let notifier = notifier();
        let mut events = notifier.subscribe();

        let guard = notifier.begin_busy("Saving");
        assert_eq!(notifier.busy().as_deref(), Some("Saving"));
        drop(guard);
        assert_eq!(notifier.busy(), None);

        assert_eq!(events.recv().await.unwrap(), EditorEvent::BusyChanged(Some("Saving".into())));
        assert_eq!(events.recv().await.unwrap(), EditorEvent::BusyChanged(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaked_busy_guard_is_force_cleared() {
        let notifier = notifier();
        std::mem::forget(notifier.begin_busy("Loading"));

        tokio::time::sleep(Duration::from_millis(15001)).await;
        tokio::task::yield_now().await;

        assert_eq!(notifier.busy(), None);
        let notice = notifier.current_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_guard_leaves_newer_busy_state() {
        let notifier = notifier();
        let first = notifier.begin_busy("Loading");
        let _second = notifier.begin_busy("Saving");
        drop(first);
        assert_eq!(notifier.busy().as_deref(), Some("Saving"));
    }
}
