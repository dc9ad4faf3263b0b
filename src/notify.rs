//! Transient user-visible notifications.
//!
//! Two regions exist: a global banner and an inline error region. Each holds
//! at most one notice; showing a new one replaces the old one and restarts its
//! auto-dismiss timer.

use log::*;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub const ERROR_TIMEOUT: Duration = Duration::from_secs(10);
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity of a notice, which also decides how long it stays up.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Warning,
    Success,
}

impl NoticeKind {
    pub fn timeout(&self) -> Duration {
        match self {
            NoticeKind::Error => ERROR_TIMEOUT,
            NoticeKind::Warning | NoticeKind::Success => NOTICE_TIMEOUT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NoticeKind::Error => "error",
            NoticeKind::Warning => "warning",
            NoticeKind::Success => "success",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Banner,
    Inline,
}

#[derive(Default)]
struct Slot {
    notice: Option<Notice>,
    timer: Option<JoinHandle<()>>,
}

impl Slot {
    fn take(&mut self) -> Option<Notice> {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.notice.take()
    }
}

#[derive(Default)]
struct Inner {
    banner: Slot,
    inline: Slot,
    next_id: u64,
}

impl Inner {
    fn slot(&mut self, region: Region) -> &mut Slot {
        match region {
            Region::Banner => &mut self.banner,
            Region::Inline => &mut self.inline,
        }
    }
}

/// Shared handle over the banner and the inline error region.
///
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<Inner>>,
}

impl Notifier {
    pub fn new() -> Self {
        Notifier::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    /// Show the message in both regions.
    ///
    pub fn show(&self, message: &str, kind: NoticeKind) {
        self.show_inline(message, kind);
        self.show_banner(message, kind);
    }

    /// Replace any visible banner with this message. Returns the notice id.
    ///
    pub fn show_banner(&self, message: &str, kind: NoticeKind) -> u64 {
        self.put(Region::Banner, message, kind)
    }

    pub fn show_inline(&self, message: &str, kind: NoticeKind) -> u64 {
        self.put(Region::Inline, message, kind)
    }

    pub fn banner(&self) -> Option<Notice> {
        self.lock().banner.notice.clone()
    }

    pub fn inline(&self) -> Option<Notice> {
        self.lock().inline.notice.clone()
    }

    /// Remove the banner and cancel its timer. Does nothing when no banner
    /// is visible.
    ///
    pub fn dismiss_banner(&self) {
        if let Some(notice) = self.lock().banner.take() {
            trace!("Dismissed banner {}", notice.id);
        }
    }

    pub fn hide_inline(&self) {
        self.lock().inline.take();
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.banner.take();
        inner.inline.take();
    }

    fn put(&self, region: Region, message: &str, kind: NoticeKind) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let slot = inner.slot(region);
        slot.take();
        slot.notice = Some(Notice {
            id,
            kind,
            message: message.to_owned(),
        });
        slot.timer = schedule_expiry(Arc::downgrade(&self.inner), region, id, kind.timeout());
        id
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Without a runtime the notice stays until replaced or dismissed.
fn schedule_expiry(
    inner: Weak<Mutex<Inner>>,
    region: Region,
    id: u64,
    timeout: Duration,
) -> Option<JoinHandle<()>> {
    let handle = Handle::try_current().ok()?;
    Some(handle.spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(inner) = inner.upgrade() {
            let mut inner = lock_inner(&inner);
            let slot = inner.slot(region);
            // Only expire the notice this timer was started for.
            if slot.notice.as_ref().map(|n| n.id) == Some(id) {
                slot.notice = None;
                slot.timer = None;
            }
        }
    }))
}
