use crate::util::time;

/// How long a notification stays on screen.
pub const NOTICE_TTL_SECS: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message. Everything the old UI showed as a toast goes
/// through here; purely diagnostic detail goes to the log instead.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    /// Seconds since the UNIX epoch.
    pub created: u64,
}

#[derive(Default)]
pub struct NotificationQueue {
    items: Vec<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => log::error!("{message}"),
            NoticeLevel::Warning => log::warn!("{message}"),
            _ => log::info!("{message}"),
        }
        self.items.push(Notification {
            level,
            message,
            created: time::timestamp_secs(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Drop notifications older than their display window.
    pub fn prune(&mut self, now: u64) {
        self.items
            .retain(|n| now.saturating_sub(n.created) < NOTICE_TTL_SECS);
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_drops_expired_notices() {
        let mut queue = NotificationQueue::new();
        queue.info("fresh");
        queue.items.push(Notification {
            level: NoticeLevel::Info,
            message: "stale".to_owned(),
            created: time::timestamp_secs() - NOTICE_TTL_SECS - 1,
        });
        queue.prune(time::timestamp_secs());
        assert_eq!(queue.items().len(), 1);
        assert_eq!(queue.items()[0].message, "fresh");
    }
}
