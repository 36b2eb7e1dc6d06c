use std::fmt;

use thiserror::Error;

/// Failures a dashboard run can surface to the user.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Remote fetch or payload parse failure. Nothing downstream is built.
    #[error("data for {day} is unavailable: {source:#}")]
    DataUnavailable {
        day: String,
        #[source]
        source: anyhow::Error,
    },

    /// A selected state/county has no matching boundary row.
    #[error("could not find the geometry for the selected {what}: {name}")]
    GeometryNotFound { what: &'static str, name: String },

    /// A filter or aggregation produced no rows.
    #[error("{0}")]
    EmptyResult(String),

    /// An indicator has no dictionary entry. Resolved with a placeholder, never surfaced.
    #[error("no description for indicator {0}")]
    MissingDescription(String),

    /// The caller passed a value outside the accepted domain (day label, risk level, percentile).
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn to_str(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A user-visible message produced while recomputing the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.to_str(), self.message)
    }
}

/// Notices collected over one pipeline run, in emission order.
/// Every distinct notice is logged once; logging is how the CLI shows them.
#[derive(Debug, Clone, Default)]
pub struct Notices(Vec<Notice>);

impl Notices {
    pub fn new() -> Self { Self::default() }

    /// Record and log a notice unless an identical one is already present.
    fn push(&mut self, level: NoticeLevel, message: String) {
        let notice = Notice { level, message };
        if self.0.contains(&notice) { return }
        match level {
            NoticeLevel::Info => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
        self.0.push(notice);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    /// Convert a dashboard error into the notice level the user should see.
    pub fn report(&mut self, err: &DashboardError) {
        match err {
            DashboardError::DataUnavailable { .. } | DashboardError::InvalidSelection(_) => self.error(err.to_string()),
            DashboardError::GeometryNotFound { .. } | DashboardError::EmptyResult(_) => self.warn(err.to_string()),
            DashboardError::MissingDescription(_) => tracing::debug!("{err}"),
        }
    }

    #[inline] pub fn len(&self) -> usize { self.0.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Notice> { self.0.iter() }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|notice| notice.level == NoticeLevel::Error)
    }

    pub fn extend(&mut self, other: Notices) {
        for notice in other.0 { self.push(notice.level, notice.message) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::{span, subscriber::with_default, Event, Level, Metadata, Subscriber};

    use super::*;

    /// Records the level of every event it sees.
    #[derive(Default, Clone)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl Subscriber for Levels {
        fn enabled(&self, _: &Metadata<'_>) -> bool { true }
        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id { span::Id::from_u64(1) }
        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}
        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}
        fn event(&self, event: &Event<'_>) { self.0.lock().unwrap().push(*event.metadata().level()) }
        fn enter(&self, _: &span::Id) {}
        fn exit(&self, _: &span::Id) {}
    }

    #[test]
    fn report_maps_taxonomy_to_levels() {
        let mut notices = Notices::new();
        notices.report(&DashboardError::GeometryNotFound { what: "county", name: "Nowhere".into() });
        notices.report(&DashboardError::DataUnavailable { day: "Day 1".into(), source: anyhow::anyhow!("HTTP 404") });
        notices.report(&DashboardError::MissingDescription("weighted_X".into()));

        let levels: Vec<_> = notices.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NoticeLevel::Warning, NoticeLevel::Error]);
        assert!(notices.has_errors());
        assert!(notices.iter().next().unwrap().message.contains("Nowhere"));
    }

    #[test]
    fn repeated_notices_collapse() {
        let mut notices = Notices::new();
        notices.warn("same");
        notices.warn("same");
        notices.info("same");
        assert_eq!(notices.len(), 2);
    }

    #[test]
    fn each_distinct_notice_is_logged_once_at_its_level() {
        let levels = Levels::default();
        with_default(levels.clone(), || {
            let mut notices = Notices::new();
            notices.warn("county not found");
            notices.warn("county not found");
            notices.error("data unavailable");
            notices.info("select a region");
        });
        assert_eq!(*levels.0.lock().unwrap(), vec![Level::WARN, Level::ERROR, Level::INFO]);
    }
}
