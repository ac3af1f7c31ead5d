//! Component health badge — ●/◐/○/? with color mapping.
//!
//! Classification is order-sensitive: an explicit `connected: true`
//! outranks a stale error field left over from a previous failure, so
//! the checks below must not be reordered.

use ratatui::style::Style;
use ratatui::text::Span;
use vigil_core::ComponentStatus;

use crate::theme;

/// Health classification for an external component (vault, brain,
/// platform adapter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Explicitly connected.
    Operational,
    /// An error was reported and connectivity is not confirmed.
    Failed,
    /// Status reported, but neither connected nor erroring.
    Limited,
    /// No status object at all.
    Unknown,
}

impl Badge {
    /// Classify a component's reported status. `None` means the backend
    /// never included a status object for this component.
    pub fn classify(status: Option<&ComponentStatus>) -> Self {
        match status {
            None => Self::Unknown,
            Some(s) if s.connected == Some(true) => Self::Operational,
            Some(s) if s.error.is_some() => Self::Failed,
            Some(_) => Self::Limited,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Operational => "●",
            Self::Failed => "○",
            Self::Limited => "◐",
            Self::Unknown => "?",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Failed => "failed",
            Self::Limited => "limited",
            Self::Unknown => "unknown",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Operational => theme::SUCCESS_GREEN,
            Self::Failed => theme::ERROR_RED,
            Self::Limited => theme::AMBER,
            Self::Unknown => theme::BORDER_GRAY,
        }
    }
}

/// Returns a styled `Span` with the badge dot and color.
pub fn badge_span(status: Option<&ComponentStatus>) -> Span<'static> {
    let badge = Badge::classify(status);
    Span::styled(badge.symbol(), Style::default().fg(badge.color()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(connected: Option<bool>, error: Option<&str>) -> ComponentStatus {
        ComponentStatus {
            connected,
            error: error.map(str::to_owned),
        }
    }

    #[test]
    fn connected_true_outranks_a_present_error() {
        let s = status(Some(true), Some("previous outage"));
        assert_eq!(Badge::classify(Some(&s)), Badge::Operational);
    }

    #[test]
    fn error_without_connectivity_is_failed() {
        let s = status(None, Some("quota exceeded"));
        assert_eq!(Badge::classify(Some(&s)), Badge::Failed);

        let s = status(Some(false), Some("quota exceeded"));
        assert_eq!(Badge::classify(Some(&s)), Badge::Failed);
    }

    #[test]
    fn empty_status_object_is_limited_not_unknown() {
        let s = status(None, None);
        assert_eq!(Badge::classify(Some(&s)), Badge::Limited);

        let s = status(Some(false), None);
        assert_eq!(Badge::classify(Some(&s)), Badge::Limited);
    }

    #[test]
    fn missing_status_object_is_unknown() {
        assert_eq!(Badge::classify(None), Badge::Unknown);
    }

    // Every (connected, error) combination lands in exactly one bucket.
    #[test]
    fn classification_is_total() {
        for connected in [None, Some(false), Some(true)] {
            for error in [None, Some("boom")] {
                let s = status(connected, error);
                let badge = Badge::classify(Some(&s));
                match (connected, error) {
                    (Some(true), _) => assert_eq!(badge, Badge::Operational),
                    (_, Some(_)) => assert_eq!(badge, Badge::Failed),
                    (_, None) => assert_eq!(badge, Badge::Limited),
                }
            }
        }
    }
}
