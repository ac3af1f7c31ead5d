//! Screen trait and screen identifier enum.

use std::fmt;

/// Identifies each primary TUI screen, navigable by number keys 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Dashboard, // 1
    Platforms, // 2
    Records,   // 3
    Alerts,    // 4
}

impl ScreenId {
    /// All screens in tab-bar order.
    pub const ALL: [ScreenId; 4] = [
        Self::Dashboard,
        Self::Platforms,
        Self::Records,
        Self::Alerts,
    ];

    /// Numeric key (1-4) for this screen.
    pub fn number(self) -> u8 {
        match self {
            Self::Dashboard => 1,
            Self::Platforms => 2,
            Self::Records => 3,
            Self::Alerts => 4,
        }
    }

    /// Screen from a numeric key (1-4). Returns None for out-of-range.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Dashboard),
            2 => Some(Self::Platforms),
            3 => Some(Self::Records),
            4 => Some(Self::Alerts),
            _ => None,
        }
    }

    /// Next screen in tab order (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous screen in tab order (wraps around).
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Short label for the tab bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Platforms => "Platforms",
            Self::Records => "Records",
            Self::Alerts => "Alerts",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_order_wraps_both_ways() {
        assert_eq!(ScreenId::Alerts.next(), ScreenId::Dashboard);
        assert_eq!(ScreenId::Dashboard.prev(), ScreenId::Alerts);
    }

    #[test]
    fn number_keys_round_trip() {
        for id in ScreenId::ALL {
            assert_eq!(ScreenId::from_number(id.number()), Some(id));
        }
        assert_eq!(ScreenId::from_number(9), None);
    }
}
