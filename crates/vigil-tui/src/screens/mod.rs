//! Screen implementations. Each screen is a top-level Component.

mod alerts;
mod dashboard;
mod platforms;
mod records;

pub use alerts::AlertsScreen;
pub use dashboard::DashboardScreen;
pub use platforms::PlatformsScreen;
pub use records::{RecordRows, RecordView, RecordsScreen};

use crate::component::Component;
use crate::screen::ScreenId;

/// Create all screens in tab-bar order.
pub fn create_screens() -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (ScreenId::Dashboard, Box::new(DashboardScreen::new())),
        (ScreenId::Platforms, Box::new(PlatformsScreen::new())),
        (ScreenId::Records, Box::new(RecordsScreen::new())),
        (ScreenId::Alerts, Box::new(AlertsScreen::new())),
    ]
}
