pub mod config;
pub mod dashboard;
pub mod error;
pub mod prelude;
pub mod report;
pub mod sheet;
pub mod workbook;

pub use config::{DashboardConfig, ExpectancyPolicy, SheetId};
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use error::{WarroomError, WarroomResult};
pub use workbook::{SheetSource, Workbook};
