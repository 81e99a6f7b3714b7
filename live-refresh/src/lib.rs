pub mod control;
pub mod controller;
pub mod indicator;
pub mod page;
pub mod updater;

pub use controller::{RefreshController, Visibility};
pub use page::{Document, Page, SharedPage};
pub use updater::{MatchCardUpdater, MatchSource};
