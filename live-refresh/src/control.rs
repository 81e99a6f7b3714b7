//! Manual control over the refresh controller, for scripts and operators.

use crate::{
    controller::{RefreshController, Visibility},
    page::Page,
    updater::MatchSource,
};
use log::*;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `enableAutoRefresh()`
    Enable,
    /// `disableAutoRefresh()`
    Disable,
    /// `refreshPage()`, reloads right away
    Refresh,
    /// `refreshAllLiveMatches()`, patches every live card right away
    Sweep,
    Hide,
    Show,
    Click,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Self::Enable,
        Self::Disable,
        Self::Refresh,
        Self::Sweep,
        Self::Hide,
        Self::Show,
        Self::Click,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Refresh => "refresh",
            Self::Sweep => "sweep",
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Click => "click",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Enable => "turn auto-refresh on",
            Self::Disable => "turn auto-refresh off",
            Self::Refresh => "reload the page now",
            Self::Sweep => "update every live match card now",
            Self::Hide => "the page was hidden",
            Self::Show => "the page is visible again",
            Self::Click => "click the auto-refresh indicator",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown command: {0:?}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|command| command.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

impl<P: Page, S: MatchSource> RefreshController<P, S> {
    pub fn execute(&self, command: Command) {
        debug!("Executing command {command:?}");
        match command {
            Command::Enable => self.enable(),
            Command::Disable => self.disable(),
            Command::Refresh => self.refresh_page(),
            Command::Sweep => {
                self.refresh_all_live_matches();
            }
            Command::Hide => self.on_visibility_change(Visibility::Hidden),
            Command::Show => self.on_visibility_change(Visibility::Visible),
            Command::Click => {
                self.click_indicator();
            }
        }
    }
}
