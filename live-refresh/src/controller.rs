use crate::{
    indicator::{self, Indicator, Prompt},
    page::{self, Page, SharedPage, lock},
    updater::{MatchCardUpdater, MatchSource},
};
use log::*;
use score_common::config::{
    Config, Indicator as IndicatorConfig, Locale, Refresh as RefreshConfig, TickAction,
};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Default)]
struct RefreshState {
    enabled: bool,
    timer: Option<JoinHandle<()>>,
    /// Set when auto-refresh was paused because the page was hidden
    resume_when_visible: bool,
}

/// Keeps the page fresh, either by reloading it or by patching live match cards on a timer.
///
/// Cloning gives another handle to the same controller. The methods are synchronous and may be
/// called from any thread; the timer and any fetches run on the runtime given to [`Self::new`].
pub struct RefreshController<P: Page, S: MatchSource> {
    inner: Arc<Inner<P, S>>,
}

impl<P: Page, S: MatchSource> Clone for RefreshController<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<P: Page, S: MatchSource> {
    page: SharedPage<P>,
    updater: MatchCardUpdater<P, S>,
    prompt: Box<dyn Prompt>,
    state: Mutex<RefreshState>,
    refresh: RefreshConfig,
    indicator: IndicatorConfig,
    locale: Locale,
    runtime: Handle,
}

impl<P: Page, S: MatchSource> Drop for Inner<P, S> {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl<P: Page, S: MatchSource> RefreshController<P, S> {
    pub fn new(
        page: SharedPage<P>,
        source: Arc<S>,
        prompt: Box<dyn Prompt>,
        config: &Config,
        runtime: Handle,
    ) -> Self {
        let mut refresh = config.refresh.clone();
        if refresh.interval < MIN_INTERVAL {
            warn!(
                "Refresh interval of {:?} is too short, using {MIN_INTERVAL:?}",
                refresh.interval
            );
            refresh.interval = MIN_INTERVAL;
        }

        let updater = MatchCardUpdater::new(
            page.clone(),
            source,
            config.display.locale,
            &config.updater,
            runtime.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                page,
                updater,
                prompt,
                state: Mutex::new(RefreshState::default()),
                refresh,
                indicator: config.indicator.clone(),
                locale: config.display.locale,
                runtime,
            }),
        }
    }

    // Lock order is always state, then page
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page(&self) -> &SharedPage<P> {
        &self.inner.page
    }

    pub fn is_enabled(&self) -> bool {
        self.lock_state().enabled
    }

    pub fn interval(&self) -> Duration {
        self.inner.refresh.interval
    }

    pub fn tick_action(&self) -> TickAction {
        self.inner.refresh.tick_action
    }

    /// Starts the refresh timer and shows the indicator. Does nothing if already enabled.
    pub fn enable(&self) {
        let mut state = self.lock_state();
        if state.enabled {
            return;
        }
        state.enabled = true;
        state.resume_when_visible = false;
        info!(
            "Auto-refresh enabled with interval {:?}",
            self.inner.refresh.interval
        );

        state.timer = Some(self.spawn_timer());

        let mut page = lock(&self.inner.page);
        if page.indicator_mut().is_none() {
            debug!("Creating auto-refresh indicator");
        }
        page.attach_indicator(Indicator::new(
            self.inner.locale,
            self.inner.indicator.resting_opacity,
        ))
        .show();
    }

    /// Stops the refresh timer and hides the indicator. Does nothing if already disabled.
    ///
    /// Fetches started by an earlier tick are not cancelled and still patch their cards when
    /// they complete.
    pub fn disable(&self) {
        let mut state = self.lock_state();
        state.resume_when_visible = false;
        if !state.enabled {
            return;
        }
        self.stop(&mut state);
        info!("Auto-refresh disabled");
    }

    fn stop(&self, state: &mut RefreshState) {
        state.enabled = false;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if let Some(indicator) = lock(&self.inner.page).indicator_mut() {
            indicator.hide();
        }
    }

    fn spawn_timer(&self) -> JoinHandle<()> {
        let period = self.inner.refresh.interval;
        let controller = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match Weak::upgrade(&controller) {
                    Some(inner) => Self { inner }.on_tick(),
                    None => break,
                }
            }
        })
    }

    /// Runs one refresh, as configured by the tick action
    pub fn on_tick(&self) {
        match self.inner.refresh.tick_action {
            TickAction::Reload => self.refresh_page(),
            TickAction::Sweep => {
                self.refresh_all_live_matches();
            }
        }
    }

    /// Flashes the indicator and reloads the page right away.
    ///
    /// The reloaded page is a new page load: the running session ends, the indicator is hidden
    /// (but kept), and auto-refresh is decided again from the fresh content.
    pub fn refresh_page(&self) {
        info!("Refreshing page");
        indicator::flash(&self.inner.page, &self.inner.indicator, &self.inner.runtime);
        page::reload(&self.inner.page);

        {
            let mut state = self.lock_state();
            self.stop(&mut state);
            *state = RefreshState::default();
        }
        self.decide_initial_activation();
    }

    /// Fetches fresh data for every live card right away
    pub fn refresh_all_live_matches(&self) -> Vec<JoinHandle<()>> {
        self.inner.updater.refresh_all_live_matches()
    }

    /// Run once when the page has loaded. Auto-refresh starts if the page asks for it, or if it
    /// shows any live match.
    pub fn decide_initial_activation(&self) {
        let requested = lock(&self.inner.page).auto_refresh_requested();
        if requested {
            debug!("Page requests auto-refresh");
            self.enable();
        }
        self.check_for_live_matches();
    }

    fn check_for_live_matches(&self) {
        let has_live = lock(&self.inner.page).has_live_cards();
        if has_live {
            debug!("Page has live matches");
            self.enable();
        }
    }

    /// Auto-refresh only ever gets turned on here, a page without live matches any more keeps
    /// refreshing until it is explicitly disabled.
    pub fn on_visibility_change(&self, visibility: Visibility) {
        match visibility {
            Visibility::Hidden if self.inner.refresh.pause_when_hidden => {
                let mut state = self.lock_state();
                if state.enabled {
                    info!("Page hidden, pausing auto-refresh");
                    self.stop(&mut state);
                    state.resume_when_visible = true;
                }
            }
            Visibility::Hidden => info!("Page hidden, auto-refresh keeps running"),
            Visibility::Visible => {
                info!("Page visible, checking for live matches");
                let resume = std::mem::take(&mut self.lock_state().resume_when_visible);
                if resume {
                    self.enable();
                }
                self.check_for_live_matches();
            }
        }
    }

    /// The user clicked the indicator. Asks for confirmation, then disables auto-refresh. Returns
    /// whether auto-refresh was turned off.
    pub fn click_indicator(&self) -> bool {
        let message = match lock(&self.inner.page).indicator_mut() {
            Some(indicator) if indicator.is_active() => indicator.confirm_message(),
            _ => {
                debug!("Indicator is not shown, ignoring click");
                return false;
            }
        };

        if self.inner.prompt.confirm(message) {
            self.disable();
            true
        } else {
            debug!("Disabling auto-refresh declined");
            false
        }
    }
}
