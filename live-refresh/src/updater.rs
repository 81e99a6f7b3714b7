use crate::page::{HIGHLIGHT_COLOR, Page, SharedPage, lock};
use log::*;
use score_common::{
    config::{Locale, Updater as UpdaterConfig},
    match_snapshot::MatchSnapshot,
    scores_api::{ApiError, ScoresApiClient},
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle, time::sleep};

/// Where match snapshots come from
pub trait MatchSource: Send + Sync + 'static {
    fn fetch_snapshot(
        &self,
        match_id: &str,
    ) -> impl Future<Output = Result<MatchSnapshot, ApiError>> + Send;
}

impl MatchSource for ScoresApiClient {
    fn fetch_snapshot(
        &self,
        match_id: &str,
    ) -> impl Future<Output = Result<MatchSnapshot, ApiError>> + Send {
        self.get_match(match_id)
    }
}

/// Patches match cards in place instead of reloading the whole page.
pub struct MatchCardUpdater<P, S> {
    page: SharedPage<P>,
    source: Arc<S>,
    locale: Locale,
    highlight_duration: Duration,
    runtime: Handle,
}

impl<P, S> Clone for MatchCardUpdater<P, S> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            source: self.source.clone(),
            locale: self.locale,
            highlight_duration: self.highlight_duration,
            runtime: self.runtime.clone(),
        }
    }
}

impl<P: Page, S: MatchSource> MatchCardUpdater<P, S> {
    pub fn new(
        page: SharedPage<P>,
        source: Arc<S>,
        locale: Locale,
        config: &UpdaterConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            page,
            source,
            locale,
            highlight_duration: config.highlight_duration,
            runtime,
        }
    }

    /// Fetches the latest data for one match and patches its card. Runs in the background, the
    /// returned handle may be awaited but doesn't have to be. Failures are logged and leave the
    /// card as it was.
    pub fn fetch_and_update(&self, match_id: &str) -> JoinHandle<()> {
        let updater = self.clone();
        let match_id = match_id.to_string();
        self.runtime.spawn(async move {
            match updater.source.fetch_snapshot(&match_id).await {
                Ok(snapshot) => {
                    updater.apply_snapshot(&match_id, &snapshot);
                }
                Err(e) => error!("Error refreshing match {match_id}: {e}"),
            }
        })
    }

    /// Writes `snapshot` into the card for `match_id`. Returns `false` if there is no such card.
    pub fn apply_snapshot(&self, match_id: &str, snapshot: &MatchSnapshot) -> bool {
        let mut page = lock(&self.page);
        let Some(card) = page.card_mut(match_id) else {
            debug!("No card for match {match_id}, skipping update");
            return false;
        };

        if let Some(score_home) = card.score_home.as_mut() {
            *score_home = snapshot.score_home.to_string();
        }
        if let Some(score_away) = card.score_away.as_mut() {
            *score_away = snapshot.score_away.to_string();
        }

        if let (Some(minute), Some(snapshot_minute)) = (card.minute.as_mut(), &snapshot.minute) {
            *minute = snapshot_minute.display_text();
        }

        if let Some(badge) = card.status_badge.as_mut() {
            badge.class_name = snapshot.status.badge_class();
            badge.text = snapshot.status.label(self.locale).to_string();
        }

        card.background = Some(HIGHLIGHT_COLOR.to_string());
        card.highlight_seq += 1;
        let seq = card.highlight_seq;
        drop(page);

        trace!("Updated match {match_id} with {snapshot:?}");

        let page = self.page.clone();
        let match_id = match_id.to_string();
        let duration = self.highlight_duration;
        self.runtime.spawn(async move {
            sleep(duration).await;
            // A later update restarts the highlight, leave that one alone
            if let Some(card) = lock(&page).card_mut(&match_id) {
                if card.highlight_seq == seq {
                    card.background = None;
                }
            }
        });

        true
    }

    /// Starts an independent update for every live card on the page. One card failing has no
    /// effect on the others.
    pub fn refresh_all_live_matches(&self) -> Vec<JoinHandle<()>> {
        let match_ids = lock(&self.page).live_match_ids();
        debug!("Refreshing {} live matches", match_ids.len());
        match_ids
            .iter()
            .map(|match_id| self.fetch_and_update(match_id))
            .collect()
    }
}
