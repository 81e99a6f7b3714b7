//! The page the controller runs against.
//!
//! The markup contract is the one the score tracker templates render: match cards carry a
//! `data-match-id` attribute, live ones also carry the `match-card-live` class, and the score,
//! minute and status are shown in optional sub-elements found by class name. Any of those
//! sub-elements may be missing, so every one of them is optional here too.

use crate::indicator::Indicator;
use log::*;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use thiserror::Error;

pub const AUTO_REFRESH_ATTRIBUTE: &str = "data-auto-refresh";
pub const MATCH_ID_ATTRIBUTE: &str = "data-match-id";
pub const LIVE_CARD_CLASS: &str = "match-card-live";
pub const SCORE_HOME_CLASS: &str = "score-home";
pub const SCORE_AWAY_CLASS: &str = "score-away";
pub const MINUTE_CLASS: &str = "match-minute";
pub const STATUS_BADGE_CLASS: &str = "badge-match-status";

/// Background color a card pulses to after it has been updated
pub const HIGHLIGHT_COLOR: &str = "rgba(13, 110, 253, 0.1)";

/// Everything the refresh controller needs from the page it is running on.
///
/// Implementations must look cards up fresh on every call, other code may re-render them at any
/// time.
pub trait Page: Sized + Send + 'static {
    /// Whether the page asks to always auto-refresh (the `data-auto-refresh` flag)
    fn auto_refresh_requested(&self) -> bool;

    fn has_live_cards(&self) -> bool;

    /// Match ids of the live cards that carry one, in document order
    fn live_match_ids(&self) -> Vec<String>;

    fn card_mut(&mut self, match_id: &str) -> Option<&mut MatchCard>;

    fn indicator_mut(&mut self) -> Option<&mut Indicator>;

    /// Adds the indicator to the page. If one is already present it is kept and returned.
    fn attach_indicator(&mut self, indicator: Indicator) -> &mut Indicator;

    /// Where the page content is read from again on reload, `None` if nothing backs it
    fn source(&self) -> Option<&Path>;

    /// Reads a fresh copy of the page. Called without the page locked.
    fn load_from(source: &Path) -> Result<Self, PageError>;

    /// Counts a reload and takes over the content of `fresh`. With `None` the current content
    /// stays.
    fn reload(&mut self, fresh: Option<Self>);
}

pub type SharedPage<P> = Arc<Mutex<P>>;

pub fn share<P: Page>(page: P) -> SharedPage<P> {
    Arc::new(Mutex::new(page))
}

/// Reloads the page. The source is read before the page is locked, so a slow read never holds
/// up the updater or the controller.
pub fn reload<P: Page>(page: &SharedPage<P>) {
    let source = lock(page).source().map(Path::to_path_buf);
    let fresh = source.and_then(|path| match P::load_from(&path) {
        Ok(fresh) => {
            debug!("Reloaded page from {}", path.display());
            Some(fresh)
        }
        Err(e) => {
            error!("Failed to reload page from {}: {e}", path.display());
            None
        }
    });
    lock(page).reload(fresh);
}

/// Locks the page. A panic while the page was locked leaves at worst a half-patched card, which
/// the next refresh overwrites, so poisoning is ignored.
pub fn lock<P>(page: &SharedPage<P>) -> MutexGuard<'_, P> {
    page.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("could not read page file: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse page file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBadge {
    #[serde(default = "default_badge_class")]
    pub class_name: String,
    #[serde(default)]
    pub text: String,
}

fn default_badge_class() -> String {
    format!("badge {STATUS_BADGE_CLASS}")
}

impl Default for StatusBadge {
    fn default() -> Self {
        Self {
            class_name: default_badge_class(),
            text: String::new(),
        }
    }
}

/// A match card. `None` for a sub-element means the card was rendered without it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCard {
    #[serde(default)]
    pub match_id: Option<String>,
    #[serde(default)]
    pub live: bool,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub score_home: Option<String>,
    #[serde(default)]
    pub score_away: Option<String>,
    #[serde(default)]
    pub minute: Option<String>,
    #[serde(default)]
    pub status_badge: Option<StatusBadge>,
    #[serde(skip)]
    pub background: Option<String>,
    #[serde(skip)]
    pub(crate) highlight_seq: u64,
}

impl MatchCard {
    /// A card with every sub-element present and empty
    pub fn new(match_id: &str, live: bool) -> Self {
        Self {
            match_id: Some(match_id.to_string()),
            live,
            score_home: Some(String::new()),
            score_away: Some(String::new()),
            minute: Some(String::new()),
            status_badge: Some(StatusBadge::default()),
            ..Default::default()
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.background.is_some()
    }
}

impl fmt::Display for MatchCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blank_or = |s: &Option<String>| s.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:6} #{:<6} {} {} - {} {}",
            if self.live { "[LIVE]" } else { "" },
            self.match_id.as_deref().unwrap_or("?"),
            self.home_team,
            blank_or(&self.score_home),
            blank_or(&self.score_away),
            self.away_team,
        )?;
        if let Some(minute) = self.minute.as_ref().filter(|m| !m.is_empty()) {
            write!(f, "  {minute}")?;
        }
        if let Some(badge) = &self.status_badge {
            write!(f, "  ({})", badge.text)?;
        }
        if self.is_highlighted() {
            write!(f, "  *")?;
        }
        Ok(())
    }
}

/// In-memory page, optionally backed by a JSON page file that is read again on every reload.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    auto_refresh: bool,
    #[serde(default)]
    cards: Vec<MatchCard>,
    #[serde(skip)]
    indicator: Option<Indicator>,
    #[serde(skip)]
    source: Option<PathBuf>,
    #[serde(skip)]
    reload_count: usize,
}

impl Document {
    pub fn new(auto_refresh: bool, cards: Vec<MatchCard>) -> Self {
        Self {
            auto_refresh,
            cards,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PageError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PageError> {
        let path = path.as_ref();
        let mut document = Self::from_json(&fs::read_to_string(path)?)?;
        document.source = Some(path.to_path_buf());
        Ok(document)
    }

    pub fn cards(&self) -> &[MatchCard] {
        &self.cards
    }

    /// Direct access to the cards, for whatever else renders into the page
    pub fn cards_mut(&mut self) -> &mut Vec<MatchCard> {
        &mut self.cards
    }

    pub fn card(&self, match_id: &str) -> Option<&MatchCard> {
        self.cards
            .iter()
            .find(|card| card.match_id.as_deref() == Some(match_id))
    }

    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    pub fn reload_count(&self) -> usize {
        self.reload_count
    }
}

impl Page for Document {
    fn auto_refresh_requested(&self) -> bool {
        self.auto_refresh
    }

    fn has_live_cards(&self) -> bool {
        self.cards.iter().any(|card| card.live)
    }

    fn live_match_ids(&self) -> Vec<String> {
        self.cards
            .iter()
            .filter(|card| card.live)
            .filter_map(|card| card.match_id.clone())
            .collect()
    }

    fn card_mut(&mut self, match_id: &str) -> Option<&mut MatchCard> {
        self.cards
            .iter_mut()
            .find(|card| card.match_id.as_deref() == Some(match_id))
    }

    fn indicator_mut(&mut self) -> Option<&mut Indicator> {
        self.indicator.as_mut()
    }

    fn attach_indicator(&mut self, indicator: Indicator) -> &mut Indicator {
        self.indicator.get_or_insert(indicator)
    }

    fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn load_from(source: &Path) -> Result<Self, PageError> {
        Self::load(source)
    }

    fn reload(&mut self, fresh: Option<Self>) {
        self.reload_count += 1;
        if let Some(fresh) = fresh {
            self.auto_refresh = fresh.auto_refresh;
            self.cards = fresh.cards;
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for card in &self.cards {
            writeln!(f, "{card}")?;
        }
        match &self.indicator {
            Some(indicator) if indicator.is_active() => writeln!(f, "{indicator}"),
            _ => writeln!(f, "Auto-refresh off"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use score_common::config::Locale;
    use std::io::Write;

    const PAGE_JSON: &str = r#"{
        "autoRefresh": false,
        "cards": [
            { "matchId": "1", "live": false, "homeTeam": "Lyon", "awayTeam": "Nantes",
              "scoreHome": "0", "scoreAway": "0", "statusBadge": { "text": "Scheduled" } },
            { "matchId": "2", "live": true, "scoreHome": "1", "scoreAway": "1", "minute": "12′" },
            { "live": true, "scoreHome": "3" },
            { "matchId": "4", "live": true }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let doc = Document::from_json(PAGE_JSON).unwrap();
        assert!(!doc.auto_refresh_requested());
        assert_eq!(doc.cards().len(), 4);

        let first = doc.card("1").unwrap();
        assert_eq!(first.home_team, "Lyon");
        assert_eq!(first.minute, None);
        assert_eq!(
            first.status_badge,
            Some(StatusBadge {
                class_name: "badge badge-match-status".to_string(),
                text: "Scheduled".to_string(),
            })
        );

        let fourth = doc.card("4").unwrap();
        assert_eq!(fourth.score_home, None);
        assert_eq!(fourth.status_badge, None);
        assert!(!fourth.is_highlighted());
    }

    #[test]
    fn test_live_cards() {
        let doc = Document::from_json(PAGE_JSON).unwrap();
        assert!(doc.has_live_cards());
        // The live card without an id still counts as live, but can't be fetched
        assert_eq!(doc.live_match_ids(), vec!["2".to_string(), "4".to_string()]);

        let doc = Document::new(true, vec![MatchCard::new("9", false)]);
        assert!(doc.auto_refresh_requested());
        assert!(!doc.has_live_cards());
        assert!(doc.live_match_ids().is_empty());
    }

    #[test]
    fn test_card_lookup() {
        let mut doc = Document::from_json(PAGE_JSON).unwrap();
        assert!(doc.card_mut("5").is_none());
        doc.card_mut("2").unwrap().score_home = Some("2".to_string());
        assert_eq!(doc.card("2").unwrap().score_home.as_deref(), Some("2"));
    }

    #[test]
    fn test_attach_indicator_once() {
        let mut doc = Document::default();
        assert!(doc.indicator_mut().is_none());

        doc.attach_indicator(Indicator::new(Locale::English, 0.8)).show();
        doc.attach_indicator(Indicator::new(Locale::French, 0.5));

        let indicator = doc.indicator().unwrap();
        assert!(indicator.is_active());
        assert_eq!(indicator.opacity(), 0.8);
    }

    #[test]
    fn test_reload_without_source() {
        let mut doc = Document::from_json(PAGE_JSON).unwrap();
        doc.cards_mut().clear();
        assert!(doc.source().is_none());

        let page = share(doc);
        reload(&page);
        let doc = lock(&page);
        assert_eq!(doc.reload_count(), 1);
        assert!(doc.cards().is_empty());
    }

    #[test]
    fn test_reload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PAGE_JSON.as_bytes()).unwrap();
        let mut doc = Document::load(file.path()).unwrap();
        assert_eq!(doc.source(), Some(file.path()));
        doc.attach_indicator(Indicator::new(Locale::English, 0.8));
        doc.card_mut("2").unwrap().score_home = Some("7".to_string());

        let page = share(doc);
        reload(&page);
        {
            let doc = lock(&page);
            assert_eq!(doc.reload_count(), 1);
            assert_eq!(doc.card("2").unwrap().score_home.as_deref(), Some("1"));
            assert!(doc.indicator().is_some());
        }

        let new_page = r#"{ "autoRefresh": true, "cards": [ { "matchId": "8", "live": true } ] }"#;
        fs::write(file.path(), new_page).unwrap();
        reload(&page);
        let doc = lock(&page);
        assert_eq!(doc.reload_count(), 2);
        assert!(doc.auto_refresh_requested());
        assert_eq!(doc.live_match_ids(), vec!["8".to_string()]);
        assert_eq!(doc.source(), Some(file.path()));
    }

    #[test]
    fn test_reload_bad_file_keeps_page() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PAGE_JSON.as_bytes()).unwrap();
        let page = share(Document::load(file.path()).unwrap());

        fs::write(file.path(), "{ not json").unwrap();
        reload(&page);
        let doc = lock(&page);
        assert_eq!(doc.reload_count(), 1);
        assert_eq!(doc.cards().len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Document::load("/definitely/not/a/page.json"),
            Err(PageError::Io(_))
        ));
    }

    #[test]
    fn test_display() {
        let doc = Document::from_json(PAGE_JSON).unwrap();
        let text = doc.to_string();
        assert!(text.contains("Lyon 0 - 0 Nantes"));
        assert!(text.contains("12′"));
        assert!(text.ends_with("Auto-refresh off\n"));
    }
}
