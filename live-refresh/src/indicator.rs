use crate::page::{Page, SharedPage, lock};
use log::*;
use score_common::config::{Indicator as IndicatorConfig, Locale};
use std::fmt;
use tokio::{runtime::Handle, task::JoinHandle, time::sleep};

pub const INDICATOR_ID: &str = "autoRefreshIndicator";
pub const INDICATOR_CLASS: &str = "auto-refresh-indicator";
pub const ACTIVE_CLASS: &str = "active";
/// Refresh arrow shown in front of the label
pub const ICON: char = '⟳';
pub const FULL_OPACITY: f32 = 1.0;

/// Answers the confirmation asked before the indicator turns auto-refresh off
pub trait Prompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Prompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Answers yes to every confirmation, for unattended hosts
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Prompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Prompt for NeverConfirm {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

/// The small always-visible badge shown while auto-refresh is on. There is at most one per page,
/// it is hidden rather than removed when auto-refresh is turned off.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    locale: Locale,
    active: bool,
    opacity: f32,
}

impl Indicator {
    pub fn new(locale: Locale, resting_opacity: f32) -> Self {
        Self {
            locale,
            active: false,
            opacity: resting_opacity,
        }
    }

    pub fn id(&self) -> &'static str {
        INDICATOR_ID
    }

    pub fn class_name(&self) -> String {
        if self.active {
            format!("{INDICATOR_CLASS} {ACTIVE_CLASS}")
        } else {
            INDICATOR_CLASS.to_string()
        }
    }

    pub fn label(&self) -> &'static str {
        match self.locale {
            Locale::English => "Auto-refresh active",
            Locale::French => "Auto-refresh actif",
        }
    }

    /// Tooltip
    pub fn title(&self) -> &'static str {
        match self.locale {
            Locale::English => "Click to disable",
            Locale::French => "Cliquer pour désactiver",
        }
    }

    pub fn cursor(&self) -> &'static str {
        "pointer"
    }

    pub fn confirm_message(&self) -> &'static str {
        match self.locale {
            Locale::English => "Disable automatic refresh?",
            Locale::French => "Désactiver le rafraîchissement automatique ?",
        }
    }

    pub fn show(&mut self) {
        self.active = true;
    }

    pub fn hide(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ICON} {} ({})", self.label(), self.title())
    }
}

/// Briefly brings the indicator to full opacity to show that a refresh just happened. Does
/// nothing if the page has no indicator.
pub fn flash<P: Page>(
    page: &SharedPage<P>,
    config: &IndicatorConfig,
    runtime: &Handle,
) -> Option<JoinHandle<()>> {
    lock(page).indicator_mut()?.set_opacity(FULL_OPACITY);
    trace!("Flashed indicator");

    let page = page.clone();
    let delay = config.flash_duration;
    let resting_opacity = config.resting_opacity;
    Some(runtime.spawn(async move {
        sleep(delay).await;
        if let Some(indicator) = lock(&page).indicator_mut() {
            indicator.set_opacity(resting_opacity);
        }
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::{Document, share};
    use more_asserts::*;
    use std::time::Duration;

    #[test]
    fn test_show_hide() {
        let mut indicator = Indicator::new(Locale::English, 0.8);
        assert!(!indicator.is_active());
        assert_eq!(indicator.class_name(), "auto-refresh-indicator");

        indicator.show();
        assert!(indicator.is_active());
        assert_eq!(indicator.class_name(), "auto-refresh-indicator active");

        indicator.hide();
        assert!(!indicator.is_active());
        assert_eq!(indicator.opacity(), 0.8);
        assert_lt!(indicator.opacity(), FULL_OPACITY);
    }

    #[test]
    fn test_text() {
        let indicator = Indicator::new(Locale::French, 0.8);
        assert_eq!(indicator.id(), "autoRefreshIndicator");
        assert_eq!(indicator.label(), "Auto-refresh actif");
        assert_eq!(indicator.title(), "Cliquer pour désactiver");
        assert_eq!(indicator.cursor(), "pointer");
        assert_eq!(indicator.to_string(), "⟳ Auto-refresh actif (Cliquer pour désactiver)");
    }

    #[test]
    fn test_closure_prompt() {
        let prompt: Box<dyn Prompt> = Box::new(|message: &str| message.ends_with('?'));
        assert!(prompt.confirm("Disable automatic refresh?"));
        assert!(!prompt.confirm("Nope"));

        assert!(AlwaysConfirm.confirm("Disable automatic refresh?"));
        assert!(!NeverConfirm.confirm("Disable automatic refresh?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flash() {
        let page = share(Document::default());
        let config = IndicatorConfig::default();
        lock(&page).attach_indicator(Indicator::new(Locale::English, config.resting_opacity));

        let revert = flash(&page, &config, &Handle::current()).unwrap();
        assert_eq!(lock(&page).indicator().unwrap().opacity(), FULL_OPACITY);

        sleep(Duration::from_millis(999)).await;
        assert_eq!(lock(&page).indicator().unwrap().opacity(), FULL_OPACITY);

        revert.await.unwrap();
        assert_eq!(lock(&page).indicator().unwrap().opacity(), 0.8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flash_without_indicator() {
        let page = share(Document::default());
        assert!(flash(&page, &IndicatorConfig::default(), &Handle::current()).is_none());
        assert!(lock(&page).indicator().is_none());
    }
}
