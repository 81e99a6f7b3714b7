use derivative::Derivative;
use log::*;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, time::Duration};

#[derive(Debug, Clone, Copy, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
pub enum TickAction {
    /// Reload the whole page on every tick
    #[derivative(Default)]
    Reload,
    /// Fetch and patch each live match card on every tick
    Sweep,
}

#[derive(Debug, Clone, Copy, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
pub enum Locale {
    #[derivative(Default)]
    English,
    French,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refresh {
    #[serde(with = "millis_duration")]
    pub interval: Duration,
    pub tick_action: TickAction,
    /// Stop refreshing while the page is hidden, and pick back up when it is visible again
    pub pause_when_hidden: bool,
}

impl Default for Refresh {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            tick_action: TickAction::Reload,
            pause_when_hidden: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(with = "millis_duration")]
    pub flash_duration: Duration,
    pub resting_opacity: f32,
}

impl Default for Indicator {
    fn default() -> Self {
        Self {
            flash_duration: Duration::from_secs(1),
            resting_opacity: 0.8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updater {
    #[serde(with = "millis_duration")]
    pub highlight_duration: Duration,
}

impl Default for Updater {
    fn default() -> Self {
        Self {
            highlight_duration: Duration::from_millis(300),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoresApi {
    pub url: String,
    pub require_https: bool,
    #[serde(default, with = "opt_millis_duration")]
    pub connect_timeout: Option<Duration>,
}

impl Default for ScoresApi {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            require_https: false,
            connect_timeout: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub locale: Locale,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub refresh: Refresh,
    pub indicator: Indicator,
    pub updater: Updater,
    pub scores_api: ScoresApi,
    pub display: Display,
}

impl Config {
    pub fn new_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let config_file = match read_to_string(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to read config file: {}", e);
                return Err(Box::new(e));
            }
        };

        match toml::from_str(&config_file) {
            Ok(c) => Ok(c),
            Err(e) => {
                error!("Failed to parse config file: {}", e);
                Err(Box::new(e))
            }
        }
    }
}

mod millis_duration {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(dur: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(dur.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod opt_millis_duration {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(dur: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dur {
            Some(dur) => {
                serializer.serialize_some(&u64::try_from(dur.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    const REFRESH_STRING: &str = indoc!(
        r#"interval = 10000
           tick_action = "Reload"
           pause_when_hidden = false"#
    );

    const INDICATOR_STRING: &str = indoc!(
        r#"flash_duration = 1000
           resting_opacity = 0.8"#
    );

    const UPDATER_STRING: &str = indoc!(r#"highlight_duration = 300"#);

    const SCORES_API_STRING: &str = indoc!(
        r#"url = "http://localhost:8080"
           require_https = false"#
    );

    const DISPLAY_STRING: &str = indoc!(r#"locale = "English""#);

    #[test]
    fn test_deser_refresh() {
        let refresh: Refresh = Default::default();
        let deser = toml::from_str(REFRESH_STRING);
        assert_eq!(deser, Ok(refresh));
    }

    #[test]
    fn test_deser_indicator() {
        let indicator: Indicator = Default::default();
        let deser = toml::from_str(INDICATOR_STRING);
        assert_eq!(deser, Ok(indicator));
    }

    #[test]
    fn test_deser_updater() {
        let updater: Updater = Default::default();
        let deser = toml::from_str(UPDATER_STRING);
        assert_eq!(deser, Ok(updater));
    }

    #[test]
    fn test_deser_scores_api() {
        let api: ScoresApi = Default::default();
        let deser = toml::from_str(SCORES_API_STRING);
        assert_eq!(deser, Ok(api));
    }

    #[test]
    fn test_deser_connect_timeout() {
        let deser: ScoresApi =
            toml::from_str(&format!("{SCORES_API_STRING}\nconnect_timeout = 2500")).unwrap();
        assert_eq!(deser.connect_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_deser_display() {
        let display: Display = Default::default();
        let deser = toml::from_str(DISPLAY_STRING);
        assert_eq!(deser, Ok(display));
    }

    #[test]
    fn test_deser_config() {
        let config: Config = Default::default();
        let deser = toml::from_str(&format!(
            "[refresh]\n{}\n[indicator]\n{}\n[updater]\n{}\n[scores_api]\n{}\n[display]\n{}",
            REFRESH_STRING, INDICATOR_STRING, UPDATER_STRING, SCORES_API_STRING, DISPLAY_STRING
        ));
        assert_eq!(deser, Ok(config));
    }

    #[test]
    fn test_ser_config() {
        let config = Config {
            refresh: Refresh {
                tick_action: TickAction::Sweep,
                pause_when_hidden: true,
                ..Default::default()
            },
            scores_api: ScoresApi {
                connect_timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            display: Display {
                locale: Locale::French,
            },
            ..Default::default()
        };
        let serialized = toml::to_string(&config).unwrap();
        let deser = toml::from_str(&serialized);
        assert_eq!(deser, Ok(config));
    }
}
