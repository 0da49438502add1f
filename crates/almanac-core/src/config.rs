use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::format::{
  DEFAULT_TITLE_FORMAT,
  validate_pattern
};
use crate::grid::WeekStart;
use crate::view::RetargetPolicy;

const CONFIG_ENV_VAR: &str =
  "ALMANAC_CONFIG";
const CONFIG_DIR_NAME: &str = "almanac";
const CONFIG_FILE_NAME: &str =
  "calendar.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalendarFile {
  week_start:     Option<String>,
  color:          Option<bool>,
  title_format:   Option<String>,
  event_creation: EventCreationSection
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventCreationSection {
  on_reclick: Option<String>
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct EventCreationConfig {
  pub on_reclick: RetargetPolicy
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct CalendarConfig {
  pub week_start:     WeekStart,
  pub color:          bool,
  pub title_format:   String,
  pub event_creation:
    EventCreationConfig,
  pub loaded_file:    Option<PathBuf>
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      week_start:     WeekStart::Sunday,
      color:          true,
      title_format:
        DEFAULT_TITLE_FORMAT
          .to_string(),
      event_creation:
        EventCreationConfig {
          on_reclick:
            RetargetPolicy::Toggle
        },
      loaded_file:    None
    }
  }
}

impl CalendarConfig {
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let env_value =
      std::env::var(CONFIG_ENV_VAR).ok();
    Self::load_with_env(
      config_override,
      env_value.as_deref()
    )
  }

  /// Like [`CalendarConfig::load`], with the value of
  /// `ALMANAC_CONFIG` passed in instead of read from the process.
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load_with_env(
    config_override: Option<&Path>,
    env_value: Option<&str>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override,
      env_value
    )?;

    let Some(path) = path else {
      warn!(
        "no calendar config found; \
         using defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading calendar config");
    Self::load_file(&path)
  }

  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let raw = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg = Self::from_toml(&raw)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    cfg.loaded_file =
      Some(path.to_path_buf());
    Ok(cfg)
  }

  /// Parses TOML text. Values that do not make sense fall back to
  /// their defaults with a warning; only malformed TOML is an error.
  pub fn from_toml(
    raw: &str
  ) -> anyhow::Result<Self> {
    let file =
      toml::from_str::<CalendarFile>(raw)?;
    let mut cfg = Self::default();

    if let Some(week_start) =
      file.week_start.as_deref()
    {
      match week_start
        .parse::<WeekStart>()
      {
        | Ok(parsed) => {
          cfg.week_start = parsed
        }
        | Err(error) => {
          warn!(%error, "invalid week_start; using default");
        }
      }
    }

    if let Some(color) = file.color {
      cfg.color = color;
    }

    if let Some(title_format) =
      file.title_format
    {
      if validate_pattern(&title_format)
      {
        cfg.title_format = title_format;
      } else {
        warn!(
          title_format = %title_format,
          "invalid title_format; using default"
        );
      }
    }

    if let Some(on_reclick) = file
      .event_creation
      .on_reclick
      .as_deref()
    {
      match on_reclick
        .parse::<RetargetPolicy>()
      {
        | Ok(policy) => {
          cfg
            .event_creation
            .on_reclick = policy
        }
        | Err(error) => {
          warn!(%error, "invalid event_creation.on_reclick; using default");
        }
      }
    }

    debug!(?cfg, "calendar config resolved");
    Ok(cfg)
  }

  /// Applies `--rc key=value` pairs. Unlike file values, a bad
  /// override is an error.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");

      match key.as_str() {
        | "week_start" => {
          self.week_start = v.parse()?;
        }
        | "color" => {
          self.color = parse_bool(&v)
            .ok_or_else(|| {
              anyhow!(
                "invalid color \
                 setting: {v}"
              )
            })?;
        }
        | "title_format" => {
          if !validate_pattern(&v) {
            return Err(anyhow!(
              "invalid title_format: \
               {v}"
            ));
          }
          self.title_format = v;
        }
        | "event_creation.on_reclick" => {
          self
            .event_creation
            .on_reclick = v.parse()?;
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>,
  env_value: Option<&str>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    let path = expand_tilde(path);
    if !path.exists() {
      return Err(anyhow!(
        "config file does not exist: \
         {}",
        path.display()
      ));
    }
    return Ok(Some(path));
  }

  if let Some(env_path) = env_value {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(env_path)
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    warn!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_toml_gives_defaults() {
    let cfg = CalendarConfig::from_toml("")
      .expect("empty config");
    assert_eq!(
      cfg,
      CalendarConfig::default()
    );
  }

  #[test]
  fn reads_all_fields() {
    let cfg = CalendarConfig::from_toml(
      r#"
week_start = "monday"
color = false
title_format = "%B %Y"

[event_creation]
on_reclick = "retarget"
"#
    )
    .expect("valid config");
    assert_eq!(
      cfg.week_start,
      WeekStart::Monday
    );
    assert!(!cfg.color);
    assert_eq!(cfg.title_format, "%B %Y");
    assert_eq!(
      cfg.event_creation.on_reclick,
      RetargetPolicy::Retarget
    );
  }

  #[test]
  fn invalid_values_fall_back() {
    let cfg = CalendarConfig::from_toml(
      r#"
week_start = "friday"
title_format = "   "

[event_creation]
on_reclick = "sometimes"
"#
    )
    .expect("valid toml");
    assert_eq!(
      cfg,
      CalendarConfig::default()
    );
  }

  #[test]
  fn time_only_title_format_falls_back() {
    let cfg = CalendarConfig::from_toml(
      "title_format = \"%H:%M\""
    )
    .expect("valid toml");
    assert_eq!(
      cfg.title_format,
      DEFAULT_TITLE_FORMAT
    );

    let mut cfg =
      CalendarConfig::default();
    assert!(
      cfg
        .apply_overrides(vec![(
          "title_format".to_string(),
          "%H".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn tilde_paths_expand_to_home() {
    let Some(home) = dirs::home_dir()
    else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new(
        "~/cal/calendar.toml"
      )),
      home.join("cal/calendar.toml")
    );
    assert_eq!(
      expand_tilde(Path::new(
        "/etc/~/calendar.toml"
      )),
      PathBuf::from(
        "/etc/~/calendar.toml"
      )
    );
  }

  #[test]
  fn env_value_beats_default_location()
  {
    let resolved = resolve_config_path(
      None,
      Some("/srv/almanac.toml")
    )
    .expect("env path");
    assert_eq!(
      resolved,
      Some(PathBuf::from(
        "/srv/almanac.toml"
      ))
    );
    assert_eq!(
      resolve_config_path(
        None,
        Some("/dev/null")
      )
      .expect("disabled"),
      None
    );
  }

  #[test]
  fn malformed_toml_is_an_error() {
    assert!(
      CalendarConfig::from_toml(
        "week_start = "
      )
      .is_err()
    );
  }

  #[test]
  fn overrides_apply_and_validate() {
    let mut cfg =
      CalendarConfig::default();
    cfg
      .apply_overrides(vec![
        (
          "rc.week_start".to_string(),
          "mon".to_string()
        ),
        (
          "color".to_string(),
          "off".to_string()
        ),
      ])
      .expect("valid overrides");
    assert_eq!(
      cfg.week_start,
      WeekStart::Monday
    );
    assert!(!cfg.color);

    assert!(
      cfg
        .apply_overrides(vec![(
          "colour".to_string(),
          "on".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides(vec![(
          "color".to_string(),
          "maybe".to_string()
        )])
        .is_err()
    );
  }
}
