use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_BASE_URL: &str =
  "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 =
  10_000;

const RC_ENV_VAR: &str = "TASKFLOWRC";
const RC_FILE_NAME: &str =
  ".taskflowrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  /// Defaults only, no file lookup.
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "api.base_url".to_string(),
      DEFAULT_BASE_URL.to_string()
    );
    cfg.map.insert(
      "api.timeout_ms".to_string(),
      DEFAULT_TIMEOUT_MS.to_string()
    );
    cfg.map.insert(
      "color".to_string(),
      "on".to_string()
    );

    cfg
  }

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::defaults();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskflowrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no taskflowrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      if key == "api.token" {
        debug!(key = %key, "applying override");
      } else {
        debug!(key = %key, value = %v, "applying override");
      }
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Connection settings for the task service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
  pub base_url:   String,
  pub token:      Option<String>,
  pub timeout_ms: u64
}

impl ApiSettings {
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let base_url = cfg
      .get("api.base_url")
      .map(|raw| raw.trim().to_string())
      .filter(|raw| !raw.is_empty())
      .unwrap_or_else(|| {
        DEFAULT_BASE_URL.to_string()
      });
    if !(base_url.starts_with("http://")
      || base_url.starts_with("https://"))
    {
      return Err(anyhow!(
        "api.base_url must start with \
         http:// or https://, got: \
         {base_url}"
      ));
    }

    let timeout_ms = match cfg
      .get("api.timeout_ms")
    {
      | Some(raw) => {
        raw.trim().parse::<u64>().with_context(
          || {
            format!(
              "invalid api.timeout_ms: \
               {raw}"
            )
          }
        )?
      }
      | None => DEFAULT_TIMEOUT_MS
    };
    if timeout_ms == 0 {
      return Err(anyhow!(
        "api.timeout_ms must be \
         greater than zero"
      ));
    }

    let token = cfg
      .get("api.token")
      .map(|raw| raw.trim().to_string())
      .filter(|raw| !raw.is_empty());

    Ok(Self {
      base_url,
      token,
      timeout_ms
    })
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       taskflowrc lookup"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
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

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn loads_rc_file_with_comments_and_includes()
  {
    let dir = tempdir().expect("tempdir");
    let extra = dir.path().join("secret.rc");
    fs::write(
      &extra,
      "api.token = abc123\n"
    )
    .expect("write include");

    let rc = dir.path().join("taskflowrc");
    fs::write(
      &rc,
      "# taskflow settings\n\
       api.base_url = https://tasks.example.com # prod\n\
       include secret.rc\n\
       color = off\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load config");
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(cfg.get_bool("color"), Some(false));

    let api = ApiSettings::from_config(
      &cfg
    )
    .expect("api settings");
    assert_eq!(
      api.base_url,
      "https://tasks.example.com"
    );
    assert_eq!(
      api.token.as_deref(),
      Some("abc123")
    );
    assert_eq!(
      api.timeout_ms,
      DEFAULT_TIMEOUT_MS
    );
  }

  #[test]
  fn rejects_lines_without_equals() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("taskflowrc");
    fs::write(&rc, "api.base_url\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("line without '='");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn overrides_strip_rc_prefix_and_validate()
  {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![
      (
        "rc.api.timeout_ms".to_string(),
        "250".to_string()
      ),
      (
        "api.token".to_string(),
        "  ".to_string()
      ),
    ]);
    let api = ApiSettings::from_config(
      &cfg
    )
    .expect("api settings");
    assert_eq!(api.timeout_ms, 250);
    assert_eq!(api.token, None);

    cfg.apply_overrides(vec![(
      "api.timeout_ms".to_string(),
      "soon".to_string()
    )]);
    assert!(
      ApiSettings::from_config(&cfg)
        .is_err()
    );

    cfg.apply_overrides(vec![
      (
        "api.timeout_ms".to_string(),
        "100".to_string()
      ),
      (
        "api.base_url".to_string(),
        "ftp://tasks".to_string()
      ),
    ]);
    assert!(
      ApiSettings::from_config(&cfg)
        .is_err()
    );
  }
}
