use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

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

pub const DEFAULT_API_URL: &str =
  "http://localhost:3000/api/tasks/";
const DEFAULT_TIMEOUT_SECS: &str =
  "30";
const DEFAULT_TOAST_MILLIS: &str =
  "1500";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "api.url".to_string(),
      DEFAULT_API_URL.to_string()
    );
    map.insert(
      "api.timeout".to_string(),
      DEFAULT_TIMEOUT_SECS.to_string()
    );
    map.insert(
      "toast.duration".to_string(),
      DEFAULT_TOAST_MILLIS.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading tasklistrc");
      cfg.load_file(
        &path,
        &mut Vec::new()
      )?;
    } else {
      debug!(
        "no tasklistrc found; using \
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
      debug!(key = %key, value = %v, "applying override");
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
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(
          || {
            anyhow!(
              "invalid {key} \
               setting: {v}"
            )
          }
        )
      })
      .transpose()
  }

  pub fn api_url(
    &self
  ) -> anyhow::Result<String> {
    let url = self
      .get("api.url")
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      });
    let url = url.trim();
    if url.is_empty() {
      return Err(anyhow!(
        "api.url cannot be empty"
      ));
    }
    Ok(url.to_string())
  }

  pub fn api_timeout(
    &self
  ) -> anyhow::Result<Duration> {
    let secs = self.get_positive(
      "api.timeout",
      DEFAULT_TIMEOUT_SECS
    )?;
    Ok(Duration::from_secs(secs))
  }

  pub fn toast_duration(
    &self
  ) -> anyhow::Result<Duration> {
    let millis = self.get_positive(
      "toast.duration",
      DEFAULT_TOAST_MILLIS
    )?;
    Ok(Duration::from_millis(millis))
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    Ok(
      self
        .get_bool("color")?
        .unwrap_or(true)
    )
  }

  fn get_positive(
    &self,
    key: &str,
    default: &str
  ) -> anyhow::Result<u64> {
    let raw = self
      .get(key)
      .unwrap_or_else(|| {
        default.to_string()
      });
    let value = raw
      .trim()
      .parse::<u64>()
      .with_context(|| {
        format!(
          "invalid {key} setting: \
           {raw}"
        )
      })?;
    if value == 0 {
      return Err(anyhow!(
        "{key} must be greater than \
         zero"
      ));
    }
    Ok(value)
  }

  /// `loading` holds the canonical
  /// paths of the files currently
  /// being read, outermost first.
  #[tracing::instrument(skip(
    self, loading
  ))]
  fn load_file(
    &mut self,
    path: &Path,
    loading: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| {
          path.clone()
        });
    if loading.contains(&canonical) {
      return Err(anyhow!(
        "include cycle: {}",
        path.display()
      ));
    }

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
    loading.push(canonical);

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
        line.split_once(" #")
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
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
          self.load_file(
            &include_path,
            loading
          )?;
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
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    loading.pop();
    Ok(())
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
    std::env::var("TASKLISTRC")
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
       ~/.tasklistrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".tasklistrc");
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

fn parse_bool(
  s: &str
) -> Option<bool> {
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
  use std::fs;

  use tempfile::tempdir;

  use super::Config;

  #[test]
  fn defaults_match_store_contract() {
    let cfg = Config::default();
    assert_eq!(
      cfg.api_url().expect("url"),
      "http://localhost:3000/api/tasks/"
    );
    assert_eq!(
      cfg
        .api_timeout()
        .expect("timeout")
        .as_secs(),
      30
    );
    assert_eq!(
      cfg
        .toast_duration()
        .expect("toast")
        .as_millis(),
      1500
    );
    assert!(cfg.color().expect("color"));
  }

  #[test]
  fn loads_rc_file_with_includes() {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "toast.duration = 900\n"
    )
    .expect("write include");
    let rc = temp.path().join("main.rc");
    fs::write(
      &rc,
      "# store location\n\
       api.url = http://tasks.local/api/tasks/ # staging\n\
       include extra.rc\n\
       color = off\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load rc");
    assert_eq!(
      cfg.api_url().expect("url"),
      "http://tasks.local/api/tasks/"
    );
    assert_eq!(
      cfg
        .toast_duration()
        .expect("toast")
        .as_millis(),
      900
    );
    assert!(!cfg.color().expect("color"));
    assert_eq!(
      cfg.loaded_files.len(),
      2
    );
  }

  #[test]
  fn include_cycles_are_errors() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("loop.rc");
    fs::write(
      &rc,
      "color = off\ninclude loop.rc\n"
    )
    .expect("write rc");
    let err = Config::load(Some(&rc))
      .expect_err("self include");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );

    let outer =
      temp.path().join("outer.rc");
    let inner =
      temp.path().join("inner.rc");
    fs::write(
      &outer,
      "include inner.rc\n"
    )
    .expect("write outer");
    fs::write(
      &inner,
      "include outer.rc\n"
    )
    .expect("write inner");
    let err = Config::load(Some(&outer))
      .expect_err("mutual include");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn repeated_includes_are_not_cycles() {
    let temp =
      tempdir().expect("tempdir");
    let shared =
      temp.path().join("shared.rc");
    fs::write(
      &shared,
      "api.timeout = 7\n"
    )
    .expect("write shared");
    let rc = temp.path().join("main.rc");
    fs::write(
      &rc,
      "include shared.rc\n\
       include shared.rc\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load rc");
    assert_eq!(
      cfg
        .api_timeout()
        .expect("timeout")
        .as_secs(),
      7
    );
    assert_eq!(
      cfg.loaded_files.len(),
      3
    );
  }

  #[test]
  fn rejects_malformed_lines() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "api.url\n")
      .expect("write rc");
    let err = Config::load(Some(&rc))
      .expect_err("malformed line");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn overrides_strip_rc_prefix_and_validate()
  {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![
      (
        "rc.api.timeout".to_string(),
        "0".to_string()
      ),
      (
        "color".to_string(),
        "maybe".to_string()
      ),
    ]);
    assert!(cfg.api_timeout().is_err());
    assert!(cfg.color().is_err());
  }
}
