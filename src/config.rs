use crate::types::*;
use chrono::Local;
use std::{
    env,
    fs,
    io::Write,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn env_flag_true_default(key: &str, default: bool) -> bool {
  match env::var(key) {
    Ok(value) => {
      let value = value.trim().to_ascii_lowercase();
      matches!(value.as_str(), "1" | "true" | "yes" | "on")
    }
    Err(_) => default,
  }
}

pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  if config.api_base_url.trim().is_empty() {
    config.api_base_url =
      env_default("CC_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
  }
  if config.bind_addr.trim().is_empty() {
    config.bind_addr = env_default("CC_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
  }
  if config.site_dir.trim().is_empty() {
    if let Some(value) = env_default("CC_SITE_DIR") {
      config.site_dir = value;
    }
  }
  config.live_polling = env_flag_true_default("CC_LIVE_POLLING", config.live_polling);
  config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as u64
}

pub fn api_log_path() -> PathBuf {
  repo_root().join("logs").join("cc_api.log")
}

pub fn append_api_log(label: &str, payload: &str) {
  let dir = repo_root().join("logs");
  if fs::create_dir_all(&dir).is_err() {
    return;
  }
  let path = api_log_path();
  let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
  let entry = format!("[{timestamp}] {label}\n{payload}\n\n");
  if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
    let _ = file.write_all(entry.as_bytes());
  }
}

pub fn log_env_warnings() {
  let config = load_config_inner().unwrap_or_else(|_| AppConfig::default());
  let mut warnings = Vec::new();

  if !config_path().is_file() && env_default("CC_API_BASE_URL").is_none() {
    warnings.push(format!(
      "no config.json and CC_API_BASE_URL not set, using {DEFAULT_API_BASE_URL}"
    ));
  }
  let site_dir = resolve_repo_path(&config.site_dir);
  if !site_dir.is_dir() {
    warnings.push(format!(
      "site directory {} does not exist, static pages will 404",
      site_dir.display()
    ));
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_line_basic() {
        assert_eq!(
            parse_env_line("CC_API_BASE_URL=http://localhost:8000"),
            Some(("CC_API_BASE_URL".to_string(), "http://localhost:8000".to_string()))
        );
    }

    #[test]
    fn test_parse_env_line_quotes_and_comments() {
        assert_eq!(
            parse_env_line("export CC_SITE_DIR=\"public html\""),
            Some(("CC_SITE_DIR".to_string(), "public html".to_string()))
        );
        assert_eq!(
            parse_env_line("CC_BIND_ADDR=0.0.0.0:80 # listen everywhere"),
            Some(("CC_BIND_ADDR".to_string(), "0.0.0.0:80".to_string()))
        );
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("   "), None);
    }
}
