use serde::de::Deserialize;

use config::{Config, ConfigError, Value, File, FileFormat, Environment};

use crate::error::*;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub conf: Config
}

impl AppConfig {
  /// Load `conf/default`, then either `config_file` or the `RUN_MODE`
  /// file plus `APP_*` environment overrides.
  pub fn load(config_file: Option<&str>) -> Result<Self> {
    // Load defaults
    let mut builder = Config::builder()
      .add_source(File::with_name("conf/default"));

    if let Some(config_file) = config_file {
      builder = builder.add_source(File::with_name(config_file));
    } else {
      // Get RUN_MODE from environment
      let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
      builder = builder
        .add_source(File::with_name(&format!("conf/{}", env)).required(false))
        // Allow overrides from environment
        .add_source(Environment::with_prefix("app").separator("_"));
    }

    Ok(AppConfig {
      conf: builder.build()?,
    })
  }

  /// Build from an inline TOML document.
  pub fn from_toml(toml: &str) -> Result<Self> {
    let conf = Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()?;
    Ok(AppConfig {
      conf,
    })
  }

  pub fn get<'de, T: Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
    Ok(self.conf.get(key).map(Some).or_else(|e| {
      match e {
        ConfigError::NotFound(_) => Ok(None),
        err => Err(err),
      }
    })?)
  }

  pub fn get_str(&self, key: &str) -> Result<Option<String>> {
    let val = if let Some(val) = self.get::<Value>(key)? {
      Some(val.into_string()?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
    let val = if let Some(val) = self.get::<Value>(key)? {
      Some(val.into_int()?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
    let val = if let Some(val) = self.get::<Value>(key)? {
      Some(val.into_bool()?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_array(&self, key: &str) -> Result<Option<Vec<Value>>> {
    let val = if let Some(val) = self.get::<Value>(key)? {
      Some(val.into_array()?)
    } else {
      None
    };
    Ok(val)
  }

  /// List of strings, e.g. `servers` or `web.services`.
  pub fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>> {
    match self.get_array(key)? {
      Some(list) => {
        let mut names = Vec::with_capacity(list.len());
        for val in list {
          names.push(val.into_string()?);
        }
        Ok(Some(names))
      },
      None => Ok(None),
    }
  }
}
