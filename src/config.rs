use crate::error::ConfigurationError;
use crate::util;
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("courseware".to_string())
}

fn default_storage() -> StorageBackend {
    match env::var("STORAGE_BACKEND").as_deref() {
        Ok("memory") => StorageBackend::Memory,
        _ => StorageBackend::MongoDb,
    }
}

fn default_enrollment_redirect() -> String {
    "/loading/my-enrollments".to_string()
}

fn default_token_lifetime_days() -> i64 {
    7
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Client location to navigate to once enrollment completes.
    #[serde(default = "default_enrollment_redirect")]
    pub enrollment_redirect: String,

    #[serde(default = "default_token_lifetime_days")]
    pub token_lifetime_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            storage: default_storage(),
            enrollment_redirect: default_enrollment_redirect(),
            token_lifetime_days: default_token_lifetime_days(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        Config::load_from(config_file)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, ConfigurationError> {
        let file = File::open(path.as_ref())?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = path.as_ref().to_path_buf();

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    /// Where the client should navigate after enrolling, relative to the
    /// requesting origin when one is known.
    pub fn redirect_target(&self, origin: Option<&str>) -> String {
        match origin {
            Some(origin) => format!(
                "{}{}",
                origin.trim_end_matches('/'),
                self.enrollment_redirect
            ),
            None => self.enrollment_redirect.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = serde_yaml::from_str("mongodb_db: testing\nstorage: memory\n")
            .expect("valid config yaml");

        assert_eq!(config.mongodb_db, "testing");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.enrollment_redirect, "/loading/my-enrollments");
        assert_eq!(config.token_lifetime_days, 7);
    }

    #[test]
    fn redirect_target_joins_origin() {
        let config = Config::default();

        assert_eq!(
            config.redirect_target(Some("https://learn.example.com/")),
            "https://learn.example.com/loading/my-enrollments"
        );
        assert_eq!(config.redirect_target(None), "/loading/my-enrollments");
    }
}
