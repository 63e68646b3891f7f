// src/config.rs

//! Configuration loading utilities.
//!
//! Settings come from `data/config.toml` (or defaults), then environment
//! variables override individual fields.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::Result;
use crate::models::{BuildingDirectory, Config};

/// Config file location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "data/config.toml";

/// Load configuration from a TOML file and apply the process environment.
///
/// Falls back to defaults if the file cannot be loaded.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load_or_default(path);
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Override config fields from environment variables.
///
/// Blank values are ignored.
pub fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(env) = get("RHACBOT_ENV").or_else(|| get("ENV")) {
        config.env = env.trim().to_string();
    }
    if let Some(token) = get("GROUPME_ACCESS_TOKEN") {
        config.groupme.access_token = token;
    }
    if let Some(password) = get("ADMIN_PASSWORD") {
        config.auth.admin_password = password;
    }
    if let Some(dir) = get("DATABASE_DIR") {
        config.database.dir = Some(PathBuf::from(dir));
    }
    if let Some(name) = get("DATABASE_NAME") {
        config.database.name = Some(name);
    }
    if let Some(name) = get("DATABASE_NAME_DEV") {
        config.database.name_dev = Some(name);
    }
    if let Some(name) = get("DATABASE_NAME_PROD") {
        config.database.name_prod = Some(name);
    }
    if let Some(bind) = get("RHACBOT_BIND") {
        config.server.bind = bind;
    }
    if let Some(file) = get("BUILDINGS_FILE") {
        config.paths.buildings_file = file;
    }
}

/// Generate a temporary admin password when none is configured.
///
/// Returns `true` if one was generated.
pub fn ensure_admin_password(config: &mut Config) -> bool {
    if !config.auth.admin_password.trim().is_empty() {
        return false;
    }
    let generated = Uuid::new_v4().simple().to_string();
    log::warn!("ADMIN_PASSWORD is not set; generated a temporary admin password");
    log::info!("Temporary admin password: {generated}");
    config.auth.admin_password = generated;
    true
}

/// Resolve a configured path against a base directory.
pub fn resolve_path(base_path: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_path.join(path)
    }
}

/// Load config and the building directory.
///
/// A missing building file leaves the directory empty.
pub fn load_all(base_path: &Path) -> Result<(Config, BuildingDirectory)> {
    let config = load_config(&base_path.join(DEFAULT_CONFIG_PATH))?;

    let buildings_path = resolve_path(base_path, &config.paths.buildings_file);
    let directory = BuildingDirectory::load_or_empty(&buildings_path);

    for missing in config.missing_required() {
        log::warn!("{missing} is not set");
    }

    Ok((config, directory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::default();
        apply_env(
            &mut config,
            lookup(&[
                ("ENV", "prod"),
                ("GROUPME_ACCESS_TOKEN", "tok"),
                ("DATABASE_DIR", "/var/lib/rhacbot"),
                ("DATABASE_NAME_PROD", "rhac_prod"),
                ("RHACBOT_BIND", "0.0.0.0:8080"),
            ]),
        );

        assert_eq!(config.env, "prod");
        assert_eq!(config.groupme.access_token, "tok");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(
            config.database_path(),
            Some(PathBuf::from("/var/lib/rhacbot/rhac_prod.sqlite3"))
        );
        assert!(config.missing_required().is_empty());
    }

    #[test]
    fn test_rhacbot_env_wins_and_blanks_ignored() {
        let mut config = Config::default();
        apply_env(
            &mut config,
            lookup(&[("ENV", "prod"), ("RHACBOT_ENV", "test"), ("ADMIN_PASSWORD", "  ")]),
        );
        assert_eq!(config.env, "test");
        assert!(config.auth.admin_password.is_empty());
    }

    #[test]
    fn test_ensure_admin_password() {
        let mut config = Config::default();
        assert!(ensure_admin_password(&mut config));
        assert!(!config.auth.admin_password.is_empty());

        let generated = config.auth.admin_password.clone();
        assert!(!ensure_admin_password(&mut config));
        assert_eq!(config.auth.admin_password, generated);
    }

    #[test]
    fn test_load_all_reads_relative_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("data")).unwrap();
        fs::write(
            tmp.path().join("data/config.toml"),
            "env = \"test\"\n[paths]\nbuildings_file = \"data/halls.json\"\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("data/halls.json"),
            r#"[{"id": 1, "name": "Baker Hall", "region": "South"}]"#,
        )
        .unwrap();

        let (config, directory) = load_all(tmp.path()).unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(config.paths.buildings_file, "data/halls.json");
    }

    #[test]
    fn test_resolve_path_keeps_absolute() {
        let base = Path::new("/srv/rhacbot");
        assert_eq!(resolve_path(base, "/etc/b.json"), PathBuf::from("/etc/b.json"));
        assert_eq!(
            resolve_path(base, "data/b.json"),
            PathBuf::from("/srv/rhacbot/data/b.json")
        );
    }
}
