//! Migration Manager - File system operations for migrations
//!
//! Handles discovering migration files and scaffolding new ones.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{MigrationConfig, MigrationDescriptor, MigrationDirection};
use super::filename::parse_file_name;
use crate::error::{MigrationError, MigrationResult};

/// Migration manager for creating and loading migrations
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// List the migrations directory in listing order.
    ///
    /// A directory that cannot be read is an error. A file whose name does not
    /// parse is logged and skipped so it cannot block the others.
    pub fn load_migrations(&self) -> MigrationResult<Vec<MigrationDescriptor>> {
        let dir = &self.config.migrations_dir;
        let entries = fs::read_dir(dir).map_err(|e| MigrationError::io(dir, e))?;
        let clean = clean_dir(dir);

        let mut migrations = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::io(dir, e))?;

            let file_type = entry.file_type().map_err(|e| MigrationError::io(entry.path(), e))?;
            if file_type.is_dir() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                tracing::error!(
                    "Skipping migration file with non UTF-8 name: {}",
                    file_name.to_string_lossy()
                );
                continue;
            };

            match parse_file_name(file_name) {
                Ok(mut migration) => {
                    migration.file_path = clean.join(&migration.file_name);
                    tracing::debug!("Discovered migration {}", migration.file_path.display());
                    migrations.push(migration);
                }
                Err(e) => tracing::error!("{}", e),
            }
        }

        Ok(migrations)
    }

    /// Next free sequence number: one past the highest parseable file, or 1
    pub fn next_sequence_number(&self) -> MigrationResult<i64> {
        let highest = self
            .load_migrations()?
            .iter()
            .map(|m| m.sequence_number)
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    /// Create a new up migration file and return its file name
    pub fn create_migration(&self, title: &str) -> MigrationResult<String> {
        let slug = title.trim().replace(' ', "_").to_lowercase();
        if slug.is_empty() || slug.contains(['.', '/', '\\']) {
            return Err(MigrationError::InvalidTitle(title.to_string()));
        }

        let dir = &self.config.migrations_dir;
        fs::create_dir_all(dir).map_err(|e| MigrationError::io(dir, e))?;

        let number = self.next_sequence_number()?;
        let filename = format!("{}_{}.{}.sql", number, slug, MigrationDirection::Up);
        parse_file_name(&filename)?;

        let filepath = clean_dir(dir).join(&filename);
        if filepath.exists() {
            return Err(MigrationError::AlreadyExists(filepath));
        }

        fs::write(&filepath, self.create_migration_template(title, number))
            .map_err(|e| MigrationError::io(&filepath, e))?;

        tracing::info!("Created migration {}", filepath.display());
        Ok(filename)
    }

    fn create_migration_template(&self, title: &str, number: i64) -> String {
        format!(
            "-- Migration: {}\n\
             -- Number: {}\n\
             -- Created: {}\n\
             --\n\
             -- Runs once as a single batch, outside any transaction.\n\n",
            title.trim(),
            number,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop `.` components and redundant separators from a directory path
fn clean_dir(dir: &Path) -> PathBuf {
    let cleaned: PathBuf = dir
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_for(dir: &Path) -> MigrationManager {
        MigrationManager::with_config(MigrationConfig {
            migrations_dir: dir.to_path_buf(),
            ..MigrationConfig::default()
        })
    }

    #[test]
    fn test_load_migrations_skips_invalid_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("1_init.up.sql"), "CREATE TABLE a ();").unwrap();
        fs::write(temp_dir.path().join("2_init.down.sql"), "DROP TABLE a;").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a migration").unwrap();
        fs::write(temp_dir.path().join("x_bad.up.sql"), "SELECT 1;").unwrap();
        fs::create_dir(temp_dir.path().join("3_nested.up.sql")).unwrap();

        let mut migrations = manager_for(temp_dir.path()).load_migrations().unwrap();
        migrations.sort_by_key(|m| m.sequence_number);

        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].file_name, "1_init.up.sql");
        assert_eq!(migrations[1].direction, MigrationDirection::Down);
        assert_eq!(
            migrations[0].file_path,
            temp_dir.path().join("1_init.up.sql")
        );
    }

    #[test]
    fn test_load_migrations_missing_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = manager_for(&temp_dir.path().join("missing"))
            .load_migrations()
            .unwrap_err();
        assert!(matches!(err, MigrationError::Io { .. }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_load_migrations_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("1_init.up.sql"), "SELECT 1;").unwrap();
        let bad_name = OsStr::from_bytes(b"2_caf\xe9.up.sql");
        fs::write(temp_dir.path().join(bad_name), "SELECT 2;").unwrap();

        let migrations = manager_for(temp_dir.path()).load_migrations().unwrap();

        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].file_name, "1_init.up.sql");
    }

    #[test]
    fn test_load_migrations_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(manager_for(temp_dir.path()).load_migrations().unwrap().is_empty());
    }

    #[test]
    fn test_create_migration_numbers_sequentially() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_for(&temp_dir.path().join("scripts"));

        let first = manager.create_migration("Create Users").unwrap();
        assert_eq!(first, "1_create_users.up.sql");

        fs::write(temp_dir.path().join("scripts").join("7_seed.up.sql"), "").unwrap();
        let next = manager.create_migration("add index").unwrap();
        assert_eq!(next, "8_add_index.up.sql");

        let content = fs::read_to_string(temp_dir.path().join("scripts").join(&next)).unwrap();
        assert!(content.contains("-- Migration: add index"));
        assert!(content.contains("-- Number: 8"));
    }

    #[test]
    fn test_create_migration_rejects_bad_titles() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_for(temp_dir.path());

        for title in ["", "   ", "v1.2", "../escape"] {
            assert!(
                matches!(manager.create_migration(title), Err(MigrationError::InvalidTitle(_))),
                "{title}"
            );
        }
    }

    #[test]
    fn test_clean_dir() {
        assert_eq!(clean_dir(Path::new("./scripts/")), PathBuf::from("scripts"));
        assert_eq!(clean_dir(Path::new("db//scripts")), PathBuf::from("db/scripts"));
        assert_eq!(clean_dir(Path::new(".")), PathBuf::from("."));
    }
}
