use std::fs;

use greentrace::settings::SETTINGS_FILE_NAME;
use tempfile::TempDir;

/// Fresh data directory with the remote classifier switched off.
pub fn data_dir() -> TempDir {
    let dir = TempDir::with_prefix("greentrace-").unwrap();
    fs::write(
        dir.path().join(SETTINGS_FILE_NAME),
        r#"{"classifier": {"enabled": false}}"#,
    )
    .unwrap();
    dir
}
