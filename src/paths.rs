use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the main log file: `<exe_dir>/logs/adb_compare_bot.log`
pub fn get_log_file() -> PathBuf {
    get_logs_dir().join("adb_compare_bot.log")
}

/// Returns the default config file: `<exe_dir>/config/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config").join("config.json")
}

/// Returns the local adb install directory: `<exe_dir>/adb/`
pub fn get_adb_dir() -> PathBuf {
    get_exe_dir().join("adb")
}

/// Returns the per-user data directory used for downloaded OCR data.
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adb-compare-bot")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}
