//! Locating the ONNX Runtime shared library that `ort` loads at runtime.

use std::path::{Path, PathBuf};

/// Environment variable read by `ort` when loading the library dynamically.
pub const ORT_DYLIB_ENV: &str = "ORT_DYLIB_PATH";

#[cfg(target_os = "macos")]
const LIBRARY_NAME: &str = "libonnxruntime.dylib";
#[cfg(target_os = "windows")]
const LIBRARY_NAME: &str = "onnxruntime.dll";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const LIBRARY_NAME: &str = "libonnxruntime.so";

/// Find the ONNX Runtime library.
///
/// Lookup order: `ORT_DYLIB_PATH`, then `configured` (a file or a directory
/// holding the library), then the per-user and system library directories.
pub fn locate_onnx_runtime(configured: Option<&Path>) -> Option<PathBuf> {
    let from_env = std::env::var_os(ORT_DYLIB_ENV).map(PathBuf::from);
    resolve_library(from_env.as_deref(), configured, &search_dirs())
}

fn resolve_library(
    from_env: Option<&Path>,
    configured: Option<&Path>,
    search_dirs: &[PathBuf],
) -> Option<PathBuf> {
    from_env
        .and_then(library_file)
        .or_else(|| configured.and_then(library_file))
        .or_else(|| search_dirs.iter().find_map(|dir| library_file(dir)))
}

fn library_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let candidate = path.join(LIBRARY_NAME);
    candidate.is_file().then_some(candidate)
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [
        dirs::data_dir().map(|d| d.join("mmrag").join("lib")),
        dirs::home_dir().map(|d| d.join(".local").join("lib").join("mmrag")),
    ]
    .into_iter()
    .flatten()
    .collect();

    let system: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/opt/homebrew/opt/onnxruntime/lib",
            "/usr/local/opt/onnxruntime/lib",
        ]
    } else if cfg!(target_os = "linux") {
        &[
            "/usr/local/lib",
            "/usr/lib",
            "/usr/lib/x86_64-linux-gnu",
            "/usr/lib/aarch64-linux-gnu",
        ]
    } else {
        &[]
    };
    dirs.extend(system.iter().map(PathBuf::from));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_library(dir: &TempDir) -> PathBuf {
        let path = dir.path().join(LIBRARY_NAME);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_env_path_wins() {
        let env_dir = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        let env_lib = with_library(&env_dir);
        with_library(&config_dir);

        let found = resolve_library(Some(&env_lib), Some(config_dir.path()), &[]);
        assert_eq!(found, Some(env_lib));
    }

    #[test]
    fn test_missing_env_path_falls_through_to_config() {
        let config_dir = TempDir::new().unwrap();
        let lib = with_library(&config_dir);
        let stale = config_dir.path().join("gone").join(LIBRARY_NAME);

        let found = resolve_library(Some(&stale), Some(config_dir.path()), &[]);
        assert_eq!(found, Some(lib));
    }

    #[test]
    fn test_configured_file_used_as_is() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("onnxruntime-1.22.so");
        std::fs::write(&custom, b"").unwrap();

        assert_eq!(resolve_library(None, Some(&custom), &[]), Some(custom));
    }

    #[test]
    fn test_search_dirs_in_order() {
        let empty = TempDir::new().unwrap();
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let lib = with_library(&first);
        with_library(&second);

        let dirs = vec![
            empty.path().to_path_buf(),
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ];
        assert_eq!(resolve_library(None, None, &dirs), Some(lib));
    }

    #[test]
    fn test_nothing_found() {
        let empty = TempDir::new().unwrap();
        let dirs = vec![empty.path().to_path_buf()];
        assert_eq!(resolve_library(None, Some(empty.path()), &dirs), None);
    }
}
