// External tool resolver for ffmpeg
//
// Resolution order:
// 1) Environment variable override (SHELF_FFMPEG_PATH)
// 2) Sidecar next to the executable (or in its bin/ subdirectory)
// 3) PATH fallback
//
// A missing tool is not fatal anywhere: previews just come back empty.

use std::env;
use std::path::PathBuf;

use crate::constants::ENV_FFMPEG_PATH;

/// Get the directory containing the current executable
fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Resolve a tool path, falling back to the bare name for PATH lookup.
fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
        log::warn!("{} points at missing file {}, ignoring", env_key, v);
    }

    let mut filename = default_name.to_string();
    if cfg!(windows) && !filename.to_lowercase().ends_with(".exe") {
        filename.push_str(".exe");
    }

    if let Some(dir) = exe_dir() {
        for candidate in [dir.join(&filename), dir.join("bin").join(&filename)] {
            if candidate.exists() {
                return candidate;
            }
        }
    }

    PathBuf::from(default_name)
}

/// Get path to ffmpeg binary
pub fn ffmpeg_path() -> PathBuf {
    resolve_tool(ENV_FFMPEG_PATH, "ffmpeg")
}

/// Check whether ffmpeg can actually be launched
pub fn is_ffmpeg_available() -> bool {
    let path = ffmpeg_path();
    std::process::Command::new(&path)
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tool_fallback() {
        let path = resolve_tool("SHELF_TEST_NONEXISTENT", "testcmd");
        assert_eq!(path, PathBuf::from("testcmd"));
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake_ffmpeg");
        std::fs::write(&fake, "test").unwrap();

        std::env::set_var("SHELF_TEST_TOOL", fake.to_str().unwrap());
        let path = resolve_tool("SHELF_TEST_TOOL", "default");
        assert_eq!(path, fake);
        std::env::remove_var("SHELF_TEST_TOOL");
    }

    #[test]
    fn test_env_override_to_missing_file_is_ignored() {
        std::env::set_var("SHELF_TEST_MISSING_TOOL", "/definitely/not/here/ffmpeg");
        let path = resolve_tool("SHELF_TEST_MISSING_TOOL", "fallback");
        assert_eq!(path, PathBuf::from("fallback"));
        std::env::remove_var("SHELF_TEST_MISSING_TOOL");
    }
}
