//! Environment readiness check.
//!
//! Reports whether a browser can be found and launched, whether the output
//! and audit locations are writable, and whether the configuration is valid.
//! Every failure includes a specific fix instruction.

use crate::cli::output::{self, Styled};
use crate::config::{rankings_home, ScrapeConfig};
use crate::renderer::chromium::find_chromium;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub async fn run() -> Result<()> {
    let config = ScrapeConfig::from_env();
    if output::is_json() {
        return run_json(&config);
    }

    let s = Styled::new();
    let mut ready = true;
    let mut has_warning = false;

    output::print_header(&s);

    // ── System ──────────────────────────────────────────────────────────
    output::print_section(&s, "System");
    output::print_check(
        s.ok_sym(),
        "OS:",
        &format!("{} ({})", format_os(), std::env::consts::ARCH),
    );
    eprintln!();

    // ── Browser ─────────────────────────────────────────────────────────
    output::print_section(&s, "Browser");
    match find_chromium(config.renderer.chromium_path.as_ref()) {
        Some(path) => {
            let version = get_chromium_version(&path);
            let ver_str = version.as_deref().unwrap_or("unknown version");
            output::print_check(
                s.ok_sym(),
                "Chromium:",
                &format!("{ver_str} at {}", path.display()),
            );

            match test_headless_launch(&path) {
                Ok(ms) => output::print_check(
                    s.ok_sym(),
                    "Headless test:",
                    &format!("launched and closed in {ms}ms"),
                ),
                Err(e) => {
                    output::print_check(s.fail_sym(), "Headless test:", &format!("FAILED: {e}"));
                    if is_docker() {
                        output::print_detail("Running in Docker? Add --disable-dev-shm-usage or raise shm size");
                    }
                    ready = false;
                }
            }
        }
        None => {
            output::print_check(s.fail_sym(), "Chromium:", "NOT FOUND");
            output::print_detail("Fix: install Google Chrome or Chromium");
            output::print_detail("Or set RANKINGS_CHROMIUM_PATH=/path/to/chrome");
            ready = false;
        }
    }
    eprintln!();

    // ── Output ──────────────────────────────────────────────────────────
    output::print_section(&s, "Output");
    match check_writable_dir(&config.output_dir) {
        Ok(()) => output::print_check(
            s.ok_sym(),
            "Export dir:",
            &format!("{} (writable)", config.output_dir.display()),
        ),
        Err(e) => {
            output::print_check(s.fail_sym(), "Export dir:", &e.to_string());
            output::print_detail("Fix: pass --output-dir or set RANKINGS_OUTPUT_DIR");
            ready = false;
        }
    }
    match config.audit_log.as_deref().and_then(Path::parent) {
        Some(dir) => match check_writable_dir(dir) {
            Ok(()) => output::print_check(
                s.ok_sym(),
                "Audit log:",
                &config
                    .audit_log
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            Err(e) => {
                output::print_check(s.warn_sym(), "Audit log:", &e.to_string());
                output::print_detail("Runs continue without an audit trail. Set RANKINGS_HOME to fix.");
                has_warning = true;
            }
        },
        None => output::print_check(s.info_sym(), "Audit log:", "disabled"),
    }
    eprintln!();

    // ── Config ──────────────────────────────────────────────────────────
    output::print_section(&s, "Config");
    match config.validate() {
        Ok(()) => {
            output::print_check(s.ok_sym(), "Base URL:", &config.base_url);
            output::print_check(
                s.ok_sym(),
                "Seasons:",
                &format!("{}-{}", config.start_year, config.end_year),
            );
        }
        Err(e) => {
            output::print_check(s.fail_sym(), "Config:", &e.to_string());
            output::print_detail("Fix: check RANKINGS_BASE_URL");
            ready = false;
        }
    }

    if ready && !has_warning {
        output::print_status(&s, &s.green("READY"), "run 'cfp-rankings scrape'");
    } else if ready {
        output::print_status(&s, &s.yellow("READY"), "some warnings above");
    } else {
        output::print_status(&s, &s.red("NOT READY"), "fix issues above");
    }
    Ok(())
}

/// JSON output mode for doctor.
fn run_json(config: &ScrapeConfig) -> Result<()> {
    let chromium_path = find_chromium(config.renderer.chromium_path.as_ref());
    let chromium_version = chromium_path.as_ref().and_then(|p| get_chromium_version(p));
    let json = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "chromium_path": chromium_path.map(|p| p.display().to_string()),
        "chromium_version": chromium_version,
        "output_dir": config.output_dir.display().to_string(),
        "output_dir_writable": check_writable_dir(&config.output_dir).is_ok(),
        "rankings_home": rankings_home().display().to_string(),
        "config_error": config.validate().err().map(|e| e.to_string()),
    });
    output::print_json(&json);
    Ok(())
}

/// Format OS name nicely.
fn format_os() -> String {
    match std::env::consts::OS {
        "macos" => {
            if let Ok(out) = Command::new("sw_vers").arg("-productVersion").output() {
                if out.status.success() {
                    let ver = String::from_utf8_lossy(&out.stdout).trim().to_string();
                    return format!("macOS {ver}");
                }
            }
            "macOS".to_string()
        }
        "linux" => std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|contents| {
                contents
                    .lines()
                    .find_map(|l| l.strip_prefix("PRETTY_NAME="))
                    .map(|name| name.trim_matches('"').to_string())
            })
            .unwrap_or_else(|| "Linux".to_string()),
        other => other.to_string(),
    }
}

/// Version string reported by the browser binary.
fn get_chromium_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if output.status.success() {
        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Some(parse_version(&raw))
    } else {
        None
    }
}

fn parse_version(raw: &str) -> String {
    raw.replace("Google Chrome ", "")
        .replace("Chromium ", "")
        .trim()
        .to_string()
}

/// Launch the browser headless on a blank page and time it.
fn test_headless_launch(chromium_path: &Path) -> Result<u64> {
    let start = std::time::Instant::now();
    let output = Command::new(chromium_path)
        .args([
            "--headless",
            "--disable-gpu",
            "--no-sandbox",
            "--dump-dom",
            "about:blank",
        ])
        .output()
        .map_err(|e| anyhow!("failed to launch: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{}",
            stderr.lines().next().unwrap_or("unknown error")
        ));
    }
    Ok(start.elapsed().as_millis() as u64)
}

/// Create `dir` if needed and prove a file can be written in it.
fn check_writable_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| anyhow!("cannot create {}: {e}", dir.display()))?;
    let probe: PathBuf = dir.join(".rankings_write_probe");
    std::fs::write(&probe, b"ok").map_err(|e| anyhow!("{} is not writable: {e}", dir.display()))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

fn is_docker() -> bool {
    Path::new("/.dockerenv").exists()
        || std::fs::read_to_string("/proc/1/cgroup")
            .map(|s| s.contains("docker") || s.contains("containerd"))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("Google Chrome 126.0.6478.126 "), "126.0.6478.126");
        assert_eq!(parse_version("Chromium 124.0.6367.60"), "124.0.6367.60");
    }

    #[test]
    fn test_check_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        check_writable_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join(".rankings_write_probe").exists());
    }

    #[test]
    fn test_check_writable_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(check_writable_dir(&file).is_err());
    }
}
