use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Defaults for the `blockwise` binary, read from rc files and the command
/// line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    /// Extra block-type descriptor files, in registration order
    pub types: Vec<PathBuf>,
    pub no_builtins: bool,
    pub perf: bool,
    pub debug_log: Option<PathBuf>,
    pub pretty: bool,
}

impl ConfigFlags {
    /// Combine two flag sets; `other` wins for single-valued options and
    /// its type files are registered after ours.
    pub fn union(&self, other: &Self) -> Self {
        let mut types = self.types.clone();
        for path in &other.types {
            if !types.contains(path) {
                types.push(path.clone());
            }
        }
        Self {
            types,
            no_builtins: self.no_builtins || other.no_builtins,
            perf: self.perf || other.perf,
            debug_log: other.debug_log.clone().or_else(|| self.debug_log.clone()),
            pretty: self.pretty || other.pretty,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("blockwise").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("blockwise")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("blockwise").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("blockwise")
                .join("config");
        }
    }

    PathBuf::from(".blockwiserc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".blockwiserc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# blockwise defaults (saved with --save)".to_string());
    for types in &flags.types {
        lines.push(format!("--types {}", types.display()));
    }
    if flags.no_builtins {
        lines.push("--no-builtins".to_string());
    }
    if flags.pretty {
        lines.push("--pretty".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.debug_log {
        lines.push(format!("--debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags this module knows from raw command-line tokens.
/// Anything else (positional arguments, one-shot options) is skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--no-builtins" {
            flags.no_builtins = true;
        } else if token == "--perf" {
            flags.perf = true;
        } else if token == "--pretty" {
            flags.pretty = true;
        } else if token == "--types" {
            if let Some(next) = tokens.get(i + 1) {
                flags.types.push(PathBuf::from(next));
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--types=") {
            flags.types.push(PathBuf::from(value));
        } else if token == "--debug-log" {
            if let Some(next) = tokens.get(i + 1) {
                flags.debug_log = Some(PathBuf::from(next));
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--debug-log=") {
            flags.debug_log = Some(PathBuf::from(value));
        }
        i += 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "blockwise".to_string(),
            "--types".to_string(),
            "quote.json".to_string(),
            "--no-builtins".to_string(),
            "--apply".to_string(),
            "script.json".to_string(),
            "--debug-log=dispatch.log".to_string(),
            "--pretty".to_string(),
            "doc.json".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert_eq!(flags.types, vec![PathBuf::from("quote.json")]);
        assert!(flags.no_builtins);
        assert!(flags.pretty);
        assert!(!flags.perf);
        assert_eq!(flags.debug_log, Some(PathBuf::from("dispatch.log")));
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            types: vec![PathBuf::from("a.json")],
            debug_log: Some(PathBuf::from("file.log")),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            types: vec![PathBuf::from("b.json"), PathBuf::from("a.json")],
            debug_log: Some(PathBuf::from("cli.log")),
            pretty: true,
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert_eq!(
            merged.types,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(merged.debug_log, Some(PathBuf::from("cli.log")));
        assert!(merged.pretty);
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config");
        let flags = ConfigFlags {
            types: vec![PathBuf::from("quote.json"), PathBuf::from("code.json")],
            no_builtins: true,
            perf: true,
            debug_log: Some(PathBuf::from("dispatch.log")),
            pretty: true,
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }
}
