//! Project `.env` parsing into a key-value map; applying it to the process env happens in lib.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `.env` in `override_dir` if given, else in the current directory; `None` when absent.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Minimal .env parser: KEY=VALUE lines; blank lines and `#` comment lines are skipped.
///
/// * `KEY=` and `KEY=""` both yield an empty value.
/// * Double-quoted values support `\"`; single-quoted values are taken literally.
/// * No multiline values, no `export` prefix.
fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        out.insert(key.to_string(), unquote(v.trim()));
    }
    out
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return value[1..value.len() - 1].replace("\\\"", "\"");
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].to_string();
    }
    value.to_string()
}

/// Reads `.env` from `override_dir` or the current directory. Missing file returns an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> std::io::Result<HashMap<String, String>> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path)?;
    Ok(parse_dotenv(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let m = parse_dotenv("HISTRIM_MINIMUM_MESSAGES=20\nRUST_LOG=histrim=debug\n");
        assert_eq!(m.get("HISTRIM_MINIMUM_MESSAGES"), Some(&"20".to_string()));
        assert_eq!(m.get("RUST_LOG"), Some(&"histrim=debug".to_string()));
    }

    #[test]
    fn skip_comments_and_empty() {
        let m = parse_dotenv("\n# compaction overrides\nHISTRIM_COMPRESSION_ORDER=disabled\n  \n");
        assert_eq!(
            m.get("HISTRIM_COMPRESSION_ORDER"),
            Some(&"disabled".to_string())
        );
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn quoted_values() {
        let m = parse_dotenv("LOG_FILE=\"/tmp/histrim log.txt\"\nNAME='single quoted'\n");
        assert_eq!(m.get("LOG_FILE"), Some(&"/tmp/histrim log.txt".to_string()));
        assert_eq!(m.get("NAME"), Some(&"single quoted".to_string()));
    }

    #[test]
    fn escaped_quote_in_double_quoted() {
        let m = parse_dotenv(r#"KEY="say \"hi\"""#);
        assert_eq!(m.get("KEY"), Some(&"say \"hi\"".to_string()));
    }

    /// **Scenario**: malformed lines are skipped, the rest still parses.
    #[test]
    fn malformed_lines_skipped() {
        let m = parse_dotenv("NOT_KEY_VALUE\n=value_only\nKEY=ok\n");
        assert_eq!(m.get("KEY"), Some(&"ok".to_string()));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn empty_values() {
        let m = parse_dotenv("A=\nB=\"\"\nC=\"\n");
        assert_eq!(m.get("A"), Some(&"".to_string()));
        assert_eq!(m.get("B"), Some(&"".to_string()));
        assert_eq!(m.get("C"), Some(&"\"".to_string()));
    }

    #[test]
    fn load_env_map_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let m = load_env_map(Some(dir.path())).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn load_env_map_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "HISTRIM_TARGET_REDUCTION_RATIO=0.3\nHISTRIM_BUDGET_RESERVATION=union\n",
        )
        .unwrap();
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("HISTRIM_TARGET_REDUCTION_RATIO"), Some(&"0.3".to_string()));
        assert_eq!(m.get("HISTRIM_BUDGET_RESERVATION"), Some(&"union".to_string()));
    }
}
