use std::fs;
use std::path::Path;

use anyhow::Context;
use lifeline_model::FinalizeConfig;
use serde::{Deserialize, Serialize};

/// Contents of the `--config` TOML file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub finalize: FinalizeConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lifeline_types::Timestamp;

    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let c = CliConfig::load_or_default(None).unwrap();
        assert_eq!(c, CliConfig::default());
        assert!(c.finalize.auto_delete);
    }

    #[test]
    fn load_finalize_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[finalize]\nauto_delete = false\nend_of_trace = 250.0").unwrap();

        let c = CliConfig::load(file.path()).unwrap();
        assert!(!c.finalize.auto_delete);
        assert_eq!(c.finalize.end_of_trace, Some(Timestamp::from_ms(250.0)));
        assert!(!c.finalize.rebase_to_zero);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(CliConfig::load(file.path()).unwrap(), CliConfig::default());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[finalize\n").unwrap();
        let err = CliConfig::load(file.path()).unwrap_err();
        assert!(format!("{err}").contains("parsing config"));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(&dir.path().join("absent.toml")).is_err());
    }
}
