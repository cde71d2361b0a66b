//! `[output]` section configuration.
//!
//! ```toml
//! [output]
//! line_ending = "lf"   # lf | crlf, applied to every text output
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub line_ending: LineEnding,
}

#[cfg(test)]
mod tests {
    use super::LineEnding;
    use crate::config::test_parse_config;

    #[test]
    fn test_line_ending_default() {
        let config = test_parse_config("");
        assert_eq!(config.output.line_ending, LineEnding::Lf);
    }

    #[test]
    fn test_line_ending_crlf() {
        let config = test_parse_config("[output]\nline_ending = \"crlf\"");
        assert_eq!(config.output.line_ending, LineEnding::Crlf);
        assert_eq!(config.output.line_ending.as_str(), "\r\n");
    }

    #[test]
    fn test_line_ending_invalid() {
        let result: Result<super::OutputConfig, _> = toml::from_str("line_ending = \"cr\"");
        assert!(result.is_err());
    }
}
