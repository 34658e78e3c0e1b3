// crates/cmdtlm-rs/src/config.rs

use core::fmt;

/// Error raised while processing a configuration line.
///
/// Carries the usage text of the offending keyword and, when known, the
/// location of the line in its source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub message: String,
    pub usage: String,
    pub keyword: String,
    pub filename: String,
    pub line: String,
    pub line_number: usize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.usage.is_empty() {
            write!(f, "\nUsage: {}", self.usage)?;
        }
        if !self.filename.is_empty() || self.line_number > 0 {
            write!(f, "\n{}:{}: {}", self.filename, self.line_number, self.line)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// One tokenized `KEYWORD <params>` line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigLine {
    /// Upper-cased keyword.
    pub keyword: String,
    pub parameters: Vec<String>,
    pub filename: String,
    /// Raw line text, used to tell quoted from unquoted parameters.
    pub line: String,
    pub line_number: usize,
}

impl ConfigLine {
    /// Builds a line from an already tokenized keyword and parameters.
    pub fn new<S: AsRef<str>>(keyword: &str, parameters: &[S]) -> Self {
        let parameters: Vec<String> = parameters.iter().map(|p| p.as_ref().to_string()).collect();
        let mut line = keyword.to_string();
        for p in &parameters {
            line.push(' ');
            line.push_str(p);
        }
        Self {
            keyword: keyword.to_ascii_uppercase(),
            parameters,
            filename: String::new(),
            line,
            line_number: 0,
        }
    }

    /// Splits `text` on whitespace, keeping single or double quoted runs as
    /// one parameter. Blank lines and `#` comments yield `None`.
    pub fn tokenize(text: &str, filename: &str, line_number: usize) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        let mut tokens = Vec::new();
        let mut chars = trimmed.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }
            let mut token = String::new();
            if c == '"' || c == '\'' {
                chars.next();
                for ch in chars.by_ref() {
                    if ch == c {
                        break;
                    }
                    token.push(ch);
                }
            } else {
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() {
                        break;
                    }
                    token.push(ch);
                    chars.next();
                }
            }
            tokens.push(token);
        }
        let (keyword, parameters) = tokens.split_first()?;
        Some(Self {
            keyword: keyword.to_ascii_uppercase(),
            parameters: parameters.to_vec(),
            filename: filename.to_string(),
            line: trimmed.to_string(),
            line_number,
        })
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }

    /// True when `token` appears quoted in the raw line.
    pub fn is_quoted(&self, token: &str) -> bool {
        self.line.contains(&format!("\"{}\"", token)) || self.line.contains(&format!("'{}'", token))
    }

    /// Fails unless the parameter count lies within `min..=max`.
    pub fn verify_num_parameters(
        &self,
        min: usize,
        max: Option<usize>,
        usage: &str,
    ) -> Result<(), ConfigError> {
        let count = self.parameters.len();
        if count < min {
            return Err(self.error(format!("Not enough parameters for {}.", self.keyword), usage));
        }
        if max.is_some_and(|max| count > max) {
            return Err(self.error(format!("Too many parameters for {}.", self.keyword), usage));
        }
        Ok(())
    }

    /// Builds an error annotated with this line's location.
    pub fn error(&self, message: impl Into<String>, usage: &str) -> ConfigError {
        ConfigError {
            message: message.into(),
            usage: usage.to_string(),
            keyword: self.keyword.clone(),
            filename: self.filename.clone(),
            line: self.line.clone(),
            line_number: self.line_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes_and_comments() {
        let line = ConfigLine::tokenize(
            "  command inst ping BIG_ENDIAN \"Ping the target\"",
            "cmd.txt",
            3,
        )
        .unwrap();
        assert_eq!(line.keyword, "COMMAND");
        assert_eq!(line.parameters, vec!["inst", "ping", "BIG_ENDIAN", "Ping the target"]);
        assert_eq!(line.line_number, 3);
        assert!(line.is_quoted("Ping the target"));
        assert!(!line.is_quoted("inst"));

        assert!(ConfigLine::tokenize("# comment", "cmd.txt", 1).is_none());
        assert!(ConfigLine::tokenize("   ", "cmd.txt", 2).is_none());
    }

    #[test]
    fn test_verify_num_parameters() {
        let line = ConfigLine::new("UNITS", &["Volts"]);
        let err = line.verify_num_parameters(2, Some(2), "UNITS <FULL> <ABBR>").unwrap_err();
        assert_eq!(err.message, "Not enough parameters for UNITS.");
        assert_eq!(err.usage, "UNITS <FULL> <ABBR>");

        let line = ConfigLine::new("REQUIRED", &["extra"]);
        let err = line.verify_num_parameters(0, Some(0), "REQUIRED").unwrap_err();
        assert_eq!(err.message, "Too many parameters for REQUIRED.");
        assert!(line.verify_num_parameters(0, None, "").is_ok());
    }

    #[test]
    fn test_error_display() {
        let line = ConfigLine::tokenize("LIMITS DEFAULT", "tlm.txt", 12).unwrap();
        let err = line.error("Bad limits", "LIMITS <SET>");
        assert_eq!(
            err.to_string(),
            "Bad limits\nUsage: LIMITS <SET>\ntlm.txt:12: LIMITS DEFAULT"
        );
    }
}
