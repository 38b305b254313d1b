use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unexpected configuration key: {0}")]
    UnexpectedKey(String),
    #[error("malformed configuration token: {0}")]
    MalformedToken(String),
    #[error("expected {expected} tokens but found {found}")]
    TokenCount { expected: usize, found: usize },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("token is not valid url encoding: {0}")]
    BadEncoding(String),
}

/// Joins url-encoded fields with `|`.
pub fn encode_fields(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| urlencoding::encode(field).into_owned())
        .collect::<Vec<_>>()
        .join("|")
}

pub fn decode_fields(raw: &str, expected: usize) -> Result<Vec<String>, ConfigError> {
    let tokens = raw.split('|').collect::<Vec<_>>();
    if tokens.len() != expected {
        return Err(ConfigError::TokenCount {
            expected,
            found: tokens.len(),
        });
    }

    tokens.into_iter().map(decode_token).collect()
}

pub fn decode_token(token: &str) -> Result<String, ConfigError> {
    urlencoding::decode(token)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ConfigError::BadEncoding(token.to_owned()))
}

pub fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fields_survive_separator_characters() {
        let encoded = encode_fields(&["a|b", "c,d", "e f"]);
        assert_eq!(encoded.matches('|').count(), 2);
        assert_eq!(
            decode_fields(&encoded, 3),
            Ok(vec!["a|b".to_owned(), "c,d".to_owned(), "e f".to_owned()])
        );
    }

    #[test]
    fn wrong_token_count_is_reported() {
        assert_eq!(
            decode_fields("a|b", 3),
            Err(ConfigError::TokenCount {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn flags_only_accept_literal_booleans() {
        assert_eq!(parse_flag("arrows", "true"), Ok(true));
        assert!(matches!(
            parse_flag("arrows", "yes"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
