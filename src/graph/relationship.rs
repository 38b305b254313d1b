use std::fmt;

use crate::codec::{ConfigError, decode_fields, encode_fields, parse_flag};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeStyle {
    #[default]
    Solid,
    LongDash,
    Dotted,
    Alternate,
}

impl EdgeStyle {
    pub const ALL: [EdgeStyle; 4] = [
        EdgeStyle::Solid,
        EdgeStyle::LongDash,
        EdgeStyle::Dotted,
        EdgeStyle::Alternate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::LongDash => "longdash",
            Self::Dotted => "dotted",
            Self::Alternate => "alternate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.name() == name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeIcon {
    #[default]
    Circle,
    Square,
    Triangle,
    Diamond,
}

impl NodeIcon {
    pub const ALL: [NodeIcon; 4] = [
        NodeIcon::Circle,
        NodeIcon::Square,
        NodeIcon::Triangle,
        NodeIcon::Diamond,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Triangle => "triangle",
            Self::Diamond => "diamond",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|icon| icon.name() == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationshipSpec {
    pub from_field: String,
    pub from_icon: NodeIcon,
    pub from_typed: bool,
    pub to_field: String,
    pub to_icon: NodeIcon,
    pub to_typed: bool,
    pub style: EdgeStyle,
    pub ignore_not_set: bool,
}

impl RelationshipSpec {
    const TOKENS: usize = 8;

    pub fn new(from_field: impl Into<String>, to_field: impl Into<String>) -> Self {
        Self {
            from_field: from_field.into(),
            from_icon: NodeIcon::default(),
            from_typed: false,
            to_field: to_field.into(),
            to_icon: NodeIcon::default(),
            to_typed: false,
            style: EdgeStyle::default(),
            ignore_not_set: false,
        }
    }

    /// Entity identifier for a from-side key, prefixed by the field when typed.
    pub fn from_entity(&self, key: &str) -> String {
        entity_name(&self.from_field, key, self.from_typed)
    }

    pub fn to_entity(&self, key: &str) -> String {
        entity_name(&self.to_field, key, self.to_typed)
    }

    pub fn encode(&self) -> String {
        encode_fields(&[
            self.from_field.as_str(),
            self.from_icon.name(),
            bool_name(self.from_typed),
            self.to_field.as_str(),
            self.to_icon.name(),
            bool_name(self.to_typed),
            self.style.name(),
            bool_name(self.ignore_not_set),
        ])
    }

    pub fn decode(raw: &str) -> Result<Self, ConfigError> {
        let tokens = decode_fields(raw, Self::TOKENS)?;
        let [
            from_field,
            from_icon,
            from_typed,
            to_field,
            to_icon,
            to_typed,
            style,
            ignore_not_set,
        ] = <[String; 8]>::try_from(tokens).map_err(|tokens| ConfigError::TokenCount {
            expected: Self::TOKENS,
            found: tokens.len(),
        })?;

        Ok(Self {
            from_icon: parse_icon("from_icon", &from_icon)?,
            from_typed: parse_flag("from_typed", &from_typed)?,
            to_icon: parse_icon("to_icon", &to_icon)?,
            to_typed: parse_flag("to_typed", &to_typed)?,
            style: EdgeStyle::from_name(&style).ok_or_else(|| ConfigError::InvalidValue {
                key: "style".to_owned(),
                value: style.clone(),
            })?,
            ignore_not_set: parse_flag("ignore_not_set", &ignore_not_set)?,
            from_field,
            to_field,
        })
    }
}

impl fmt::Display for RelationshipSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.from_field, self.to_field)
    }
}

fn entity_name(field: &str, key: &str, typed: bool) -> String {
    if typed {
        format!("{field}={key}")
    } else {
        key.to_owned()
    }
}

fn bool_name(flag: bool) -> &'static str {
    if flag { "true" } else { "false" }
}

fn parse_icon(key: &str, value: &str) -> Result<NodeIcon, ConfigError> {
    NodeIcon::from_name(value).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encoding_round_trips_awkward_field_names() {
        let spec = RelationshipSpec {
            from_field: "src|ip".to_owned(),
            from_icon: NodeIcon::Square,
            from_typed: true,
            to_field: "dst ip".to_owned(),
            to_icon: NodeIcon::Diamond,
            to_typed: false,
            style: EdgeStyle::Dotted,
            ignore_not_set: true,
        };

        assert_eq!(RelationshipSpec::decode(&spec.encode()), Ok(spec));
    }

    #[test]
    fn decode_rejects_short_tuples_and_bad_values() {
        assert!(matches!(
            RelationshipSpec::decode("sip|circle|false"),
            Err(ConfigError::TokenCount {
                expected: 8,
                found: 3
            })
        ));
        assert!(matches!(
            RelationshipSpec::decode("sip|hexagon|false|dip|circle|false|solid|false"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn typed_endpoints_are_prefixed_with_field() {
        let mut spec = RelationshipSpec::new("sip", "dip");
        spec.to_typed = true;

        assert_eq!(spec.from_entity("10.0.0.1"), "10.0.0.1");
        assert_eq!(spec.to_entity("10.0.0.1"), "dip=10.0.0.1");
    }
}
