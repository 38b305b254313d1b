use std::collections::BTreeSet;

use crate::codec::{ConfigError, decode_token, parse_flag};
use crate::graph::RelationshipSpec;

use super::options::{
    BackgroundMode, LabelKind, LinkColorMode, LinkSizeMode, NodeColorMode, NodeSizeMode,
    RenderOptions,
};

const KEYS: [&str; 17] = [
    "nodesize",
    "nodecolor",
    "linksize",
    "linkcolor",
    "nodelabels",
    "linklabels",
    "background",
    "colorby",
    "curves",
    "transparency",
    "arrows",
    "timing",
    "strict",
    "dynamiclabels",
    "drawnodelabels",
    "drawlinklabels",
    "rels",
];

/// Bookmarkable view state: render options plus the active relationships.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewConfig {
    pub options: RenderOptions,
    pub relationships: Vec<RelationshipSpec>,
}

impl ViewConfig {
    pub fn serialize(&self) -> String {
        let options = &self.options;
        let flag = |value: bool| if value { "true" } else { "false" };

        let tokens = [
            ("nodesize", options.node_size.name().to_owned()),
            ("nodecolor", options.node_color.name().to_owned()),
            ("linksize", options.link_size.name().to_owned()),
            ("linkcolor", options.link_color.name().to_owned()),
            ("nodelabels", encode_labels(&options.node_labels)),
            ("linklabels", encode_labels(&options.link_labels)),
            ("background", options.background.name().to_owned()),
            (
                "colorby",
                options
                    .color_by
                    .as_deref()
                    .map(|field| urlencoding::encode(field).into_owned())
                    .unwrap_or_default(),
            ),
            ("curves", flag(options.curves).to_owned()),
            ("transparency", flag(options.transparency).to_owned()),
            ("arrows", flag(options.arrows).to_owned()),
            ("timing", flag(options.timing_marks).to_owned()),
            ("strict", flag(options.strict_matches).to_owned()),
            ("dynamiclabels", flag(options.dynamic_labels).to_owned()),
            ("drawnodelabels", flag(options.draw_node_labels).to_owned()),
            ("drawlinklabels", flag(options.draw_link_labels).to_owned()),
            (
                "rels",
                self.relationships
                    .iter()
                    .map(|spec| urlencoding::encode(&spec.encode()).into_owned())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        ];

        tokens
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let tokens = raw.split('|').collect::<Vec<_>>();
        if tokens.len() != KEYS.len() {
            return Err(ConfigError::TokenCount {
                expected: KEYS.len(),
                found: tokens.len(),
            });
        }

        let mut config = Self::default();
        let mut seen = BTreeSet::new();
        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                return Err(ConfigError::MalformedToken(token.to_owned()));
            };
            if !KEYS.contains(&key) {
                return Err(ConfigError::UnexpectedKey(key.to_owned()));
            }
            if !seen.insert(key) {
                return Err(ConfigError::MalformedToken(token.to_owned()));
            }
            config.apply(key, value)?;
        }

        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let options = &mut self.options;
        match key {
            "nodesize" => options.node_size = named(key, value, NodeSizeMode::from_name)?,
            "nodecolor" => options.node_color = named(key, value, NodeColorMode::from_name)?,
            "linksize" => options.link_size = named(key, value, LinkSizeMode::from_name)?,
            "linkcolor" => options.link_color = named(key, value, LinkColorMode::from_name)?,
            "nodelabels" => options.node_labels = decode_labels(key, value)?,
            "linklabels" => options.link_labels = decode_labels(key, value)?,
            "background" => options.background = named(key, value, BackgroundMode::from_name)?,
            "colorby" => {
                let field = decode_token(value)?;
                options.color_by = (!field.is_empty()).then_some(field);
            }
            "curves" => options.curves = parse_flag(key, value)?,
            "transparency" => options.transparency = parse_flag(key, value)?,
            "arrows" => options.arrows = parse_flag(key, value)?,
            "timing" => options.timing_marks = parse_flag(key, value)?,
            "strict" => options.strict_matches = parse_flag(key, value)?,
            "dynamiclabels" => options.dynamic_labels = parse_flag(key, value)?,
            "drawnodelabels" => options.draw_node_labels = parse_flag(key, value)?,
            "drawlinklabels" => options.draw_link_labels = parse_flag(key, value)?,
            "rels" => {
                self.relationships = list_items(value)
                    .map(|item| decode_token(item).and_then(|encoded| RelationshipSpec::decode(&encoded)))
                    .collect::<Result<_, _>>()?;
            }
            _ => return Err(ConfigError::UnexpectedKey(key.to_owned())),
        }
        Ok(())
    }
}

fn named<T>(key: &str, value: &str, from_name: impl Fn(&str) -> Option<T>) -> Result<T, ConfigError> {
    from_name(value).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn list_items(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').filter(|item| !item.is_empty())
}

fn encode_labels(labels: &[LabelKind]) -> String {
    labels
        .iter()
        .map(|label| urlencoding::encode(&label.name()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_labels(key: &str, value: &str) -> Result<Vec<LabelKind>, ConfigError> {
    list_items(value)
        .map(|item| {
            let name = decode_token(item)?;
            LabelKind::from_name(&name).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_owned(),
                value: name,
            })
        })
        .collect()
}
