use eframe::egui::Color32;

use crate::settings::Theme;
use crate::util::heat_color;

use super::counting::CountBin;

const TRANSPARENT_ALPHA: u8 = 150;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeSizeMode {
    #[default]
    Fixed,
    RecordCount,
    EntityCount,
}

impl NodeSizeMode {
    pub const ALL: [NodeSizeMode; 3] = [Self::Fixed, Self::RecordCount, Self::EntityCount];

    pub fn name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::RecordCount => "records",
            Self::EntityCount => "entities",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn radius(self, bin: &CountBin, entity_count: usize) -> f32 {
        match self {
            Self::Fixed => 5.0,
            Self::RecordCount => 4.0 + bin.normalized.sqrt() * 12.0,
            Self::EntityCount => (4.0 + (entity_count as f32).sqrt() * 2.5).min(20.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeColorMode {
    #[default]
    Theme,
    RecordCount,
    Dominant,
}

impl NodeColorMode {
    pub const ALL: [NodeColorMode; 3] = [Self::Theme, Self::RecordCount, Self::Dominant];

    pub fn name(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::RecordCount => "records",
            Self::Dominant => "dominant",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn color(self, bin: &CountBin, theme: &Theme) -> Color32 {
        match self {
            Self::Theme => theme.node,
            Self::RecordCount => heat_color(bin.normalized),
            Self::Dominant => bin.dominant,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkSizeMode {
    #[default]
    Fixed,
    RecordCount,
}

impl LinkSizeMode {
    pub const ALL: [LinkSizeMode; 2] = [Self::Fixed, Self::RecordCount];

    pub fn name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::RecordCount => "records",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn width(self, bin: &CountBin) -> f32 {
        match self {
            Self::Fixed => 1.5,
            Self::RecordCount => 1.0 + bin.normalized * 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkColorMode {
    #[default]
    Theme,
    RecordCount,
    Dominant,
}

impl LinkColorMode {
    pub const ALL: [LinkColorMode; 3] = [Self::Theme, Self::RecordCount, Self::Dominant];

    pub fn name(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::RecordCount => "records",
            Self::Dominant => "dominant",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn color(self, bin: &CountBin, theme: &Theme) -> Color32 {
        match self {
            Self::Theme => theme.link,
            Self::RecordCount => heat_color(bin.normalized),
            Self::Dominant => bin.dominant,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelKind {
    Entity,
    RecordCount,
    Field(String),
}

impl LabelKind {
    pub fn name(&self) -> String {
        match self {
            Self::Entity => "entity".to_owned(),
            Self::RecordCount => "count".to_owned(),
            Self::Field(field) => format!("field:{field}"),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "entity" => Some(Self::Entity),
            "count" => Some(Self::RecordCount),
            _ => name
                .strip_prefix("field:")
                .filter(|field| !field.is_empty())
                .map(|field| Self::Field(field.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackgroundMode {
    #[default]
    Plain,
    Geographic,
}

impl BackgroundMode {
    pub const ALL: [BackgroundMode; 2] = [Self::Plain, Self::Geographic];

    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Geographic => "geographic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub node_size: NodeSizeMode,
    pub node_color: NodeColorMode,
    pub link_size: LinkSizeMode,
    pub link_color: LinkColorMode,
    pub node_labels: Vec<LabelKind>,
    pub link_labels: Vec<LabelKind>,
    pub background: BackgroundMode,
    pub color_by: Option<String>,
    pub curves: bool,
    pub transparency: bool,
    pub arrows: bool,
    pub timing_marks: bool,
    pub strict_matches: bool,
    pub dynamic_labels: bool,
    pub draw_node_labels: bool,
    pub draw_link_labels: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            node_size: NodeSizeMode::default(),
            node_color: NodeColorMode::default(),
            link_size: LinkSizeMode::default(),
            link_color: LinkColorMode::default(),
            node_labels: vec![LabelKind::Entity],
            link_labels: vec![LabelKind::RecordCount],
            background: BackgroundMode::default(),
            color_by: None,
            curves: false,
            transparency: false,
            arrows: true,
            timing_marks: false,
            strict_matches: false,
            dynamic_labels: true,
            draw_node_labels: true,
            draw_link_labels: false,
        }
    }
}

impl RenderOptions {
    pub fn geographic(&self) -> bool {
        self.background == BackgroundMode::Geographic
    }

    pub fn apply_transparency(&self, color: Color32) -> Color32 {
        if self.transparency {
            Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), TRANSPARENT_ALPHA)
        } else {
            color
        }
    }
}
