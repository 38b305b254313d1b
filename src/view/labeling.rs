use std::collections::BTreeSet;

use eframe::egui::Color32;

use crate::records::RecordSet;
use crate::util::short_name;

use super::counting::CountBin;
use super::options::LabelKind;

const MAX_LABEL_CHARS: usize = 28;
const MAX_FIELD_VALUES: usize = 3;

/// What a label is computed for: a rendered node, or a rendered link with the
/// entities at both ends.
#[derive(Clone, Copy, Debug)]
pub enum LabelTarget<'a> {
    Node(&'a BTreeSet<String>),
    Link(&'a BTreeSet<String>, &'a BTreeSet<String>),
}

pub struct LabelInput<'a> {
    pub target: LabelTarget<'a>,
    pub bin: &'a CountBin,
    pub records: &'a RecordSet,
}

pub trait LabelCalculator {
    fn label_text(&self, input: &LabelInput<'_>) -> String;

    fn label_color(&self, input: &LabelInput<'_>) -> Color32 {
        input.bin.dominant
    }
}

impl LabelCalculator for LabelKind {
    fn label_text(&self, input: &LabelInput<'_>) -> String {
        match self {
            Self::Entity => match input.target {
                LabelTarget::Node(entities) => summarize(entities),
                LabelTarget::Link(from, to) => format!("{} - {}", summarize(from), summarize(to)),
            },
            Self::RecordCount => input.bin.total.to_string(),
            Self::Field(field) => field_values(field, input),
        }
    }
}

/// Texts of every selected kind joined by `" | "`, skipping empty ones.
pub fn compose_label(kinds: &[LabelKind], input: &LabelInput<'_>) -> String {
    kinds
        .iter()
        .map(|kind| kind.label_text(input))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn summarize(entities: &BTreeSet<String>) -> String {
    let mut iter = entities.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let first = short_name(first, MAX_LABEL_CHARS);
    match iter.count() {
        0 => first,
        rest => format!("{first} (+{rest})"),
    }
}

fn field_values(field: &str, input: &LabelInput<'_>) -> String {
    let mut values = BTreeSet::new();
    for &bundle in &input.bin.bundles {
        let (Some(tablet), Some(record)) = (input.records.tablet_of(bundle), input.records.record(bundle))
        else {
            continue;
        };
        if !tablet.can_resolve(field) {
            continue;
        }
        values.extend(tablet.resolve(field, record));
    }

    let shown = values
        .iter()
        .take(MAX_FIELD_VALUES)
        .map(|value| short_name(value, MAX_LABEL_CHARS))
        .collect::<Vec<_>>();
    let hidden = values.len().saturating_sub(MAX_FIELD_VALUES);
    if hidden == 0 {
        shown.join(", ")
    } else {
        format!("{} +{hidden}", shown.join(", "))
    }
}
