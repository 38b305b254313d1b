use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

pub const NOT_SET: &str = "notset";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BundleId(pub u32);

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Record {
    pub bundle: BundleId,
    pub values: BTreeMap<String, Vec<String>>,
}

impl Record {
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[derive(Clone, Debug)]
pub struct Tablet {
    pub name: String,
    fields: Vec<String>,
    records: Vec<Record>,
}

impl Tablet {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn can_resolve(&self, field: &str) -> bool {
        self.fields.iter().any(|known| known == field)
    }

    /// Values of `field` for `record`; empty or absent values resolve to the
    /// not-set sentinel so every resolvable field yields at least one key.
    pub fn resolve(&self, field: &str, record: &Record) -> Vec<String> {
        let values = record
            .values
            .get(field)
            .map(|values| {
                values
                    .iter()
                    .filter(|value| !value.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if values.is_empty() {
            vec![NOT_SET.to_owned()]
        } else {
            values
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordSet {
    tablets: Vec<Tablet>,
    location: HashMap<BundleId, (usize, usize)>,
    next_bundle: u32,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tablet(&mut self, name: impl Into<String>, fields: Vec<String>) -> usize {
        self.tablets.push(Tablet::new(name, fields));
        self.tablets.len() - 1
    }

    pub fn push_record(
        &mut self,
        tablet_index: usize,
        values: BTreeMap<String, Vec<String>>,
    ) -> Option<BundleId> {
        let tablet = self.tablets.get_mut(tablet_index)?;
        for field in values.keys() {
            if !tablet.fields.iter().any(|known| known == field) {
                tablet.fields.push(field.clone());
            }
        }

        let bundle = BundleId(self.next_bundle);
        self.next_bundle += 1;
        self.location
            .insert(bundle, (tablet_index, tablet.records.len()));
        tablet.records.push(Record { bundle, values });
        Some(bundle)
    }

    pub fn tablets(&self) -> &[Tablet] {
        &self.tablets
    }

    pub fn len(&self) -> usize {
        self.location.len()
    }

    pub fn bundles(&self) -> impl Iterator<Item = BundleId> + '_ {
        self.tablets
            .iter()
            .flat_map(|tablet| tablet.records.iter().map(|record| record.bundle))
    }

    pub fn record(&self, bundle: BundleId) -> Option<&Record> {
        let &(tablet, row) = self.location.get(&bundle)?;
        self.tablets.get(tablet)?.records.get(row)
    }

    pub fn tablet_of(&self, bundle: BundleId) -> Option<&Tablet> {
        let &(tablet, _row) = self.location.get(&bundle)?;
        self.tablets.get(tablet)
    }

    pub fn fields(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut fields = Vec::new();
        for tablet in &self.tablets {
            for field in &tablet.fields {
                if seen.insert(field.as_str()) {
                    fields.push(field.clone());
                }
            }
        }
        fields
    }
}

#[cfg(test)]
pub(crate) fn record_set_from_rows(rows: &[&[(&str, &str)]]) -> RecordSet {
    let mut fields = Vec::new();
    for row in rows {
        for (field, _value) in row.iter() {
            if !fields.iter().any(|known: &String| known == field) {
                fields.push((*field).to_owned());
            }
        }
    }

    let mut records = RecordSet::new();
    let tablet = records.add_tablet("test", fields);
    for row in rows {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field, value) in row.iter() {
            values
                .entry((*field).to_owned())
                .or_default()
                .push((*value).to_owned());
        }
        records.push_record(tablet, values);
    }
    records
}
