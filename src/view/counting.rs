use std::collections::{BTreeMap, BTreeSet, HashMap};

use eframe::egui::Color32;

use crate::records::{BundleId, RecordSet};
use crate::util::hash_color;

/// Records aggregated under one bin plus the values derived from them.
#[derive(Clone, Debug, PartialEq)]
pub struct CountBin {
    pub bundles: BTreeSet<BundleId>,
    pub total: usize,
    pub normalized: f32,
    pub dominant: Color32,
}

impl Default for CountBin {
    fn default() -> Self {
        Self {
            bundles: BTreeSet::new(),
            total: 0,
            normalized: 0.0,
            dominant: Color32::GRAY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CountContext<K> {
    bins: BTreeMap<K, CountBin>,
    max_total: usize,
}

impl<K> Default for CountContext<K> {
    fn default() -> Self {
        Self {
            bins: BTreeMap::new(),
            max_total: 0,
        }
    }
}

impl<K: Ord> CountContext<K> {
    pub fn add(&mut self, key: K, bundle: BundleId) {
        self.bins.entry(key).or_default().bundles.insert(bundle);
    }

    /// Fills in totals, normalized totals and dominant colors once every
    /// bundle has been added.
    pub fn finish(&mut self, colors: &RecordColors<'_>) {
        self.max_total = self
            .bins
            .values()
            .map(|bin| bin.bundles.len())
            .max()
            .unwrap_or(0);

        for bin in self.bins.values_mut() {
            bin.total = bin.bundles.len();
            bin.normalized = if self.max_total == 0 {
                0.0
            } else {
                bin.total as f32 / self.max_total as f32
            };
            bin.dominant = colors.dominant(&bin.bundles);
        }
    }

    pub fn get(&self, key: &K) -> Option<&CountBin> {
        self.bins.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &CountBin)> {
        self.bins.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.bins.keys()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    #[cfg(test)]
    pub fn max_total(&self) -> usize {
        self.max_total
    }

    #[cfg(test)]
    pub fn contains_bundle(&self, bundle: BundleId) -> bool {
        self.bins.values().any(|bin| bin.bundles.contains(&bundle))
    }
}

/// Per-record colors derived from an optional color-by field.
pub struct RecordColors<'a> {
    records: &'a RecordSet,
    field: Option<&'a str>,
    fallback: Color32,
}

impl<'a> RecordColors<'a> {
    pub fn new(records: &'a RecordSet, field: Option<&'a str>, fallback: Color32) -> Self {
        Self {
            records,
            field,
            fallback,
        }
    }

    pub fn color(&self, bundle: BundleId) -> Color32 {
        let Some(field) = self.field else {
            return self.fallback;
        };
        self.records
            .record(bundle)
            .and_then(|record| record.first_value(field))
            .filter(|value| !value.is_empty())
            .map_or(self.fallback, hash_color)
    }

    /// Most frequent record color; ties go to the smallest RGB value.
    pub fn dominant(&self, bundles: &BTreeSet<BundleId>) -> Color32 {
        let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
        for &bundle in bundles {
            let color = self.color(bundle);
            *counts.entry([color.r(), color.g(), color.b()]).or_default() += 1;
        }

        counts
            .into_iter()
            .max_by(|(a_rgb, a_count), (b_rgb, b_count)| {
                a_count.cmp(b_count).then_with(|| b_rgb.cmp(a_rgb))
            })
            .map_or(self.fallback, |([r, g, b], _)| Color32::from_rgb(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::record_set_from_rows;
    use pretty_assertions::assert_eq;

    #[test]
    fn totals_are_normalized_against_the_largest_bin() {
        let records = record_set_from_rows(&[&[("a", "1")], &[("a", "1")], &[("a", "2")]]);
        let colors = RecordColors::new(&records, None, Color32::WHITE);
        let mut context = CountContext::default();
        context.add("x", BundleId(0));
        context.add("x", BundleId(1));
        context.add("x", BundleId(1));
        context.add("y", BundleId(2));
        context.finish(&colors);

        assert_eq!(context.max_total(), 2);
        assert_eq!(context.get(&"x").map(|bin| bin.total), Some(2));
        assert_eq!(context.get(&"y").map(|bin| bin.normalized), Some(0.5));
        assert!(context.contains_bundle(BundleId(2)));
        assert!(!context.contains_bundle(BundleId(7)));
    }

    #[test]
    fn dominant_color_follows_the_majority() {
        let records = record_set_from_rows(&[
            &[("proto", "tcp")],
            &[("proto", "tcp")],
            &[("proto", "udp")],
        ]);
        let colors = RecordColors::new(&records, Some("proto"), Color32::WHITE);
        let bundles = records.bundles().collect::<BTreeSet<_>>();

        assert_eq!(colors.dominant(&bundles), hash_color("tcp"));
    }

    #[test]
    fn dominant_ties_pick_the_smallest_rgb() {
        let records = record_set_from_rows(&[&[("proto", "tcp")], &[("proto", "udp")]]);
        let colors = RecordColors::new(&records, Some("proto"), Color32::WHITE);
        let bundles = records.bundles().collect::<BTreeSet<_>>();

        let tcp = hash_color("tcp");
        let udp = hash_color("udp");
        let expected = if [tcp.r(), tcp.g(), tcp.b()] <= [udp.r(), udp.g(), udp.b()] {
            tcp
        } else {
            udp
        };
        assert_eq!(colors.dominant(&bundles), expected);
    }

    #[test]
    fn missing_color_field_uses_fallback() {
        let records = record_set_from_rows(&[&[("proto", "tcp")]]);
        let colors = RecordColors::new(&records, Some("missing"), Color32::WHITE);
        assert_eq!(colors.color(BundleId(0)), Color32::WHITE);
        assert_eq!(
            RecordColors::new(&records, None, Color32::RED).color(BundleId(0)),
            Color32::RED
        );
    }
}
