use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::Color32;

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Color derived from a value's hash, bright enough to read on the dark
/// background.
pub fn hash_color(value: &str) -> Color32 {
    let hash = stable_hash(value);
    let channel = |shift: u32| 70 + ((hash >> shift) & 0xff) as u8 % 170;
    Color32::from_rgb(channel(0), channel(8), channel(16))
}

/// Cool to warm ramp for `t` in `0.0..=1.0`.
pub fn heat_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let r = (55.0 + (190.0 * t)) as u8;
    let g = (150.0 - (70.0 * t)) as u8;
    let b = (215.0 - (155.0 * t)) as u8;
    Color32::from_rgb(r, g, b)
}

pub fn short_name(entity: &str, max_chars: usize) -> String {
    if entity.chars().count() <= max_chars {
        return entity.to_owned();
    }
    let mut shortened = entity.chars().take(max_chars.saturating_sub(1)).collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_colors_are_stable() {
        assert_eq!(hash_color("tcp"), hash_color("tcp"));
        assert_eq!(hash_color("tcp").a(), 255);
    }

    #[test]
    fn heat_ramp_clamps() {
        assert_eq!(heat_color(-1.0), heat_color(0.0));
        assert_eq!(heat_color(2.0), Color32::from_rgb(245, 80, 60));
    }

    #[test]
    fn short_names_truncate_on_chars() {
        assert_eq!(short_name("10.0.0.1", 20), "10.0.0.1");
        assert_eq!(short_name("abcdef", 4), "abc…");
    }
}
