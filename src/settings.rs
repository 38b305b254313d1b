use eframe::egui::Color32;

#[derive(Clone, Debug)]
pub struct Theme {
    pub background: Color32,
    pub grid: Color32,
    pub node: Color32,
    pub link: Color32,
    pub selection: Color32,
    pub search_match: Color32,
    pub label: Color32,
    pub rubber_band: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(19, 23, 29),
            grid: Color32::from_rgba_unmultiplied(60, 70, 80, 70),
            node: Color32::from_rgb(88, 150, 215),
            link: Color32::from_rgb(96, 104, 116),
            selection: Color32::from_rgb(245, 206, 93),
            search_match: Color32::from_rgb(103, 196, 255),
            label: Color32::from_gray(238),
            rubber_band: Color32::from_rgba_unmultiplied(106, 198, 255, 160),
        }
    }
}

/// Session-wide settings, created once in `main` and handed to every
/// component that needs them.
#[derive(Clone, Debug)]
pub struct Settings {
    pub theme: Theme,
    pub world_seed: u64,
    pub recent_capacity: usize,
    pub preview_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            world_seed: 0x5eed,
            recent_capacity: 12,
            preview_workers: 4,
        }
    }
}
