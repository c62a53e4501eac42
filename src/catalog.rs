//! Built-in content: the theme list, bundled meditation music, the tasks a
//! fresh install starts with and the quick-add templates.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{MusicRef, Task, TaskTemplate};

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: &'static str,
    pub class_name: &'static str,
}

pub const THEMES: &[Theme] = &[
    Theme { name: "Default", class_name: "theme-default" },
    Theme { name: "Pastel Dream", class_name: "theme-pastel-dream" },
    Theme { name: "Night Sakura", class_name: "theme-night-sakura" },
    Theme { name: "Aqua Breeze", class_name: "theme-aqua-breeze" },
    Theme { name: "Ghibli Forest", class_name: "theme-ghibli-forest" },
    Theme { name: "Cyber Neon Tokyo", class_name: "theme-cyber-neon-tokyo" },
    Theme { name: "Chibi Cloudscape", class_name: "theme-chibi-cloudscape" },
    Theme { name: "Moonlit Shrine", class_name: "theme-moonlit-shrine" },
    Theme { name: "Pixel Vaporwave", class_name: "theme-pixel-vaporwave" },
    Theme { name: "Cherry Blossom Rain", class_name: "theme-cherry-blossom-rain" },
    Theme { name: "Crystal Snowfall", class_name: "theme-crystal-snowfall" },
    Theme { name: "Midnight Neko", class_name: "theme-midnight-neko" },
    Theme { name: "Shoujo Heartbeat", class_name: "theme-shoujo-heartbeat" },
    Theme { name: "Yandere Glow", class_name: "theme-yandere-glow" },
    Theme { name: "Otaku Sunset", class_name: "theme-otaku-sunset" },
    Theme { name: "Kawaii Candy Pop", class_name: "theme-kawaii-candy-pop" },
    Theme { name: "Mystic Shrine Maiden", class_name: "theme-mystic-shrine-maiden" },
    Theme { name: "Cozy Kotatsu Winter", class_name: "theme-cozy-kotatsu-winter" },
    Theme { name: "Silent Hilltop School", class_name: "theme-silent-hilltop-school" },
    Theme { name: "Floating Spirit World", class_name: "theme-floating-spirit-world" },
    Theme { name: "Maid Café Minimal", class_name: "theme-maid-cafe-minimal" },
];

/// Case-insensitive theme lookup.
pub fn find_theme(name: &str) -> Option<&'static Theme> {
    THEMES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct BundledTrack {
    pub id: &'static str,
    pub title: &'static str,
    pub duration: &'static str,
}

impl BundledTrack {
    pub fn to_ref(self) -> MusicRef {
        MusicRef {
            id: self.id.to_string(),
            title: self.title.to_string(),
            duration: self.duration.to_string(),
        }
    }
}

pub const MEDITATION_MUSIC: &[BundledTrack] = &[
    BundledTrack { id: "1", title: "Quiet Forest", duration: "10:00" },
    BundledTrack { id: "2", title: "Gentle Stream", duration: "15:00" },
    BundledTrack { id: "3", title: "Morning Birds", duration: "5:00" },
    BundledTrack { id: "4", title: "Rainfall", duration: "20:00" },
    BundledTrack { id: "5", title: "Ocean Waves", duration: "30:00" },
];

pub fn find_bundled_track(id: &str) -> Option<BundledTrack> {
    MEDITATION_MUSIC.iter().copied().find(|t| t.id == id)
}

const HEALTH_TEMPLATES: &[(&str, &str)] = &[
    ("Walk or Run", "Footprints"),
    ("Stand Minutes", "Clock"),
    ("Cycle", "Bike"),
    ("Swim", "Waves"),
    ("Mindful Minutes", "Heart"),
    ("Study", "BookOpen"),
    ("Climb Flights", "TrendingUp"),
    ("Pomodoro", "Timer"),
    ("Activity Rings", "Star"),
    ("Stand Hours", "Clock"),
    ("Exercise Minutes", "Dumbbell"),
];

pub fn default_templates() -> Vec<TaskTemplate> {
    HEALTH_TEMPLATES
        .iter()
        .map(|(name, icon)| TaskTemplate {
            name: (*name).to_string(),
            icon: (*icon).to_string(),
        })
        .collect()
}

/// The six tasks a fresh store is seeded with, dated `today`.
pub fn default_tasks(today: NaiveDate) -> Vec<Task> {
    let base = |id: &str, icon: &str, title: &str, subtitle: &str, streak: u32, duration: u32| Task {
        id: id.to_string(),
        title: title.to_string(),
        subtitle: subtitle.to_string(),
        icon: icon.to_string(),
        streak,
        completed: false,
        show_play: false,
        time: None,
        duration: Some(duration),
        music: None,
        date: today,
        completed_on: None,
    };

    let mut mobilise = base("2", "Dumbbell", "MOBILISE", "10 min", 4, 10);
    mobilise.time = Some("10:00".to_string());

    let mut meditate = base("3", "Heart", "MEDITATE", "15 min", 0, 15);
    meditate.time = Some("09:00".to_string());
    meditate.show_play = true;
    meditate.music = find_bundled_track("2").map(BundledTrack::to_ref);

    vec![
        base("1", "Pencil", "WRITE JOURNAL", "Daily", 2, 5),
        mobilise,
        meditate,
        base("4", "BookOpen", "WRITE NOVEL", "Daily*", 3, 25),
        base("5", "RunIcon", "RUN 10 MILES", "Weekly*", 6, 60),
        base("6", "Pill", "TAKE VITAMINS", "Daily*", 4, 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_lookup_ignores_case() {
        assert_eq!(find_theme("night sakura").unwrap().class_name, "theme-night-sakura");
        assert!(find_theme("Solarized").is_none());
        assert_eq!(THEMES.len(), 21);
    }

    #[test]
    fn meditate_default_carries_gentle_stream() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let tasks = default_tasks(today);
        assert_eq!(tasks.len(), 6);
        let meditate = tasks.iter().find(|t| t.title == "MEDITATE").unwrap();
        assert_eq!(meditate.music.as_ref().unwrap().title, "Gentle Stream");
        assert!(tasks.iter().all(|t| t.date == today && !t.completed));
    }
}
