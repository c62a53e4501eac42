//! The forest: a deterministic scatter of trees, one per completed task.

use serde::Serialize;

use crate::types::Task;

pub const GRID_SIZE: usize = 100;
pub const DEFAULT_SEED: u32 = 1;

/// Linear congruential generator, modulus 2^32.
#[derive(Clone, Debug)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    const MULTIPLIER: u32 = 1_664_525;
    const INCREMENT: u32 = 1_013_904_223;
    const MODULUS: f64 = 4_294_967_296.0;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }

    /// Uniform in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / Self::MODULUS
    }
}

/// Position and animation for one grid slot. `top`/`left` are percentages.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub top: u32,
    pub left: u32,
    pub size: u32,
    pub delay_secs: f64,
    pub z_index: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForestLayout {
    seed: u32,
    slots: Vec<Slot>,
}

impl ForestLayout {
    pub fn generate(seed: u32) -> Self {
        let mut rng = Lcg::new(seed);
        let slots = (0..GRID_SIZE)
            .map(|_| {
                // Draw order matters: top, left, size, delay.
                let top = (rng.next_unit() * 90.0).floor() as u32 + 5;
                let left = (rng.next_unit() * 90.0).floor() as u32 + 5;
                let size = (rng.next_unit() * 24.0).floor() as u32 + 24;
                let delay_secs = rng.next_unit() * 1.5;
                Slot {
                    top,
                    left,
                    size,
                    delay_secs,
                    z_index: top,
                }
            })
            .collect();
        Self { seed, slots }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Plant one element per completed task, in the order given. Tasks past
    /// `GRID_SIZE` are not drawn.
    pub fn plant(&self, completed: &[&Task]) -> Vec<PlantedElement> {
        self.slots
            .iter()
            .zip(completed)
            .enumerate()
            .map(|(index, (slot, task))| PlantedElement {
                index,
                slot: *slot,
                element: ForestElement::for_slot(index, task.streak),
                task_id: task.id.clone(),
            })
            .collect()
    }
}

impl Default for ForestLayout {
    fn default() -> Self {
        Self::generate(DEFAULT_SEED)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Milestone {
    Week,
    Fortnight,
    Month,
    Quarter,
    FourMonths,
    EightMonths,
    Year,
}

impl Milestone {
    pub const ALL: [Milestone; 7] = [
        Milestone::Week,
        Milestone::Fortnight,
        Milestone::Month,
        Milestone::Quarter,
        Milestone::FourMonths,
        Milestone::EightMonths,
        Milestone::Year,
    ];

    pub fn days(&self) -> u32 {
        match self {
            Milestone::Week => 7,
            Milestone::Fortnight => 15,
            Milestone::Month => 30,
            Milestone::Quarter => 90,
            Milestone::FourMonths => 120,
            Milestone::EightMonths => 240,
            Milestone::Year => 365,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Milestone::Week => "7-day streak",
            Milestone::Fortnight => "15-day streak",
            Milestone::Month => "30-day streak",
            Milestone::Quarter => "90-day streak",
            Milestone::FourMonths => "120-day streak",
            Milestone::EightMonths => "240-day streak",
            Milestone::Year => "365-day streak",
        }
    }

    /// Highest milestone whose threshold is `<= streak`.
    pub fn for_streak(streak: u32) -> Option<Milestone> {
        Self::ALL
            .iter()
            .rev()
            .find(|m| streak >= m.days())
            .copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "variant")]
pub enum ForestElement {
    Tree(TreeVariant),
    Home,
    Bird,
    Award,
    Milestone(Milestone),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeVariant {
    Trees,
    Pine,
    Grove,
    Fir,
}

impl ForestElement {
    const TREES: [TreeVariant; 4] = [
        TreeVariant::Trees,
        TreeVariant::Pine,
        TreeVariant::Grove,
        TreeVariant::Fir,
    ];

    /// Every 5th slot is special (every 15th an award). At a special slot a
    /// task that reached a streak milestone shows the milestone instead.
    pub fn for_slot(index: usize, streak: u32) -> Self {
        let n = index + 1;
        if n % 5 != 0 {
            return ForestElement::Tree(Self::TREES[index % Self::TREES.len()]);
        }
        if let Some(milestone) = Milestone::for_streak(streak) {
            return ForestElement::Milestone(milestone);
        }
        if n % 15 == 0 {
            ForestElement::Award
        } else if (n / 5) % 2 == 1 {
            ForestElement::Home
        } else {
            ForestElement::Bird
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            ForestElement::Tree(TreeVariant::Trees | TreeVariant::Grove) => 'T',
            ForestElement::Tree(TreeVariant::Pine | TreeVariant::Fir) => 'A',
            ForestElement::Home => 'H',
            ForestElement::Bird => 'v',
            ForestElement::Award => '*',
            ForestElement::Milestone(_) => '#',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantedElement {
    pub index: usize,
    pub slot: Slot,
    pub element: ForestElement,
    pub task_id: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestStats {
    pub total_trees: usize,
    pub longest_streak: u32,
    pub tasks_left: usize,
}

impl ForestStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            total_trees: tasks.iter().filter(|t| t.completed).count(),
            longest_streak: tasks.iter().map(|t| t.streak).max().unwrap_or(0),
            tasks_left: tasks.iter().filter(|t| !t.completed).count(),
        }
    }
}

/// Distinct milestones shown in a planted forest, lowest first.
pub fn milestones_reached(planted: &[PlantedElement]) -> Vec<Milestone> {
    let mut reached: Vec<Milestone> = planted
        .iter()
        .filter_map(|p| match p.element {
            ForestElement::Milestone(m) => Some(m),
            _ => None,
        })
        .collect();
    reached.sort();
    reached.dedup();
    reached
}

pub fn completed_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.completed).collect()
}

/// Plain-text picture of the forest, `width` x `height` characters.
pub fn render_ascii(planted: &[PlantedElement], width: usize, height: usize) -> Vec<String> {
    let mut grid = vec![vec!['.'; width]; height];
    // Lower z-index first so nearer elements overwrite farther ones.
    let mut ordered: Vec<&PlantedElement> = planted.iter().collect();
    ordered.sort_by_key(|p| p.slot.z_index);
    for p in ordered {
        let row = (p.slot.top as usize * height / 100).min(height.saturating_sub(1));
        let col = (p.slot.left as usize * width / 100).min(width.saturating_sub(1));
        if let Some(cell) = grid.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = p.element.glyph();
        }
    }
    grid.into_iter().map(|r| r.into_iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn done(id: usize, streak: u32) -> Task {
        Task {
            id: id.to_string(),
            title: format!("T{id}"),
            subtitle: String::new(),
            icon: "Pencil".into(),
            streak,
            completed: true,
            show_play: false,
            time: None,
            duration: None,
            music: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            completed_on: None,
        }
    }

    #[test]
    fn lcg_matches_reference_sequence() {
        let mut rng = Lcg::new(1);
        // 1664525 * 1 + 1013904223
        assert_eq!(rng.next_u32(), 1_015_568_748);
        assert_eq!(rng.next_u32(), 1_586_005_467);
        let mut again = Lcg::new(1);
        again.next_u32();
        assert!((again.next_unit() - 1_586_005_467.0 / 4_294_967_296.0).abs() < f64::EPSILON);
    }

    #[test]
    fn layout_is_deterministic_per_seed() {
        let a = ForestLayout::generate(DEFAULT_SEED);
        let b = ForestLayout::generate(DEFAULT_SEED);
        assert_eq!(a, b);
        assert_ne!(a.slots(), ForestLayout::generate(42).slots());
    }

    #[test]
    fn slots_stay_in_bounds() {
        let layout = ForestLayout::default();
        assert_eq!(layout.slots().len(), GRID_SIZE);
        for s in layout.slots() {
            assert!((5..95).contains(&s.top));
            assert!((5..95).contains(&s.left));
            assert!((24..48).contains(&s.size));
            assert!((0.0..1.5).contains(&s.delay_secs));
            assert_eq!(s.z_index, s.top);
        }
    }

    #[test]
    fn milestone_picks_highest_threshold_reached() {
        assert_eq!(Milestone::for_streak(0), None);
        assert_eq!(Milestone::for_streak(6), None);
        assert_eq!(Milestone::for_streak(7), Some(Milestone::Week));
        assert_eq!(Milestone::for_streak(29), Some(Milestone::Fortnight));
        assert_eq!(Milestone::for_streak(30), Some(Milestone::Month));
        assert_eq!(Milestone::for_streak(364), Some(Milestone::EightMonths));
        assert_eq!(Milestone::for_streak(1000), Some(Milestone::Year));
        assert_eq!(Milestone::Fortnight.label(), "15-day streak");
    }

    #[test]
    fn legend_lists_each_milestone_once() {
        let tasks: Vec<Task> = (0..10)
            .map(|i| done(i, if i == 4 || i == 9 { 30 } else { 8 }))
            .collect();
        let layout = ForestLayout::generate(7);
        assert_eq!(layout.seed(), 7);
        let planted = layout.plant(&tasks.iter().collect::<Vec<_>>());
        assert_eq!(milestones_reached(&planted), vec![Milestone::Month]);
        assert!(milestones_reached(&layout.plant(&[])).is_empty());
    }

    #[test]
    fn special_slots_follow_modulo_rules() {
        assert_eq!(ForestElement::for_slot(0, 0), ForestElement::Tree(TreeVariant::Trees));
        assert_eq!(ForestElement::for_slot(3, 0), ForestElement::Tree(TreeVariant::Fir));
        assert_eq!(ForestElement::for_slot(4, 0), ForestElement::Home);
        assert_eq!(ForestElement::for_slot(9, 0), ForestElement::Bird);
        assert_eq!(ForestElement::for_slot(14, 0), ForestElement::Award);
        assert_eq!(ForestElement::for_slot(19, 0), ForestElement::Bird);
        // a long streak on an ordinary slot is still just a tree
        assert_eq!(ForestElement::for_slot(1, 400), ForestElement::Tree(TreeVariant::Pine));
        assert_eq!(
            ForestElement::for_slot(4, 30),
            ForestElement::Milestone(Milestone::Month)
        );
    }

    #[test]
    fn planting_takes_a_prefix_capped_at_grid_size() {
        let layout = ForestLayout::default();
        let tasks: Vec<Task> = (0..120).map(|i| done(i, 1)).collect();
        let refs: Vec<&Task> = tasks.iter().collect();
        assert_eq!(layout.plant(&refs[..3]).len(), 3);
        let all = layout.plant(&refs);
        assert_eq!(all.len(), GRID_SIZE);
        assert_eq!(all[7].slot, layout.slots()[7]);
        assert!(layout.plant(&[]).is_empty());
    }

    #[test]
    fn stats_count_trees_streaks_and_leftovers() {
        let mut tasks = vec![done(1, 3), done(2, 9)];
        let mut open = done(3, 12);
        open.completed = false;
        tasks.push(open);
        let stats = ForestStats::from_tasks(&tasks);
        assert_eq!(
            stats,
            ForestStats { total_trees: 2, longest_streak: 12, tasks_left: 1 }
        );
        assert_eq!(ForestStats::from_tasks(&[]).longest_streak, 0);
    }

    #[test]
    fn ascii_render_has_requested_shape() {
        let layout = ForestLayout::default();
        let tasks = [done(1, 0)];
        let refs: Vec<&Task> = tasks.iter().collect();
        let rows = render_ascii(&layout.plant(&refs), 40, 10);
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.chars().count() == 40));
        assert_eq!(rows.iter().flat_map(|r| r.chars()).filter(|c| *c == 'T').count(), 1);
    }
}
