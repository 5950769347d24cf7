//! Course selection state machine
//!
//! The engine owns the selected set. Every mutation recomputes the available
//! and conflicting lists from the full catalog, persists the new state and
//! notifies observers before returning.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    CalendarExport, Catalog, Day, Error, FilterMode, IcsOptions, Offering, Result, SavedState,
    Theme,
    projector::Projector,
    store::{Persistence, ThemeSink},
};

type Observer = Box<dyn FnMut(&[Offering])>;

/// Result of a selection intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The cell was free
    Added,
    /// The cell was taken and nothing changed; holds the current occupants
    Occupied(Vec<Offering>),
    /// The cell was taken; the previous occupants were dropped
    Replaced(Vec<Offering>),
    /// The offering was already in the selection
    AlreadySelected,
}

/// A quick-search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Matching unselected offering
    pub offering: Offering,
    /// Selected course that picking this hit would replace
    pub replaces: Option<Offering>,
}

/// Owner of the selected set and the lists derived from it
///
/// Readers get [`Arc`] snapshots; the selection itself only changes through
/// the engine's own operations.
pub struct Engine {
    all_offerings: Arc<[Offering]>,
    selected: Vec<Offering>,
    available: Arc<[Offering]>,
    conflicting: Arc<[Offering]>,
    theme: Theme,
    persistence: Box<dyn Persistence>,
    theme_sink: Box<dyn ThemeSink>,
    observers: Vec<Observer>,
}

impl Engine {
    /// Build an engine over a catalog, restoring whatever the store holds
    pub fn new(
        catalog: &Catalog,
        persistence: Box<dyn Persistence>,
        theme_sink: Box<dyn ThemeSink>,
    ) -> Self {
        let all_offerings: Arc<[Offering]> = catalog.offerings().into();
        let saved = match persistence.load() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load saved selection, starting empty: {}", e);
                SavedState::default()
            }
        };

        let mut engine = Self {
            available: Arc::clone(&all_offerings),
            conflicting: Arc::from([]),
            all_offerings,
            selected: Vec::new(),
            theme: saved.theme,
            persistence,
            theme_sink,
            observers: Vec::new(),
        };
        engine.theme_sink.apply(engine.theme);
        engine.load_selection(saved.selected);
        engine.recompute();
        engine
    }

    /// Replace the selected set verbatim
    ///
    /// Restored state is trusted as-is: two offerings in one cell are kept
    /// and show up in [`Engine::selection_conflicts`].
    pub fn restore(&mut self, initial: Vec<Offering>) {
        self.load_selection(initial);
        self.commit();
    }

    fn load_selection(&mut self, initial: Vec<Offering>) {
        self.selected.clear();
        for offering in initial {
            if !self.selected.contains(&offering) {
                self.selected.push(offering);
            }
        }

        let clashes = self.selection_conflicts().len();
        if clashes > 0 {
            tracing::warn!("restored selection has {} clashing pairs", clashes);
        }
        tracing::debug!("restored {} selected offerings", self.selected.len());
    }

    /// Select an offering into a free cell
    ///
    /// An occupied cell is left untouched and its occupants are returned in
    /// [`SelectOutcome::Occupied`]; use [`Engine::replace`] to swap them out.
    pub fn select(&mut self, offering: &Offering) -> Result<SelectOutcome> {
        self.check_selectable(offering)?;
        if self.selected.contains(offering) {
            return Ok(SelectOutcome::AlreadySelected);
        }

        let occupants: Vec<Offering> = self
            .selected
            .iter()
            .filter(|s| s.same_cell(offering))
            .cloned()
            .collect();
        if !occupants.is_empty() {
            tracing::info!(
                "{} {} is taken, not selecting {}",
                offering.day,
                offering.slot,
                offering.name
            );
            return Ok(SelectOutcome::Occupied(occupants));
        }

        self.selected.push(offering.clone());
        tracing::info!("selected {}", offering);
        self.commit();
        Ok(SelectOutcome::Added)
    }

    /// Select an offering, evicting whatever occupies its cell
    pub fn replace(&mut self, offering: &Offering) -> Result<SelectOutcome> {
        self.check_selectable(offering)?;
        if self.selected.contains(offering) {
            return Ok(SelectOutcome::AlreadySelected);
        }

        let (replaced, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.selected)
            .into_iter()
            .partition(|s| s.same_cell(offering));
        self.selected = kept;
        self.selected.push(offering.clone());

        tracing::info!("selected {}", offering);
        for previous in &replaced {
            tracing::info!("replaced {}", previous);
        }

        self.commit();

        Ok(if replaced.is_empty() {
            SelectOutcome::Added
        } else {
            SelectOutcome::Replaced(replaced)
        })
    }

    fn check_selectable(&self, offering: &Offering) -> Result<()> {
        if self.all_offerings.contains(offering) {
            Ok(())
        } else {
            Err(Error::UnknownOffering(offering.to_string()))
        }
    }

    /// Remove an offering; returns whether it was selected
    pub fn remove(&mut self, offering: &Offering) -> bool {
        let before = self.selected.len();
        self.selected.retain(|s| s != offering);
        if self.selected.len() == before {
            return false;
        }

        tracing::info!("removed {}", offering);
        self.commit();
        true
    }

    /// Remove every selected offering
    pub fn clear(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        self.selected.clear();
        self.commit();
    }

    /// Selected offerings in selection order
    pub fn selected(&self) -> &[Offering] {
        &self.selected
    }

    /// Owned copy of the selection
    pub fn selected_snapshot(&self) -> Arc<[Offering]> {
        self.selected.as_slice().into()
    }

    /// Offerings whose cell is still free
    pub fn available_snapshot(&self) -> Arc<[Offering]> {
        Arc::clone(&self.available)
    }

    /// Offerings blocked by a different selected course in their cell
    pub fn conflicting_snapshot(&self) -> Arc<[Offering]> {
        Arc::clone(&self.conflicting)
    }

    /// The flattened catalog
    pub fn all_offerings(&self) -> &[Offering] {
        &self.all_offerings
    }

    /// Available offerings whose name contains `term`, ignoring case
    pub fn filter_available(&self, term: &str) -> Vec<Offering> {
        filter_by_name(&self.available, term)
    }

    /// Conflicting offerings whose name contains `term`, ignoring case
    pub fn filter_conflicting(&self, term: &str) -> Vec<Offering> {
        filter_by_name(&self.conflicting, term)
    }

    /// Unselected catalog offerings whose name matches `term`
    ///
    /// Each hit carries the selected course it would replace. An empty
    /// term yields nothing.
    pub fn search(&self, term: &str, limit: usize) -> Vec<SearchHit> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.all_offerings
            .iter()
            .filter(|o| o.name.to_lowercase().contains(&needle) && !self.selected.contains(o))
            .map(|o| SearchHit {
                offering: o.clone(),
                replaces: self.selected.iter().find(|s| s.same_cell(o)).cloned(),
            })
            .take(limit)
            .collect()
    }

    /// Unselected catalog offerings in a day, slot or cell
    pub fn browse(&self, filter: &FilterMode) -> Vec<Offering> {
        self.all_offerings
            .iter()
            .filter(|o| filter.matches(o) && !self.selected.contains(o))
            .cloned()
            .collect()
    }

    /// The selected offering shown in a grid cell
    pub fn find_selected(&self, day: Day, slot: &str) -> Option<&Offering> {
        self.selected
            .iter()
            .find(|s| s.day == day && s.slot == slot)
    }

    /// Every selected offering in a grid cell
    pub fn selected_at(&self, day: Day, slot: &str) -> Vec<&Offering> {
        self.selected
            .iter()
            .filter(|s| s.day == day && s.slot == slot)
            .collect()
    }

    /// Pairs of selected offerings sharing a cell
    pub fn selection_conflicts(&self) -> Vec<(Offering, Offering)> {
        let mut pairs = Vec::new();
        for (i, first) in self.selected.iter().enumerate() {
            for second in &self.selected[i + 1..] {
                if first.same_cell(second) {
                    pairs.push((first.clone(), second.clone()));
                }
            }
        }
        pairs
    }

    /// Register a callback run with the selected set after every mutation
    pub fn on_change(&mut self, observer: impl FnMut(&[Offering]) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Active theme
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch theme, applying and persisting it when it changes
    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme == theme {
            return;
        }
        self.theme = theme;
        self.theme_sink.apply(theme);
        self.persist();
    }

    /// Flip between light and dark; returns the new theme
    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    /// Project the selection through `projector` and render it
    pub fn export(
        &self,
        projector: &Projector,
        options: &IcsOptions,
        today: NaiveDate,
    ) -> Result<CalendarExport> {
        projector.export(&self.selected, options, today)
    }

    fn commit(&mut self) {
        self.recompute();
        self.persist();
        for observer in &mut self.observers {
            observer(&self.selected);
        }
    }

    fn recompute(&mut self) {
        let selected = &self.selected;

        self.available = self
            .all_offerings
            .iter()
            .filter(|o| !selected.iter().any(|s| s.same_cell(o)))
            .cloned()
            .collect();

        self.conflicting = self
            .all_offerings
            .iter()
            .filter(|o| {
                selected.iter().any(|s| s.same_cell(o))
                    && !selected.iter().any(|s| s.same_cell(o) && s.name == o.name)
            })
            .cloned()
            .collect();

        tracing::debug!(
            "recomputed: {} selected, {} available, {} conflicting",
            self.selected.len(),
            self.available.len(),
            self.conflicting.len()
        );
    }

    fn persist(&self) {
        let state = SavedState {
            selected: self.selected.clone(),
            theme: self.theme,
        };
        if let Err(e) = self.persistence.save(&state) {
            tracing::warn!("Failed to save selection: {}", e);
        }
    }
}

fn filter_by_name(offerings: &[Offering], term: &str) -> Vec<Offering> {
    let needle = term.trim().to_lowercase();
    offerings
        .iter()
        .filter(|o| o.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::store::{MemoryStore, NoPersistence, NoopThemeSink, RecordingThemeSink};

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "Monday": {
                    "T1": ["CS101", "MA101"],
                    "T2": ["Physics", "Chemistry (H1)"]
                },
                "Tuesday": { "T1": ["CS101", "Economics"] },
                "Wednesday": { "T3": ["Compilers"] }
            }"#,
        )
        .unwrap()
    }

    fn engine() -> Engine {
        Engine::new(&catalog(), Box::new(NoPersistence), Box::new(NoopThemeSink))
    }

    fn o(day: Day, slot: &str, name: &str) -> Offering {
        Offering::new(day, slot, name)
    }

    fn assert_invariants(engine: &Engine) {
        for a in engine.available_snapshot().iter() {
            assert!(!engine.selected().iter().any(|s| s.same_cell(a)));
        }
        for c in engine.conflicting_snapshot().iter() {
            assert!(
                engine
                    .selected()
                    .iter()
                    .any(|s| s.same_cell(c) && s.name != c.name)
            );
        }
    }

    #[test]
    fn test_select_derives_conflicts() {
        let catalog = Catalog::from_json(r#"{ "Monday": { "T1": ["CS101", "MA101"] } }"#).unwrap();
        let mut engine = Engine::new(&catalog, Box::new(NoPersistence), Box::new(NoopThemeSink));

        let outcome = engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();
        assert_eq!(outcome, SelectOutcome::Added);
        assert!(engine.available_snapshot().is_empty());
        assert_eq!(
            engine.conflicting_snapshot().to_vec(),
            vec![o(Day::Monday, "T1", "MA101")]
        );
        assert_invariants(&engine);
    }

    #[test]
    fn test_select_then_remove_round_trips() {
        let mut engine = engine();
        engine.select(&o(Day::Tuesday, "T1", "Economics")).unwrap();

        let available = engine.available_snapshot();
        let conflicting = engine.conflicting_snapshot();

        let picked = o(Day::Monday, "T2", "Physics");
        engine.select(&picked).unwrap();
        assert_ne!(engine.available_snapshot(), available);
        assert_invariants(&engine);

        assert!(engine.remove(&picked));
        assert_eq!(engine.available_snapshot(), available);
        assert_eq!(engine.conflicting_snapshot(), conflicting);
    }

    #[test]
    fn test_same_name_in_other_cell_is_not_conflicting() {
        let mut engine = engine();
        engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();

        let conflicting = engine.conflicting_snapshot();
        assert_eq!(conflicting.to_vec(), vec![o(Day::Monday, "T1", "MA101")]);
        // Tuesday's CS101 sits in a free cell
        assert!(
            engine
                .available_snapshot()
                .contains(&o(Day::Tuesday, "T1", "CS101"))
        );
    }

    #[test]
    fn test_select_into_occupied_cell_round_trips() {
        let mut engine = engine();
        let cs = o(Day::Monday, "T1", "CS101");
        let ma = o(Day::Monday, "T1", "MA101");
        engine.select(&cs).unwrap();

        let available = engine.available_snapshot();
        let conflicting = engine.conflicting_snapshot();

        assert_eq!(
            engine.select(&ma).unwrap(),
            SelectOutcome::Occupied(vec![cs.clone()])
        );
        assert_eq!(engine.selected(), &[cs]);
        assert!(!engine.remove(&ma));
        assert_eq!(engine.available_snapshot(), available);
        assert_eq!(engine.conflicting_snapshot(), conflicting);
        assert_eq!(conflicting.to_vec(), vec![ma]);
    }

    #[test]
    fn test_replace_swaps_cell_occupant() {
        let mut engine = engine();
        engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();

        let outcome = engine.replace(&o(Day::Monday, "T1", "MA101")).unwrap();
        assert_eq!(
            outcome,
            SelectOutcome::Replaced(vec![o(Day::Monday, "T1", "CS101")])
        );
        assert_eq!(engine.selected(), &[o(Day::Monday, "T1", "MA101")]);
        assert_eq!(
            engine.find_selected(Day::Monday, "T1"),
            Some(&o(Day::Monday, "T1", "MA101"))
        );
        assert_eq!(
            engine.conflicting_snapshot().to_vec(),
            vec![o(Day::Monday, "T1", "CS101")]
        );
        assert!(engine.selection_conflicts().is_empty());
        assert_invariants(&engine);

        // a free cell is simply added
        assert_eq!(
            engine.replace(&o(Day::Wednesday, "T3", "Compilers")).unwrap(),
            SelectOutcome::Added
        );
        assert!(matches!(
            engine.replace(&o(Day::Monday, "T1", "Alchemy")),
            Err(Error::UnknownOffering(_))
        ));
    }

    #[test]
    fn test_select_twice_and_unknown() {
        let mut engine = engine();
        let cs = o(Day::Monday, "T1", "CS101");
        engine.select(&cs).unwrap();
        assert_eq!(engine.select(&cs).unwrap(), SelectOutcome::AlreadySelected);
        assert_eq!(engine.selected().len(), 1);

        let ghost = o(Day::Monday, "T1", "Alchemy");
        assert!(matches!(engine.select(&ghost), Err(Error::UnknownOffering(_))));
        assert_eq!(engine.selected(), &[cs]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = MemoryStore::new();
        let mut engine = Engine::new(&catalog(), Box::new(store.clone()), Box::new(NoopThemeSink));
        let before = engine.available_snapshot();

        assert!(!engine.remove(&o(Day::Wednesday, "T3", "Compilers")));
        assert_eq!(engine.available_snapshot(), before);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_filters() {
        let mut engine = engine();
        assert_eq!(
            engine.filter_available("").as_slice(),
            &*engine.available_snapshot()
        );

        let hits = engine.filter_available("cs1");
        assert_eq!(
            hits,
            vec![o(Day::Monday, "T1", "CS101"), o(Day::Tuesday, "T1", "CS101")]
        );

        engine.select(&o(Day::Monday, "T2", "Physics")).unwrap();
        assert_eq!(
            engine.filter_conflicting("CHEM"),
            vec![o(Day::Monday, "T2", "Chemistry (H1)")]
        );
        assert!(engine.filter_conflicting("physics").is_empty());
        assert!(engine.filter_available("zzz").is_empty());

        // terms are trimmed the same way quick search trims them
        assert_eq!(engine.filter_available(" cs1 "), hits);
        assert_eq!(
            engine.filter_conflicting("  chem"),
            engine.filter_conflicting("chem")
        );
        let searched: Vec<_> = engine
            .search(" cs1", 10)
            .into_iter()
            .map(|h| h.offering)
            .collect();
        assert_eq!(searched, hits);
    }

    #[test]
    fn test_search_annotates_replacements() {
        let mut engine = engine();
        assert!(engine.search("  ", 10).is_empty());

        engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();
        let hits = engine.search("M", 10);
        let names: Vec<_> = hits.iter().map(|h| h.offering.name.as_str()).collect();
        assert_eq!(names, vec!["MA101", "Chemistry (H1)", "Economics", "Compilers"]);
        assert_eq!(hits[0].replaces, Some(o(Day::Monday, "T1", "CS101")));
        assert!(hits[1..].iter().all(|h| h.replaces.is_none()));

        // already selected offerings are not offered again
        let hits = engine.search("cs101", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offering.day, Day::Tuesday);

        assert_eq!(engine.search("c", 2).len(), 2);
    }

    #[test]
    fn test_browse() {
        let mut engine = engine();
        engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();

        let monday = engine.browse(&FilterMode::Day(Day::Monday));
        assert_eq!(monday.len(), 3);
        assert!(!monday.contains(&o(Day::Monday, "T1", "CS101")));

        let t1 = engine.browse(&FilterMode::Slot("T1".to_string()));
        assert_eq!(t1.len(), 3);

        let cell = engine.browse(&FilterMode::Intersection(Day::Wednesday, "T3".to_string()));
        assert_eq!(cell, vec![o(Day::Wednesday, "T3", "Compilers")]);
    }

    #[test]
    fn test_restore_keeps_duplicates_verbatim() {
        let mut engine = engine();
        let cs = o(Day::Monday, "T1", "CS101");
        let ma = o(Day::Monday, "T1", "MA101");
        engine.restore(vec![cs.clone(), ma.clone(), cs.clone()]);

        assert_eq!(engine.selected(), &[cs.clone(), ma.clone()]);
        assert_eq!(engine.selected_at(Day::Monday, "T1").len(), 2);
        assert_eq!(engine.find_selected(Day::Monday, "T1"), Some(&cs));
        assert_eq!(engine.selection_conflicts(), vec![(cs, ma)]);
        // both names are selected in the cell, so neither conflicts
        assert!(engine.conflicting_snapshot().is_empty());
        assert_invariants(&engine);
    }

    #[test]
    fn test_persistence_and_restore_on_startup() {
        let store = MemoryStore::new();
        {
            let mut engine =
                Engine::new(&catalog(), Box::new(store.clone()), Box::new(NoopThemeSink));
            engine.select(&o(Day::Wednesday, "T3", "Compilers")).unwrap();
            engine.toggle_theme();
        }

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.selected, vec![o(Day::Wednesday, "T3", "Compilers")]);
        assert_eq!(saved.theme, Theme::Dark);

        let sink = RecordingThemeSink::new();
        let engine = Engine::new(&catalog(), Box::new(store), Box::new(sink.clone()));
        assert_eq!(engine.selected(), &[o(Day::Wednesday, "T3", "Compilers")]);
        assert!(
            !engine
                .available_snapshot()
                .iter()
                .any(|a| a.day == Day::Wednesday)
        );
        assert_eq!(engine.theme(), Theme::Dark);
        assert_eq!(sink.applied(), vec![Theme::Dark]);
    }

    #[test]
    fn test_startup_keeps_clashing_saved_selection() {
        let cs = o(Day::Monday, "T1", "CS101");
        let ma = o(Day::Monday, "T1", "MA101");
        let store = MemoryStore::with_state(SavedState {
            selected: vec![cs.clone(), ma.clone()],
            theme: Theme::Dark,
        });
        let sink = RecordingThemeSink::new();

        let engine = Engine::new(&catalog(), Box::new(store.clone()), Box::new(sink.clone()));
        assert_eq!(engine.selected(), &[cs.clone(), ma.clone()]);
        assert_eq!(engine.selection_conflicts(), vec![(cs, ma)]);
        assert_eq!(sink.applied(), vec![Theme::Dark]);
        // loading alone writes nothing back
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_theme_changes_reach_sink() {
        let sink = RecordingThemeSink::new();
        let store = MemoryStore::new();
        let mut engine = Engine::new(&catalog(), Box::new(store.clone()), Box::new(sink.clone()));

        assert_eq!(engine.toggle_theme(), Theme::Dark);
        engine.set_theme(Theme::Dark);
        assert_eq!(engine.toggle_theme(), Theme::Light);

        assert_eq!(sink.applied(), vec![Theme::Light, Theme::Dark, Theme::Light]);
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_observers_fire_per_mutation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine();
        let log = Rc::clone(&seen);
        engine.on_change(move |selected| log.borrow_mut().push(selected.len()));

        engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();
        engine.select(&o(Day::Monday, "T1", "CS101")).unwrap();
        engine.select(&o(Day::Monday, "T2", "Physics")).unwrap();
        engine.remove(&o(Day::Monday, "T1", "CS101"));
        engine.remove(&o(Day::Monday, "T1", "CS101"));
        engine.clear();

        assert_eq!(*seen.borrow(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn test_failing_store_does_not_break_selection() {
        struct Broken;
        impl Persistence for Broken {
            fn load(&self) -> Result<Option<SavedState>> {
                Err(Error::Config("disk on fire".to_string()))
            }
            fn save(&self, _state: &SavedState) -> Result<()> {
                Err(Error::Config("disk on fire".to_string()))
            }
        }

        let mut engine = Engine::new(&catalog(), Box::new(Broken), Box::new(NoopThemeSink));
        assert!(engine.selected().is_empty());
        assert_eq!(
            engine.select(&o(Day::Monday, "T1", "CS101")).unwrap(),
            SelectOutcome::Added
        );
        assert_eq!(engine.selected().len(), 1);
    }

    #[test]
    fn test_export_uses_selection() {
        let mut engine = engine();
        let slots: crate::slot::SlotTimeTable = [("T1", "8:30 - 9:55"), ("T3", "11:40 - 1:05")]
            .into_iter()
            .collect();
        let projector = Projector::new(slots, NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
        let today = NaiveDate::from_ymd_opt(2025, 8, 4).unwrap();

        assert!(matches!(
            engine.export(&projector, &IcsOptions::default(), today),
            Err(Error::NothingToExport)
        ));

        engine.select(&o(Day::Wednesday, "T3", "Compilers")).unwrap();
        let export = engine
            .export(&projector, &IcsOptions::default(), today)
            .unwrap();
        assert_eq!(export.event_count, 2);
        assert!(export.content.contains("DTSTART:20250806T114000"));
        assert!(export.content.contains("DTEND:20250809T130500"));
    }
}
