use crate::question;
use crate::solfege::{Difficulty, Note, Relative};
use crate::store::KvStore;
use crate::wheel;
use std::collections::HashMap;

pub const SLOT_COUNT: usize = 4;
pub const INTERACTIVE_SLOTS: usize = 3;

const HISTORY_PREFIX: &str = "lastDiff_";
const DEFAULT_DO4_FREQUENCY: f32 = 440.0;

pub type ListenerId = usize;
type Listener = Box<dyn FnMut(&SessionView)>;

/// Wheel targets for one question transition, in index space.
pub type AnimateTargets = [i32; SLOT_COUNT];

/// Callback that starts the per-slot repositioning animations and returns
/// their completion receivers.
pub type AnimateFn<'a> = &'a mut dyn FnMut(AnimateTargets) -> Vec<flume::Receiver<()>>;

/// Immutable snapshot handed to observers and pulled by the UI.
#[derive(Clone, Debug)]
pub struct SessionView {
    pub did_answer: bool,
    pub is_first_try: bool,
    pub is_cleared: bool,
    pub do_show_cent_in_answer: bool,
    pub answer_cents: [i32; SLOT_COUNT],
    pub fixed_answer_cents: [i32; SLOT_COUNT],
    pub correct_cents: [i32; SLOT_COUNT],
    pub relative_indexes: [Relative; SLOT_COUNT],
    pub do4_frequency: f32,
    pub can_make_sound: bool,
    pub difficulty: Difficulty,
    pub threshold: i32,
    pub last_differences: HashMap<String, String>,
}

/// The session state machine: question lifecycle, per-slot answers, clear
/// check against the difficulty threshold, and the per-degree history of
/// first-try differences.
///
/// Wheels are never referenced directly; a question transition hands jittered
/// target indexes to the caller-supplied animate callback and the transition
/// finishes when `poll_transition` observes every returned receiver complete
/// (or disconnect, for cancelled animations).
pub struct Session {
    did_answer: bool,
    is_first_try: bool,
    is_cleared: bool,
    do_show_cent_in_answer: bool,
    answer_cents: [i32; SLOT_COUNT],
    fixed_answer_cents: [i32; SLOT_COUNT],
    correct_cents: [i32; SLOT_COUNT],
    relative_indexes: [Relative; SLOT_COUNT],
    do4_frequency: f32,
    can_make_sound: bool,
    difficulty: Difficulty,
    threshold: i32,
    last_differences: HashMap<String, String>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
    pending_transition: Vec<flume::Receiver<()>>,
    in_transition: bool,
    store: Box<dyn KvStore>,
}

impl Session {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        let mut last_differences = HashMap::new();
        for relative in Relative::ALL {
            let key = format!("{HISTORY_PREFIX}{}", relative.name());
            if let Some(value) = store.get(&key) {
                if !value.is_empty() {
                    last_differences.insert(relative.name().to_string(), value);
                }
            }
        }

        Self {
            did_answer: false,
            is_first_try: true,
            // A cleared start makes the first transition generate a question.
            is_cleared: true,
            do_show_cent_in_answer: true,
            answer_cents: [0; SLOT_COUNT],
            fixed_answer_cents: [0; SLOT_COUNT],
            correct_cents: [0; SLOT_COUNT],
            relative_indexes: [Relative::Do4; SLOT_COUNT],
            do4_frequency: DEFAULT_DO4_FREQUENCY,
            can_make_sound: true,
            difficulty: Difficulty::Easy,
            threshold: Difficulty::Easy.threshold(),
            last_differences,
            listeners: Vec::new(),
            next_listener_id: 0,
            pending_transition: Vec::new(),
            in_transition: false,
            store,
        }
    }

    pub fn did_answer(&self) -> bool {
        self.did_answer
    }

    pub fn is_first_try(&self) -> bool {
        self.is_first_try
    }

    pub fn is_cleared(&self) -> bool {
        self.is_cleared
    }

    pub fn do_show_cent_in_answer(&self) -> bool {
        self.do_show_cent_in_answer
    }

    pub fn answer_cents(&self) -> [i32; SLOT_COUNT] {
        self.answer_cents
    }

    pub fn fixed_answer_cents(&self) -> [i32; SLOT_COUNT] {
        self.fixed_answer_cents
    }

    pub fn correct_cents(&self) -> [i32; SLOT_COUNT] {
        self.correct_cents
    }

    pub fn relative_indexes(&self) -> [Relative; SLOT_COUNT] {
        self.relative_indexes
    }

    pub fn do4_frequency(&self) -> f32 {
        self.do4_frequency
    }

    pub fn can_make_sound(&self) -> bool {
        self.can_make_sound
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn last_differences(&self) -> &HashMap<String, String> {
        &self.last_differences
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            did_answer: self.did_answer,
            is_first_try: self.is_first_try,
            is_cleared: self.is_cleared,
            do_show_cent_in_answer: self.do_show_cent_in_answer,
            answer_cents: self.answer_cents,
            fixed_answer_cents: self.fixed_answer_cents,
            correct_cents: self.correct_cents,
            relative_indexes: self.relative_indexes,
            do4_frequency: self.do4_frequency,
            can_make_sound: self.can_make_sound,
            difficulty: self.difficulty,
            threshold: self.threshold,
            last_differences: self.last_differences.clone(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionView) + 'static) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify(&mut self) {
        let view = self.view();
        for (_, listener) in &mut self.listeners {
            listener(&view);
        }
    }

    pub fn set_difficulty(&mut self, index: usize) {
        self.difficulty = Difficulty::from_index(index);
        self.threshold = self.difficulty.threshold();
        self.update_if_cleared();
        self.notify();
    }

    pub fn set_answer_cent(&mut self, slot: usize, cent: i32) {
        let Some(answer) = self.answer_cents.get_mut(slot) else {
            return;
        };
        *answer = cent;
        self.notify();
    }

    pub fn toggle_show_cents_in_answer(&mut self) {
        self.do_show_cent_in_answer = !self.do_show_cent_in_answer;
        self.notify();
    }

    pub fn one_difference(&self, slot: usize) -> i32 {
        self.fixed_answer_cents[slot] - self.correct_cents[slot]
    }

    /// Signed difference text, with an explicit `+` for non-negative values.
    pub fn one_difference_text(&self, slot: usize) -> String {
        let diff = self.one_difference(slot);
        if diff >= 0 {
            format!("+{diff}")
        } else {
            diff.to_string()
        }
    }

    pub fn total_difference(&self) -> i32 {
        (0..INTERACTIVE_SLOTS)
            .map(|slot| self.one_difference(slot).abs())
            .sum()
    }

    fn update_if_cleared(&mut self) {
        let max_diff = (0..INTERACTIVE_SLOTS)
            .map(|slot| self.one_difference(slot).abs())
            .max()
            .unwrap_or(0);
        self.is_cleared = max_diff < self.threshold;
    }

    /// Commits the current answers and scores them.
    pub fn answer(&mut self) {
        self.did_answer = true;
        self.fixed_answer_cents = self.answer_cents;
        self.update_if_cleared();
        self.notify();
    }

    /// Advances to the next question: persists first-try history, re-rolls
    /// the reference pitch, generates a new question when the previous one
    /// was cleared (otherwise retries the same degrees), and kicks off the
    /// wheel repositioning through `animate`.
    ///
    /// Sound stays suppressed until every animation completes; without a
    /// callback the transition finishes synchronously.
    pub fn go_to_next(&mut self, animate: Option<AnimateFn>) {
        if self.is_first_try && self.did_answer {
            for slot in 0..INTERACTIVE_SLOTS {
                let name = self.relative_indexes[slot].name();
                let text = self.one_difference_text(slot);
                self.last_differences.insert(name.to_string(), text.clone());
                self.store.set(&format!("{HISTORY_PREFIX}{name}"), &text);
            }
        }

        self.did_answer = false;

        // Reference pitch lands within roughly a fourth around concert pitch.
        self.do4_frequency = 440.0 * 2f32.powf((fastrand::f32() * 11.0 - 9.0) / 12.0);

        if self.is_cleared {
            let [first, second, third] = question::generate();
            self.relative_indexes = [first, second, third, Relative::Do4];
            self.is_first_try = true;
        } else {
            self.is_first_try = false;
        }

        self.is_cleared = false;

        for slot in 0..SLOT_COUNT {
            self.correct_cents[slot] = Note::from_relative(self.relative_indexes[slot]).cent;
        }

        self.can_make_sound = false;
        self.in_transition = true;

        if let Some(animate) = animate {
            let mut targets = [0i32; SLOT_COUNT];
            for (slot, target) in targets.iter_mut().enumerate() {
                // Interactive wheels land displaced from the answer so the
                // learner has to adjust; the reference wheel lands exactly.
                let jitter = if slot < INTERACTIVE_SLOTS {
                    display_jitter()
                } else {
                    0
                };
                *target = wheel::cent_to_index(self.correct_cents[slot] + jitter);
            }
            self.pending_transition = animate(targets);
        }

        self.poll_transition();
    }

    /// Completes a pending transition once every animation has finished or
    /// been cancelled. Called by the UI loop each frame.
    pub fn poll_transition(&mut self) {
        if !self.in_transition {
            return;
        }
        self.pending_transition
            .retain(|receiver| matches!(receiver.try_recv(), Err(flume::TryRecvError::Empty)));
        if self.pending_transition.is_empty() {
            self.in_transition = false;
            self.can_make_sound = true;
            self.notify();
        }
    }

    pub fn set_initial(&mut self) {
        self.did_answer = false;
        self.do4_frequency = DEFAULT_DO4_FREQUENCY;
        self.relative_indexes = [Relative::Do4; SLOT_COUNT];
        self.correct_cents = [0; SLOT_COUNT];
        self.notify();
    }

    /// Clears the per-degree history. The store interface has no delete, so
    /// cleared keys are written empty and treated as absent on load.
    pub fn clear_last_differences(&mut self) {
        for relative in Relative::ALL {
            self.store
                .set(&format!("{HISTORY_PREFIX}{}", relative.name()), "");
        }
        self.last_differences.clear();
        self.notify();
    }

    #[cfg(test)]
    pub(crate) fn force_question(&mut self, degrees: [Relative; SLOT_COUNT]) {
        self.relative_indexes = degrees;
        for slot in 0..SLOT_COUNT {
            self.correct_cents[slot] = Note::from_relative(degrees[slot]).cent;
        }
    }
}

// Magnitude 50..=150 with random sign, matching the original displacement.
fn display_jitter() -> i32 {
    let r = fastrand::i32(0..200) - 100;
    if r < 0 { r - 50 } else { r + 50 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::melodic_rules_hold;
    use crate::store::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session_with_store() -> (Session, Rc<RefCell<MemoryStore>>) {
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        let session = Session::new(Box::new(Rc::clone(&store)));
        (session, store)
    }

    #[test]
    fn test_scoring_scenario() {
        let (mut session, _store) = session_with_store();
        session.force_question([
            Relative::Mi4,
            Relative::Sol3,
            Relative::Re4,
            Relative::Do4,
        ]);
        session.set_answer_cent(0, 410);
        session.set_answer_cent(1, 0);
        session.set_answer_cent(2, 190);
        session.answer();
        session.set_difficulty(2); // Normal, threshold 30

        assert_eq!(session.one_difference_text(0), "+10");
        assert_eq!(session.one_difference_text(1), "+500");
        assert_eq!(session.one_difference_text(2), "-10");
        assert!(!session.is_cleared());
        assert_eq!(session.total_difference(), 520);
    }

    #[test]
    fn test_clear_threshold_is_strict() {
        let (mut session, _store) = session_with_store();
        session.force_question([
            Relative::Mi4,
            Relative::Sol3,
            Relative::Re4,
            Relative::Do4,
        ]);
        session.set_difficulty(2);

        session.set_answer_cent(0, 400 + 29);
        session.set_answer_cent(1, -500);
        session.set_answer_cent(2, 200);
        session.answer();
        assert!(session.is_cleared());

        session.set_answer_cent(0, 400 + 30);
        session.answer();
        assert!(!session.is_cleared());
    }

    #[test]
    fn test_set_difficulty_reevaluates_fixed_answers() {
        let (mut session, _store) = session_with_store();
        session.force_question([
            Relative::Mi4,
            Relative::Sol3,
            Relative::Re4,
            Relative::Do4,
        ]);
        session.set_answer_cent(0, 420);
        session.set_answer_cent(1, -500);
        session.set_answer_cent(2, 200);
        session.answer();

        session.set_difficulty(1); // Easy, 50
        assert!(session.is_cleared());
        session.set_difficulty(3); // Hard, 10
        assert!(!session.is_cleared());
    }

    #[test]
    fn test_unknown_difficulty_falls_back() {
        let (mut session, _store) = session_with_store();
        session.set_difficulty(42);
        assert_eq!(session.difficulty(), Difficulty::Easy);
        assert_eq!(session.threshold(), 50);
    }

    #[test]
    fn test_retry_keeps_question() {
        let (mut session, _store) = session_with_store();
        session.go_to_next(None);
        let degrees = session.relative_indexes();

        // Answer far off so the question is not cleared.
        session.set_answer_cent(0, 1700);
        session.answer();
        assert!(!session.is_cleared());

        session.go_to_next(None);
        assert_eq!(session.relative_indexes(), degrees);
        assert!(!session.is_first_try());
        assert!(!session.did_answer());
        assert!(!session.is_cleared());
    }

    #[test]
    fn test_cleared_generates_new_question() {
        let (mut session, _store) = session_with_store();
        session.go_to_next(None);
        assert!(session.is_first_try());

        let degrees = session.relative_indexes();
        assert_eq!(degrees[3], Relative::Do4);
        let triple = [degrees[0], degrees[1], degrees[2]];
        assert!(melodic_rules_hold(&triple));

        for slot in 0..SLOT_COUNT {
            assert_eq!(
                session.correct_cents()[slot],
                Note::from_relative(degrees[slot]).cent
            );
        }

        // Answer perfectly, clear, advance.
        for slot in 0..INTERACTIVE_SLOTS {
            session.set_answer_cent(slot, session.correct_cents()[slot]);
        }
        session.answer();
        assert!(session.is_cleared());

        session.go_to_next(None);
        assert!(session.is_first_try());
        assert_eq!(session.relative_indexes()[3], Relative::Do4);
    }

    #[test]
    fn test_reference_frequency_band() {
        let (mut session, _store) = session_with_store();
        for _ in 0..100 {
            session.go_to_next(None);
            let freq = session.do4_frequency();
            let low = 440.0 * 2f32.powf(-9.0 / 12.0);
            let high = 440.0 * 2f32.powf(2.0 / 12.0);
            assert!(freq >= low - 0.01 && freq < high + 0.01, "freq {freq}");
            // Not cleared, so the degrees stay; clear to vary the question.
            for slot in 0..INTERACTIVE_SLOTS {
                session.set_answer_cent(slot, session.correct_cents()[slot]);
            }
            session.answer();
        }
    }

    #[test]
    fn test_first_try_history_persists() {
        let (mut session, store) = session_with_store();
        session.go_to_next(None);
        let degrees = session.relative_indexes();

        session.set_answer_cent(0, session.correct_cents()[0] + 10);
        session.set_answer_cent(1, session.correct_cents()[1]);
        session.set_answer_cent(2, session.correct_cents()[2] - 7);
        session.answer();
        session.go_to_next(None);

        let store = store.borrow();
        assert_eq!(
            store.get(&format!("lastDiff_{}", degrees[0].name())),
            Some("+10".to_string())
        );
        assert_eq!(
            store.get(&format!("lastDiff_{}", degrees[2].name())),
            Some("-7".to_string())
        );
        assert_eq!(
            session.last_differences().get(degrees[0].name()),
            Some(&"+10".to_string())
        );
    }

    #[test]
    fn test_retry_does_not_overwrite_history() {
        let (mut session, store) = session_with_store();
        session.go_to_next(None);
        let first_degree = session.relative_indexes()[0];

        // First try, off by 10: recorded.
        session.set_answer_cent(0, session.correct_cents()[0] + 10);
        session.set_answer_cent(1, 1700);
        session.answer();
        session.go_to_next(None);

        // Second try on the same question: not recorded.
        session.set_answer_cent(0, session.correct_cents()[0] + 999);
        session.answer();
        session.go_to_next(None);

        assert_eq!(
            store.borrow().get(&format!("lastDiff_{}", first_degree.name())),
            Some("+10".to_string())
        );
    }

    #[test]
    fn test_history_loaded_at_construction() {
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        store.borrow_mut().set("lastDiff_Mi4", "+12");
        store.borrow_mut().set("lastDiff_Sol3", "");

        let session = Session::new(Box::new(Rc::clone(&store)));
        assert_eq!(
            session.last_differences().get("Mi4"),
            Some(&"+12".to_string())
        );
        // Empty values are treated as absent.
        assert!(!session.last_differences().contains_key("Sol3"));
    }

    #[test]
    fn test_clear_last_differences() {
        let (mut session, store) = session_with_store();
        session.go_to_next(None);
        session.set_answer_cent(0, session.correct_cents()[0] + 10);
        session.answer();
        session.go_to_next(None);
        assert!(!session.last_differences().is_empty());

        session.clear_last_differences();
        assert!(session.last_differences().is_empty());
        assert_eq!(store.borrow().get("lastDiff_Do4"), Some(String::new()));
    }

    #[test]
    fn test_transition_gates_sound_until_animations_finish() {
        let (mut session, _store) = session_with_store();
        let (tx, rx) = flume::bounded(1);

        session.go_to_next(Some(&mut |_targets| vec![rx.clone()]));
        assert!(!session.can_make_sound());

        session.poll_transition();
        assert!(!session.can_make_sound());

        tx.send(()).unwrap();
        session.poll_transition();
        assert!(session.can_make_sound());
    }

    #[test]
    fn test_cancelled_animation_still_completes_transition() {
        let (mut session, _store) = session_with_store();
        let (tx, rx) = flume::bounded(1);

        session.go_to_next(Some(&mut |_targets| vec![rx.clone()]));
        assert!(!session.can_make_sound());

        // Wheel torn down mid-animation: sender dropped without completing.
        drop(tx);
        session.poll_transition();
        assert!(session.can_make_sound());
    }

    #[test]
    fn test_transition_targets_are_jittered() {
        let (mut session, _store) = session_with_store();
        let captured = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&captured);
        session.go_to_next(Some(&mut move |targets| {
            *sink.borrow_mut() = Some(targets);
            Vec::new()
        }));

        let targets = captured.borrow().unwrap();
        let correct = session.correct_cents();
        for slot in 0..INTERACTIVE_SLOTS {
            let offset = (targets[slot] - wheel::cent_to_index(correct[slot])).abs();
            assert!((50..=150).contains(&offset), "offset {offset}");
        }
        // The reference wheel lands exactly on its answer.
        assert_eq!(targets[3], wheel::cent_to_index(correct[3]));
        // Empty receiver list finishes the transition synchronously.
        assert!(session.can_make_sound());
    }

    #[test]
    fn test_observers_notified_and_unsubscribed() {
        let (mut session, _store) = session_with_store();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = session.subscribe(move |_view| *sink.borrow_mut() += 1);

        session.set_answer_cent(0, 5);
        session.answer();
        assert_eq!(*count.borrow(), 2);

        session.unsubscribe(id);
        session.set_answer_cent(0, 6);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_observer_sees_snapshot() {
        let (mut session, _store) = session_with_store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        session.subscribe(move |view: &SessionView| {
            sink.borrow_mut().push((view.did_answer, view.answer_cents[1]))
        });

        session.set_answer_cent(1, -42);
        session.answer();
        let seen = seen.borrow();
        assert_eq!(seen[0], (false, -42));
        assert_eq!(seen[1], (true, -42));
    }

    #[test]
    fn test_set_initial() {
        let (mut session, _store) = session_with_store();
        session.go_to_next(None);
        session.set_initial();
        assert_eq!(session.relative_indexes(), [Relative::Do4; SLOT_COUNT]);
        assert_eq!(session.correct_cents(), [0; SLOT_COUNT]);
        assert!((session.do4_frequency() - 440.0).abs() < f32::EPSILON);
        assert!(!session.did_answer());
    }

    #[test]
    fn test_out_of_range_slot_ignored() {
        let (mut session, _store) = session_with_store();
        session.set_answer_cent(9, 100);
        assert_eq!(session.answer_cents(), [0; SLOT_COUNT]);
    }
}
