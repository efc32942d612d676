use crate::solfege::Relative;

// Degrees that never end a phrase.
const EXCLUDED_FINALS: [Relative; 4] = [
    Relative::Fa3,
    Relative::La3,
    Relative::Fa4,
    Relative::La4,
];

const MAX_LEAP: i32 = 4;

/// Draws a three-degree question by rejection sampling.
///
/// The loop is intentionally unbounded: the acceptance probability is high
/// enough that a cap would only serve to bias the distribution.
pub fn generate() -> [Relative; 3] {
    let mut rng = fastrand::Rng::new();
    generate_with(&mut rng)
}

pub fn generate_with(rng: &mut fastrand::Rng) -> [Relative; 3] {
    loop {
        let mut draw = [Relative::Do4; 3];
        for slot in &mut draw {
            *slot = Relative::ALL[rng.usize(0..Relative::COUNT)];
        }
        if !melodic_rules_hold(&draw) {
            continue;
        }
        // Bias toward wider questions: small deviations survive only when the
        // random bar comes up low.
        let max_deviation = draw
            .iter()
            .map(|rel| (rel.index() - Relative::Do4.index()).abs())
            .max()
            .unwrap_or(0);
        if max_deviation <= rng.i32(0..7) {
            continue;
        }
        return draw;
    }
}

/// The hard constraints: the final degree resolves near Do4 (but is not Do4
/// and not an excluded final), and adjacent degrees move by a step of at
/// most four without repeating.
pub(crate) fn melodic_rules_hold(draw: &[Relative; 3]) -> bool {
    let last = draw[2];
    let from_do4 = (last.index() - Relative::Do4.index()).abs();
    if last == Relative::Do4 || from_do4 > MAX_LEAP {
        return false;
    }
    if EXCLUDED_FINALS.contains(&last) {
        return false;
    }
    for pair in draw.windows(2) {
        let step = (pair[0].index() - pair[1].index()).abs();
        if step > MAX_LEAP || pair[0] == pair[1] {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_questions_satisfy_constraints() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..10_000 {
            let draw = generate_with(&mut rng);

            let last = draw[2];
            assert_ne!(last, Relative::Do4);
            assert!((last.index() - Relative::Do4.index()).abs() <= MAX_LEAP);
            assert!(!EXCLUDED_FINALS.contains(&last));

            for pair in draw.windows(2) {
                assert!((pair[0].index() - pair[1].index()).abs() <= MAX_LEAP);
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_generation_covers_wide_questions() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut saw_wide = false;
        for _ in 0..1_000 {
            let draw = generate_with(&mut rng);
            let max_deviation = draw
                .iter()
                .map(|rel| (rel.index() - Relative::Do4.index()).abs())
                .max()
                .unwrap();
            if max_deviation >= 5 {
                saw_wide = true;
                break;
            }
        }
        assert!(saw_wide, "deviation bias never produced a wide question");
    }

    #[test]
    fn test_melodic_rules_reject_known_bad_draws() {
        // Ends on Do4.
        assert!(!melodic_rules_hold(&[
            Relative::Re4,
            Relative::Mi4,
            Relative::Do4
        ]));
        // Ends too far from Do4.
        assert!(!melodic_rules_hold(&[
            Relative::Do5,
            Relative::Si4,
            Relative::Do3
        ]));
        // Ends on an excluded final.
        assert!(!melodic_rules_hold(&[
            Relative::Sol4,
            Relative::Mi4,
            Relative::Fa4
        ]));
        // Adjacent leap wider than four.
        assert!(!melodic_rules_hold(&[
            Relative::Do3,
            Relative::Sol3,
            Relative::Mi4
        ]));
        // Adjacent repeat.
        assert!(!melodic_rules_hold(&[
            Relative::Mi4,
            Relative::Mi4,
            Relative::Re4
        ]));
    }

    #[test]
    fn test_melodic_rules_accept_valid_draw() {
        assert!(melodic_rules_hold(&[
            Relative::Mi4,
            Relative::Sol4,
            Relative::Re4
        ]));
    }
}
