/// A solfege syllable with its display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Solfege {
    pub name: &'static str,
    pub color: (u8, u8, u8),
}

pub const DO: Solfege = Solfege { name: "Do", color: (239, 68, 68) };
pub const RE: Solfege = Solfege { name: "Re", color: (249, 115, 22) };
pub const MI: Solfege = Solfege { name: "Mi", color: (234, 179, 8) };
pub const FA: Solfege = Solfege { name: "Fa", color: (34, 197, 94) };
pub const SOL: Solfege = Solfege { name: "Sol", color: (59, 130, 246) };
pub const LA: Solfege = Solfege { name: "La", color: (99, 102, 241) };
pub const SI: Solfege = Solfege { name: "Si", color: (168, 85, 247) };

/// The 15 relative degrees, three octaves centered on Do4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relative {
    Do3,
    Re3,
    Mi3,
    Fa3,
    Sol3,
    La3,
    Si3,
    Do4,
    Re4,
    Mi4,
    Fa4,
    Sol4,
    La4,
    Si4,
    Do5,
}

impl Relative {
    pub const COUNT: usize = 15;

    pub const ALL: [Relative; Relative::COUNT] = [
        Relative::Do3,
        Relative::Re3,
        Relative::Mi3,
        Relative::Fa3,
        Relative::Sol3,
        Relative::La3,
        Relative::Si3,
        Relative::Do4,
        Relative::Re4,
        Relative::Mi4,
        Relative::Fa4,
        Relative::Sol4,
        Relative::La4,
        Relative::Si4,
        Relative::Do5,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: usize) -> Option<Relative> {
        Relative::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Relative::Do3 => "Do3",
            Relative::Re3 => "Re3",
            Relative::Mi3 => "Mi3",
            Relative::Fa3 => "Fa3",
            Relative::Sol3 => "Sol3",
            Relative::La3 => "La3",
            Relative::Si3 => "Si3",
            Relative::Do4 => "Do4",
            Relative::Re4 => "Re4",
            Relative::Mi4 => "Mi4",
            Relative::Fa4 => "Fa4",
            Relative::Sol4 => "Sol4",
            Relative::La4 => "La4",
            Relative::Si4 => "Si4",
            Relative::Do5 => "Do5",
        }
    }
}

/// A note derived from a relative degree: syllable plus cent offset from Do4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note {
    pub solfege: Solfege,
    pub cent: i32,
}

impl Note {
    pub fn from_relative(relative: Relative) -> Note {
        let (solfege, cent) = match relative {
            Relative::Do3 => (DO, -1200),
            Relative::Re3 => (RE, -1000),
            Relative::Mi3 => (MI, -800),
            Relative::Fa3 => (FA, -700),
            Relative::Sol3 => (SOL, -500),
            Relative::La3 => (LA, -300),
            Relative::Si3 => (SI, -100),
            Relative::Do4 => (DO, 0),
            Relative::Re4 => (RE, 200),
            Relative::Mi4 => (MI, 400),
            Relative::Fa4 => (FA, 500),
            Relative::Sol4 => (SOL, 700),
            Relative::La4 => (LA, 900),
            Relative::Si4 => (SI, 1100),
            Relative::Do5 => (DO, 1200),
        };
        Note { solfege, cent }
    }

    pub fn frequency(&self, do4_frequency: f32) -> f32 {
        cent_to_frequency(self.cent as f32, do4_frequency)
    }
}

pub fn cent_to_frequency(cent: f32, do4_frequency: f32) -> f32 {
    do4_frequency * 2f32.powf(cent / 1200.0)
}

pub fn frequency_to_cent(frequency: f32, do4_frequency: f32) -> f32 {
    1200.0 * (frequency / do4_frequency).log2()
}

/// Scoring strictness. The threshold is the maximum absolute cent error
/// allowed per slot for a question to count as cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    NoCheck,
    Easy,
    Normal,
    Hard,
    VeryHard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::NoCheck,
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    /// Unknown indices fall back to Easy rather than failing.
    pub fn from_index(index: usize) -> Difficulty {
        Difficulty::ALL.get(index).copied().unwrap_or(Difficulty::Easy)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::NoCheck => "No Check",
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
        }
    }

    pub fn threshold(self) -> i32 {
        match self {
            Difficulty::NoCheck => 10000,
            Difficulty::Easy => 50,
            Difficulty::Normal => 30,
            Difficulty::Hard => 10,
            Difficulty::VeryHard => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cent_table() {
        assert_eq!(Note::from_relative(Relative::Do3).cent, -1200);
        assert_eq!(Note::from_relative(Relative::Sol3).cent, -500);
        assert_eq!(Note::from_relative(Relative::Do4).cent, 0);
        assert_eq!(Note::from_relative(Relative::Fa4).cent, 500);
        assert_eq!(Note::from_relative(Relative::Do5).cent, 1200);
    }

    #[test]
    fn test_relative_index_roundtrip() {
        for (i, rel) in Relative::ALL.iter().enumerate() {
            assert_eq!(rel.index(), i as i32);
            assert_eq!(Relative::from_index(i), Some(*rel));
        }
        assert_eq!(Relative::from_index(15), None);
        assert_eq!(Relative::Do4.index(), 7);
    }

    #[test]
    fn test_solfege_repeats_per_octave() {
        assert_eq!(Note::from_relative(Relative::Do3).solfege, DO);
        assert_eq!(Note::from_relative(Relative::Do4).solfege, DO);
        assert_eq!(Note::from_relative(Relative::Do5).solfege, DO);
        assert_eq!(Note::from_relative(Relative::Si3).solfege, SI);
        assert_eq!(Note::from_relative(Relative::Si4).solfege, SI);
    }

    #[test]
    fn test_frequency_conversion() {
        let octave = cent_to_frequency(1200.0, 440.0);
        assert!((octave - 880.0).abs() < 0.01);
        let down = cent_to_frequency(-1200.0, 440.0);
        assert!((down - 220.0).abs() < 0.01);
        assert!((cent_to_frequency(0.0, 432.5) - 432.5).abs() < 0.001);

        let cent = frequency_to_cent(880.0, 440.0);
        assert!((cent - 1200.0).abs() < 0.01);
    }

    #[test]
    fn test_note_frequency_uses_reference() {
        let note = Note::from_relative(Relative::Do5);
        assert!((note.frequency(440.0) - 880.0).abs() < 0.01);
        assert!((note.frequency(415.3) - 830.6).abs() < 0.01);
    }

    #[test]
    fn test_difficulty_table() {
        assert_eq!(Difficulty::from_index(0).threshold(), 10000);
        assert_eq!(Difficulty::from_index(2).threshold(), 30);
        assert_eq!(Difficulty::from_index(4).threshold(), 5);
        assert_eq!(Difficulty::from_index(2).name(), "Normal");
    }

    #[test]
    fn test_difficulty_fallback() {
        assert_eq!(Difficulty::from_index(99), Difficulty::Easy);
        assert_eq!(Difficulty::from_index(5), Difficulty::Easy);
    }
}
