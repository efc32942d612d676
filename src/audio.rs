use std::time::{Duration, Instant};

#[cfg(feature = "live")]
use assert_no_alloc::*;
#[cfg(feature = "live")]
use cpal::StreamConfig;
#[cfg(feature = "live")]
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
#[cfg(feature = "live")]
use std::sync::{Arc, Mutex};

#[cfg(all(feature = "live", debug_assertions))] // required when disable_release is set (default)
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

/// Voice presets. Identifiers are stable: they are what gets persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Timbre {
    Triangle,
    Sine,
    #[default]
    FmSoft,
    FmElectric,
}

impl Timbre {
    pub const ALL: [Timbre; 4] = [
        Timbre::Triangle,
        Timbre::Sine,
        Timbre::FmSoft,
        Timbre::FmElectric,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Timbre::Triangle => "triangle",
            Timbre::Sine => "sine",
            Timbre::FmSoft => "fm-soft",
            Timbre::FmElectric => "fm-electric",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Triangle => "Triangle",
            Timbre::Sine => "Sine",
            Timbre::FmSoft => "FM Soft",
            Timbre::FmElectric => "FM Electric",
        }
    }

    pub fn from_id(id: &str) -> Option<Timbre> {
        Timbre::ALL.iter().copied().find(|timbre| timbre.id() == id)
    }

    pub fn next(self) -> Timbre {
        let position = Timbre::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Timbre::ALL[(position + 1) % Timbre::ALL.len()]
    }
}

// Envelope shape for the single voice.
const ATTACK: f32 = 0.02;
const DECAY: f32 = 0.1;
const SUSTAIN: f32 = 0.8;
const RELEASE: f32 = 0.3;

const VOICE_GAIN: f32 = 0.2;
const GLIDE: f32 = 0.002;

#[derive(Clone, Copy)]
struct VoiceControl {
    frequency: f32,
    gate: bool,
    timbre: Timbre,
}

/// Tone generator facade. `initialize` must follow a user gesture and may
/// fail; every other operation degrades to a no-op until it succeeds, so the
/// exercise works with audio never coming up. Without the `live` feature the
/// facade is inert.
pub struct Audio {
    timbre: Timbre,
    playing: bool,
    stop_deadline: Option<Instant>,
    #[cfg(feature = "live")]
    engine: Option<Engine>,
}

impl Audio {
    pub fn new() -> Self {
        Self {
            timbre: Timbre::default(),
            playing: false,
            stop_deadline: None,
            #[cfg(feature = "live")]
            engine: None,
        }
    }

    /// Builds the output stream. Returns false when no device is available;
    /// a later call may succeed.
    pub fn initialize(&mut self) -> bool {
        #[cfg(feature = "live")]
        {
            if self.engine.is_some() {
                return true;
            }
            match Engine::start(self.timbre) {
                Ok(engine) => {
                    self.engine = Some(engine);
                    true
                }
                Err(e) => {
                    eprintln!("Failed to initialize audio: {e}");
                    false
                }
            }
        }
        #[cfg(not(feature = "live"))]
        false
    }

    pub fn is_initialized(&self) -> bool {
        #[cfg(feature = "live")]
        {
            self.engine.is_some()
        }
        #[cfg(not(feature = "live"))]
        false
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn timbre(&self) -> Timbre {
        self.timbre
    }

    pub fn set_timbre(&mut self, timbre: Timbre) {
        self.timbre = timbre;
        self.with_control(|control| control.timbre = timbre);
    }

    pub fn attack(&mut self, frequency: f32) {
        if self.with_control(|control| {
            control.frequency = frequency;
            control.gate = true;
        }) {
            self.playing = true;
        }
    }

    pub fn release(&mut self) {
        self.with_control(|control| control.gate = false);
        self.playing = false;
    }

    pub fn set_pitch(&mut self, frequency: f32) {
        self.with_control(|control| control.frequency = frequency);
    }

    /// Re-pitches if already sounding, otherwise attacks, and auto-releases
    /// once the deadline passes. Used while the wheels are turning.
    pub fn sustain_for(&mut self, frequency: f32, duration: Duration, now: Instant) {
        if self.playing {
            self.set_pitch(frequency);
        } else {
            self.attack(frequency);
        }
        self.stop_deadline = Some(now + duration);
    }

    pub fn stop_immediate(&mut self) {
        self.stop_deadline = None;
        self.release();
    }

    /// Drives the sustain deadline; called by the UI loop each frame.
    pub fn update(&mut self, now: Instant) {
        if let Some(deadline) = self.stop_deadline {
            if now >= deadline {
                self.stop_deadline = None;
                self.release();
            }
        }
    }

    fn with_control(&self, apply: impl FnOnce(&mut VoiceControl)) -> bool {
        #[cfg(feature = "live")]
        if let Some(engine) = &self.engine {
            apply(&mut engine.control.lock().unwrap());
            return true;
        }
        let _ = apply;
        false
    }
}

impl Default for Audio {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "live")]
struct Engine {
    _stream: cpal::Stream,
    control: Arc<Mutex<VoiceControl>>,
}

#[cfg(feature = "live")]
impl Engine {
    fn start(timbre: Timbre) -> Result<Self, Box<dyn std::error::Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No output device available")?;
        let config: StreamConfig = device.default_output_config()?.into();

        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        let control = Arc::new(Mutex::new(VoiceControl {
            frequency: 440.0,
            gate: false,
            timbre,
        }));
        let shared = Arc::clone(&control);

        // Per-voice state lives in the callback.
        let mut position = 0usize;
        let mut edge_position = 0usize;
        let mut last_gate = false;
        let mut level = 0.0f32;
        let mut level_at_edge = 0.0f32;
        let mut current_frequency = 440.0f32;
        let mut carrier_phase = 0.0f32;
        let mut modulator_phase = 0.0f32;

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let voice = *shared.lock().unwrap();

                for frame in data.chunks_mut(channels) {
                    let sample = assert_no_alloc(|| {
                        position += 1;

                        if voice.gate != last_gate {
                            edge_position = position;
                            level_at_edge = level;
                            last_gate = voice.gate;
                            if voice.gate {
                                // Attacks start exactly on pitch.
                                current_frequency = voice.frequency;
                            }
                        }

                        let since_edge = (position - edge_position) as f32 / sample_rate;
                        level = envelope(voice.gate, since_edge, level_at_edge);

                        current_frequency += (voice.frequency - current_frequency) * GLIDE;
                        let phase_delta = current_frequency / sample_rate;
                        carrier_phase = (carrier_phase + phase_delta).fract();

                        let tau = std::f32::consts::TAU;
                        let raw = match voice.timbre {
                            Timbre::Sine => (tau * carrier_phase).sin(),
                            Timbre::Triangle => 4.0 * (carrier_phase - 0.5).abs() - 1.0,
                            Timbre::FmSoft => {
                                modulator_phase = (modulator_phase + phase_delta).fract();
                                (tau * carrier_phase + 1.5 * (tau * modulator_phase).sin()).sin()
                            }
                            Timbre::FmElectric => {
                                modulator_phase = (modulator_phase + phase_delta * 3.0).fract();
                                (tau * carrier_phase + 4.0 * (tau * modulator_phase).sin()).sin()
                            }
                        };

                        (raw * level * VOICE_GAIN).clamp(-1.0, 1.0)
                    });

                    for channel_sample in frame.iter_mut() {
                        *channel_sample = sample;
                    }
                }
            },
            |err| eprintln!("Audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Engine {
            _stream: stream,
            control,
        })
    }
}

#[cfg(feature = "live")]
fn envelope(gate: bool, since_edge: f32, level_at_edge: f32) -> f32 {
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    if gate {
        if since_edge < ATTACK {
            lerp(level_at_edge, 1.0, since_edge / ATTACK)
        } else if since_edge < ATTACK + DECAY {
            lerp(1.0, SUSTAIN, (since_edge - ATTACK) / DECAY)
        } else {
            SUSTAIN
        }
    } else if since_edge < RELEASE {
        lerp(level_at_edge, 0.0, since_edge / RELEASE)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timbre_id_roundtrip() {
        for timbre in Timbre::ALL {
            assert_eq!(Timbre::from_id(timbre.id()), Some(timbre));
        }
        assert_eq!(Timbre::from_id("theremin"), None);
    }

    #[test]
    fn test_default_timbre() {
        assert_eq!(Timbre::default(), Timbre::FmSoft);
        assert_eq!(Timbre::default().id(), "fm-soft");
    }

    #[test]
    fn test_timbre_cycle_covers_all() {
        let mut timbre = Timbre::Triangle;
        let mut seen = Vec::new();
        for _ in 0..Timbre::ALL.len() {
            seen.push(timbre);
            timbre = timbre.next();
        }
        assert_eq!(timbre, Timbre::Triangle);
        for expected in Timbre::ALL {
            assert!(seen.contains(&expected));
        }
    }

    #[test]
    fn test_uninitialized_audio_is_inert() {
        let t0 = Instant::now();
        let mut audio = Audio::new();
        assert!(!audio.is_initialized());

        audio.sustain_for(440.0, Duration::from_secs(2), t0);
        assert!(!audio.is_playing());
        audio.update(t0 + Duration::from_secs(3));
        audio.stop_immediate();
        assert!(!audio.is_playing());
    }

    #[cfg(feature = "live")]
    #[test]
    fn test_envelope_shape() {
        // Attack ramps from the edge level toward full.
        assert!(envelope(true, 0.0, 0.0) < 0.01);
        assert!((envelope(true, ATTACK, 0.0) - 1.0).abs() < 0.05);
        // Decay settles on the sustain level.
        assert!((envelope(true, ATTACK + DECAY + 1.0, 0.0) - SUSTAIN).abs() < 0.001);
        // Release fades from wherever the gate dropped.
        assert!((envelope(false, 0.0, SUSTAIN) - SUSTAIN).abs() < 0.001);
        assert_eq!(envelope(false, RELEASE + 0.1, SUSTAIN), 0.0);
    }
}
