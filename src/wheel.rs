use std::time::{Duration, Instant};

pub const ITEM_COUNT: i32 = 3501;
pub const ITEM_EXTENT: f32 = 15.0;
pub const CENTER_INDEX: i32 = 1750;
pub const MIN_CENT: i32 = -1750;
pub const MAX_CENT: i32 = 1750;

pub fn index_to_cent(index: i32) -> i32 {
    index - CENTER_INDEX
}

pub fn cent_to_index(cent: i32) -> i32 {
    cent + CENTER_INDEX
}

// Momentum constants are tuned values; changing them changes the feel.
const FRICTION: f32 = 0.95;
const MIN_VELOCITY: f32 = 0.01;
const MOMENTUM_THRESHOLD: f32 = 0.1;
const VELOCITY_TO_INDEX: f32 = 10.0;
const SCROLL_STEP: f32 = 50.0;

pub struct WheelOptions {
    pub color: (u8, u8, u8),
    pub disabled: bool,
    pub on_change: Box<dyn FnMut(i32)>,
    pub on_drag_start: Box<dyn FnMut()>,
    pub on_drag_end: Box<dyn FnMut()>,
}

impl Default for WheelOptions {
    fn default() -> Self {
        Self {
            color: (59, 130, 246),
            disabled: false,
            on_change: Box::new(|_| {}),
            on_drag_start: Box::new(|| {}),
            on_drag_end: Box::new(|| {}),
        }
    }
}

enum Motion {
    Idle,
    Dragging {
        start_y: f32,
        start_index: i32,
        last_y: f32,
        last_time: Instant,
        velocity: f32,
    },
    Momentum {
        velocity: f32,
    },
    Easing {
        start_index: i32,
        target_index: i32,
        started: Instant,
        duration: Duration,
        done: flume::Sender<()>,
    },
}

/// Vertical wheel selector over the cent range. Input arrives as pixel-space
/// drag coordinates and discrete scroll deltas; animation and momentum are
/// advanced cooperatively by `tick`, once per frame.
///
/// Replacing the current motion drops any pending completion sender, so a
/// superseded `animate_to` receiver disconnects without ever completing.
pub struct WheelSelector {
    index: i32,
    color: (u8, u8, u8),
    disabled: bool,
    motion: Motion,
    on_change: Box<dyn FnMut(i32)>,
    on_drag_start: Box<dyn FnMut()>,
    on_drag_end: Box<dyn FnMut()>,
}

impl WheelSelector {
    pub fn new(options: WheelOptions) -> Self {
        Self {
            index: CENTER_INDEX,
            color: options.color,
            disabled: options.disabled,
            motion: Motion::Idle,
            on_change: options.on_change,
            on_drag_start: options.on_drag_start,
            on_drag_end: options.on_drag_end,
        }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn cent(&self) -> i32 {
        index_to_cent(self.index)
    }

    pub fn set_cent(&mut self, cent: i32) {
        self.apply_index(cent_to_index(cent));
        let cent = self.cent();
        (self.on_change)(cent);
    }

    pub fn color(&self) -> (u8, u8, u8) {
        self.color
    }

    pub fn set_color(&mut self, color: (u8, u8, u8)) {
        self.color = color;
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.motion, Motion::Dragging { .. })
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.motion, Motion::Momentum { .. } | Motion::Easing { .. })
    }

    pub fn drag_start(&mut self, y: f32, now: Instant) {
        if self.disabled {
            return;
        }
        // Replaces any in-flight animation or momentum.
        self.motion = Motion::Dragging {
            start_y: y,
            start_index: self.index,
            last_y: y,
            last_time: now,
            velocity: 0.0,
        };
        (self.on_drag_start)();
    }

    pub fn drag_move(&mut self, y: f32, now: Instant) {
        let new_index = match &mut self.motion {
            Motion::Dragging {
                start_y,
                start_index,
                last_y,
                last_time,
                velocity,
            } => {
                let delta_index = ((y - *start_y) / ITEM_EXTENT).round() as i32;
                let dt_ms = now.duration_since(*last_time).as_secs_f32() * 1000.0;
                if dt_ms > 0.0 {
                    *velocity = (y - *last_y) / dt_ms;
                }
                *last_y = y;
                *last_time = now;
                // Dragging down moves the pitch down.
                *start_index - delta_index
            }
            _ => return,
        };
        if self.apply_index(new_index) {
            let cent = self.cent();
            (self.on_change)(cent);
        }
    }

    pub fn drag_end(&mut self) {
        let velocity = match &self.motion {
            Motion::Dragging { velocity, .. } => *velocity,
            _ => return,
        };
        (self.on_drag_end)();
        if velocity.abs() > MOMENTUM_THRESHOLD {
            self.motion = Motion::Momentum { velocity };
        } else {
            self.motion = Motion::Idle;
        }
    }

    /// Discrete wheel/scroll input, applied immediately without animation.
    pub fn scroll(&mut self, delta_y: f32) {
        if self.disabled || delta_y == 0.0 {
            return;
        }
        let delta = delta_y.signum() as i32 * (delta_y.abs() / SCROLL_STEP).ceil() as i32;
        if self.apply_index(self.index + delta) {
            let cent = self.cent();
            (self.on_change)(cent);
        }
    }

    /// Starts an eased move to `target_index`, cancelling any prior animation
    /// or momentum. The returned receiver yields one unit on completion; if
    /// the animation is superseded the receiver disconnects instead.
    pub fn animate_to(
        &mut self,
        target_index: i32,
        duration: Duration,
        now: Instant,
    ) -> flume::Receiver<()> {
        let (done, completion) = flume::bounded(1);
        self.motion = Motion::Easing {
            start_index: self.index,
            target_index,
            started: now,
            duration,
            done,
        };
        completion
    }

    pub fn animate_to_cent(
        &mut self,
        cent: i32,
        duration: Duration,
        now: Instant,
    ) -> flume::Receiver<()> {
        self.animate_to(cent_to_index(cent), duration, now)
    }

    /// Advances momentum decay or an eased animation by one frame.
    pub fn tick(&mut self, now: Instant) {
        match std::mem::replace(&mut self.motion, Motion::Idle) {
            Motion::Momentum { mut velocity } => {
                velocity *= FRICTION;
                if velocity.abs() < MIN_VELOCITY {
                    return;
                }
                let delta = (velocity * VELOCITY_TO_INDEX).round() as i32;
                if delta != 0 && self.apply_index(self.index - delta) {
                    let cent = self.cent();
                    (self.on_change)(cent);
                }
                self.motion = Motion::Momentum { velocity };
            }
            Motion::Easing {
                start_index,
                target_index,
                started,
                duration,
                done,
            } => {
                let elapsed = now.saturating_duration_since(started);
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    (elapsed.as_secs_f32() / duration.as_secs_f32()).min(1.0)
                };
                let eased = ease_in_out(progress);
                let distance = (target_index - start_index) as f32;
                self.apply_index(start_index + (distance * eased).round() as i32);
                if progress >= 1.0 {
                    let cent = self.cent();
                    (self.on_change)(cent);
                    let _ = done.send(());
                } else {
                    self.motion = Motion::Easing {
                        start_index,
                        target_index,
                        started,
                        duration,
                        done,
                    };
                }
            }
            other => self.motion = other,
        }
    }

    // Single clamp point for every index mutation.
    fn apply_index(&mut self, index: i32) -> bool {
        let clamped = index.clamp(0, ITEM_COUNT - 1);
        if clamped != self.index {
            self.index = clamped;
            true
        } else {
            false
        }
    }
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}
