use super::bindings::{self, Action};
use super::config::Bindings;
use super::widgets::{HistoryWidget, NoteColumnWidget, StatusWidget, WheelWidget};
use crate::audio::{Audio, Timbre};
use crate::session::{INTERACTIVE_SLOTS, SLOT_COUNT, Session};
use crate::solfege::{Note, cent_to_frequency};
use crate::store::{FileStore, KvStore, MemoryStore};
use crate::wheel::{self, WheelOptions, WheelSelector};
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
};
use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

const WHEEL_ANIMATION: Duration = Duration::from_millis(200);
const SUSTAIN: Duration = Duration::from_secs(2);
const TIMBRE_KEY: &str = "timbre";

struct App {
    session: Rc<RefCell<Session>>,
    audio: Rc<RefCell<Audio>>,
    store: Rc<RefCell<dyn KvStore>>,
    wheels: Rc<RefCell<Vec<WheelSelector>>>,
    wheel_areas: [Rect; SLOT_COUNT],
    drag_slot: Option<usize>,
    bindings: Bindings,
    audio_tried: bool,
    message: Option<String>,
    should_quit: bool,
    dirty: Rc<Cell<bool>>,
}

impl App {
    fn new() -> Self {
        let store: Rc<RefCell<dyn KvStore>> = match FileStore::open_default() {
            Some(file_store) => Rc::new(RefCell::new(file_store)),
            None => Rc::new(RefCell::new(MemoryStore::new())),
        };

        let session = Rc::new(RefCell::new(Session::new(Box::new(Rc::clone(&store)))));

        let mut audio = Audio::new();
        if let Some(id) = store.borrow().get(TIMBRE_KEY) {
            if let Some(timbre) = Timbre::from_id(&id) {
                audio.set_timbre(timbre);
            }
        }
        let audio = Rc::new(RefCell::new(audio));

        let dirty = Rc::new(Cell::new(true));
        let dirty_flag = Rc::clone(&dirty);
        session.borrow_mut().subscribe(move |_view| dirty_flag.set(true));

        let wheels = Rc::new(RefCell::new(Vec::with_capacity(SLOT_COUNT)));
        for slot in 0..SLOT_COUNT {
            let wheel = build_wheel(slot, &session, &audio);
            wheels.borrow_mut().push(wheel);
        }

        Self {
            session,
            audio,
            store,
            wheels,
            wheel_areas: [Rect::default(); SLOT_COUNT],
            drag_slot: None,
            bindings: Bindings::load(),
            audio_tried: false,
            message: None,
            should_quit: false,
            dirty,
        }
    }

    /// Advances to the next question, flying every wheel to its displaced
    /// target.
    fn next_question(&mut self) {
        let wheels = Rc::clone(&self.wheels);
        self.session.borrow_mut().go_to_next(Some(&mut move |targets| {
            let now = Instant::now();
            let mut wheels = wheels.borrow_mut();
            targets
                .iter()
                .zip(wheels.iter_mut())
                .map(|(&target, wheel)| wheel.animate_to(target, WHEEL_ANIMATION, now))
                .collect()
        }));
        self.sync_wheel_colors();
        self.dirty.set(true);
    }

    fn sync_wheel_colors(&mut self) {
        let relatives = self.session.borrow().relative_indexes();
        let mut wheels = self.wheels.borrow_mut();
        for (slot, wheel) in wheels.iter_mut().enumerate() {
            wheel.set_color(Note::from_relative(relatives[slot]).solfege.color);
        }
    }

    fn notice_gesture(&mut self) {
        if self.audio_tried {
            return;
        }
        self.audio_tried = true;
        self.try_init_audio(false);
    }

    fn try_init_audio(&mut self, announce: bool) {
        let ok = self.audio.borrow_mut().initialize();
        if ok {
            if announce {
                self.message = Some("Audio ready".into());
            }
        } else {
            self.message = Some("Audio unavailable (i retries)".into());
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        self.message = None;

        let Some(action) = bindings::lookup(&self.bindings.normal, code) else {
            return;
        };
        self.dirty.set(true);
        match action {
            Action::Quit => self.should_quit = true,
            Action::Confirm => {
                let did_answer = self.session.borrow().did_answer();
                if did_answer {
                    self.audio.borrow_mut().stop_immediate();
                    self.next_question();
                } else {
                    let mut session = self.session.borrow_mut();
                    session.answer();
                    self.message = Some(if session.is_cleared() {
                        format!("Cleared (off by {})", session.total_difference())
                    } else {
                        format!("Off by {}", session.total_difference())
                    });
                }
            }
            Action::ToggleCent => self.session.borrow_mut().toggle_show_cents_in_answer(),
            Action::Difficulty(index) => {
                let mut session = self.session.borrow_mut();
                session.set_difficulty(index);
                self.message = Some(format!("Difficulty: {}", session.difficulty().name()));
            }
            Action::CycleTimbre => {
                let mut audio = self.audio.borrow_mut();
                let timbre = audio.timbre().next();
                audio.set_timbre(timbre);
                drop(audio);
                self.store.borrow_mut().set(TIMBRE_KEY, timbre.id());
                self.message = Some(format!("Timbre: {}", timbre.name()));
            }
            Action::InitAudio => self.try_init_audio(true),
            Action::ClearHistory => {
                self.session.borrow_mut().clear_last_differences();
                self.message = Some("History cleared".into());
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(slot) = self.wheel_at(mouse.column, mouse.row) {
                    self.drag_slot = Some(slot);
                    self.wheels.borrow_mut()[slot].drag_start(row_px(mouse.row), now);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(slot) = self.drag_slot {
                    self.wheels.borrow_mut()[slot].drag_move(row_px(mouse.row), now);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(slot) = self.drag_slot.take() {
                    self.wheels.borrow_mut()[slot].drag_end();
                }
            }
            MouseEventKind::ScrollUp => {
                if let Some(slot) = self.wheel_at(mouse.column, mouse.row) {
                    self.wheels.borrow_mut()[slot].scroll(-wheel::ITEM_EXTENT);
                }
            }
            MouseEventKind::ScrollDown => {
                if let Some(slot) = self.wheel_at(mouse.column, mouse.row) {
                    self.wheels.borrow_mut()[slot].scroll(wheel::ITEM_EXTENT);
                }
            }
            _ => {}
        }
    }

    fn wheel_at(&self, column: u16, row: u16) -> Option<usize> {
        // Only the interactive wheels take input; the reference wheel is
        // frozen anyway, this just spares the lookup.
        (0..INTERACTIVE_SLOTS).find(|&slot| {
            let area = self.wheel_areas[slot];
            column >= area.x
                && column < area.x + area.width
                && row >= area.y
                && row < area.y + area.height
        })
    }

    fn tick(&mut self, now: Instant) {
        {
            let mut wheels = self.wheels.borrow_mut();
            for wheel in wheels.iter_mut() {
                wheel.tick(now);
            }
        }
        self.session.borrow_mut().poll_transition();
        self.audio.borrow_mut().update(now);
    }

    fn in_motion(&self) -> bool {
        self.wheels
            .borrow()
            .iter()
            .any(|wheel| wheel.is_dragging() || wheel.is_animating())
    }

    fn ui(&mut self, f: &mut Frame) {
        let view = self.session.borrow().view();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(18)])
            .split(chunks[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); SLOT_COUNT])
            .split(main_chunks[0]);

        let wheels = self.wheels.borrow();
        for slot in 0..SLOT_COUNT {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Min(3)])
                .split(columns[slot]);

            f.render_widget(NoteColumnWidget::new(&view, slot), parts[0]);
            f.render_widget(WheelWidget::new(&wheels[slot]), parts[1]);
            self.wheel_areas[slot] = parts[1];
        }
        drop(wheels);

        f.render_widget(HistoryWidget::new(&view), main_chunks[1]);

        let audio = self.audio.borrow();
        let mut status = StatusWidget::new(&view, audio.timbre().name(), audio.is_initialized());
        if let Some(ref message) = self.message {
            status = status.message(message);
        }
        f.render_widget(status, chunks[1]);
    }
}

fn build_wheel(
    slot: usize,
    session: &Rc<RefCell<Session>>,
    audio: &Rc<RefCell<Audio>>,
) -> WheelSelector {
    let change_session = Rc::clone(session);
    let change_audio = Rc::clone(audio);
    let start_session = Rc::clone(session);
    let start_audio = Rc::clone(audio);

    WheelSelector::new(WheelOptions {
        color: Note::from_relative(crate::solfege::Relative::Do4).solfege.color,
        disabled: slot >= INTERACTIVE_SLOTS,
        on_change: Box::new(move |cent| {
            let mut session = change_session.borrow_mut();
            session.set_answer_cent(slot, cent);
            let audible = session.can_make_sound();
            let frequency = cent_to_frequency(cent as f32, session.do4_frequency());
            drop(session);
            if audible {
                let mut audio = change_audio.borrow_mut();
                if audio.is_initialized() {
                    audio.sustain_for(frequency, SUSTAIN, Instant::now());
                }
            }
        }),
        on_drag_start: Box::new(move || {
            let session = start_session.borrow();
            let audible = session.can_make_sound();
            let cent = session.answer_cents()[slot];
            let frequency = cent_to_frequency(cent as f32, session.do4_frequency());
            drop(session);
            if audible {
                let mut audio = start_audio.borrow_mut();
                if audio.is_initialized() {
                    audio.sustain_for(frequency, SUSTAIN, Instant::now());
                }
            }
        }),
        // The sustain deadline handles release.
        on_drag_end: Box::new(|| {}),
    })
}

fn row_px(row: u16) -> f32 {
    row as f32 * wheel::ITEM_EXTENT
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();
    app.next_question();

    loop {
        // Observers mark the session dirty; wheels in motion redraw anyway.
        if app.dirty.replace(false) || app.in_motion() {
            terminal.draw(|f| app.ui(f))?;
        }

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    app.handle_key(key.code);
                    app.notice_gesture();
                }
                Event::Mouse(mouse) => {
                    app.notice_gesture();
                    app.handle_mouse(mouse);
                }
                Event::Resize(_, _) => app.dirty.set(true),
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}
