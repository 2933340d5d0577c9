//! App: terminal init, main loop, turn pacing, autosave and key handling.

use crate::Args;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use sandblast::snapshot::{self, save_path};
use sandblast::turn::TurnFrame;
use sandblast::{Config, Session, scoring};
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tachyonfx::Effect;

/// Render cadence while idle.
const FRAME_TIME: Duration = Duration::from_millis(16);
const AUTOSAVE_EVERY: Duration = Duration::from_secs(30);
/// Minimum gap before a score change triggers a save.
const PROGRESS_SAVE_GAP: Duration = Duration::from_secs(10);
const BANNER_TIME: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    args: Args,
    config: Config,
    theme: Theme,
    session: Session,
    rng: Pcg32,
    screen: Screen,
    paused: bool,
    /// Paused because a save was just restored.
    restored: bool,
    save_path: Option<PathBuf>,
    last_drop: Instant,
    last_save: Instant,
    /// Score, level and lines as of the last save.
    saved_progress: (u64, u32, u32),
    /// Turn frame on screen and when the next one may replace it.
    turn_frame: Option<TurnFrame>,
    turn_frame_until: Instant,
    /// TachyonFX fade for the flashing particles of `turn_frame`.
    flash_effect: Option<Effect>,
    flash_effect_process_time: Option<Instant>,
    banner: Option<(String, Instant)>,
}

impl App {
    pub fn new(args: Args, config: Config, theme: Theme) -> Result<Self> {
        let seed = args.seed.unwrap_or_else(rand::random);
        log::info!("seed {seed}");
        let mut rng = Pcg32::seed_from_u64(seed);
        let save_path = (!args.no_save).then(save_path);

        let (session, restored) = match &save_path {
            Some(path) => Session::restore_or_new(config.clone(), args.initial_level, path, SystemTime::now(), &mut rng)?,
            None => (Session::new(config.clone(), args.initial_level, &mut rng)?, false),
        };

        let now = Instant::now();
        let saved_progress = progress(&session);
        Ok(Self {
            args,
            config,
            theme,
            session,
            rng,
            screen: Screen::Playing,
            paused: restored,
            restored,
            save_path,
            last_drop: now,
            last_save: now,
            saved_progress,
            turn_frame: None,
            turn_frame_until: now,
            flash_effect: None,
            flash_effect_process_time: None,
            banner: None,
        })
    }

    fn reset_game(&mut self) -> Result<()> {
        self.session = Session::new(self.config.clone(), self.args.initial_level, &mut self.rng)?;
        self.screen = Screen::Playing;
        self.paused = false;
        self.restored = false;
        self.turn_frame = None;
        self.flash_effect = None;
        self.flash_effect_process_time = None;
        self.banner = None;
        let now = Instant::now();
        self.last_drop = now;
        self.last_save = now;
        self.saved_progress = progress(&self.session);
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            if self.banner.as_ref().is_some_and(|(_, at)| now.duration_since(*at) >= BANNER_TIME) {
                self.banner = None;
            }

            terminal.draw(|f| {
                let view = View {
                    session: &self.session,
                    theme: &self.theme,
                    turn_frame: self.turn_frame.as_ref(),
                    paused: self.paused,
                    restored: self.restored,
                    game_over: self.screen == Screen::GameOver,
                    banner: self.banner.as_ref().map(|(m, _)| m.as_str()),
                };
                ui::draw(f, &view, &mut self.flash_effect, &mut self.flash_effect_process_time, now);
            })?;

            let timeout = FRAME_TIME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind == KeyEventKind::Press && !self.handle_action(key_to_action(key))? {
                        return Ok(());
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.tick();
            }
        }
    }

    /// Returns `false` when the app should exit.
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match (self.screen, action) {
            (_, Action::Quit) => {
                self.quit();
                return Ok(false);
            }
            (Screen::GameOver, Action::Restart) => self.reset_game()?,
            (Screen::Playing, Action::Pause) => {
                self.paused = !self.paused;
                self.restored = false;
                if self.paused {
                    self.save();
                }
            }
            (Screen::Playing, _) if !self.paused => {
                let applied = action.command().is_some_and(|c| self.session.apply(c));
                if applied && self.session.is_simulating() {
                    self.last_drop = Instant::now();
                }
            }
            _ => {}
        }
        Ok(true)
    }

    /// One step of play: turn pacing, auto-drop, autosave.
    fn tick(&mut self) {
        let now = Instant::now();
        if self.session.is_simulating() {
            self.pace_turn(now);
            return;
        }
        self.turn_frame = None;

        if now.duration_since(self.last_drop) >= scoring::drop_interval(self.session.level()) {
            self.session.soft_drop();
            self.last_drop = now;
        }
        if now.duration_since(self.last_save) >= AUTOSAVE_EVERY {
            self.save();
        }
    }

    /// Show turn frames one by one, each for its hold time.
    fn pace_turn(&mut self, now: Instant) {
        if self.args.no_animation {
            self.session.complete_turn(&mut self.rng);
            if let Some(last) = self.session.messages().last() {
                self.banner = Some((last.clone(), now));
            }
            self.turn_ended(now);
            return;
        }
        if now < self.turn_frame_until {
            return;
        }
        match self.session.advance(&mut self.rng) {
            Some(frame) => {
                self.turn_frame_until = now + frame.hold(&self.config);
                if let TurnFrame::Clear { message: Some(m), .. } = &frame {
                    self.banner = Some((m.clone(), now));
                }
                if !frame.highlighted().is_empty() {
                    self.flash_effect = None;
                    self.flash_effect_process_time = None;
                }
                self.turn_frame = Some(frame);
            }
            None => self.turn_ended(now),
        }
    }

    fn turn_ended(&mut self, now: Instant) {
        self.turn_frame = None;
        self.flash_effect = None;
        self.last_drop = now;
        if self.session.is_game_over() {
            self.screen = Screen::GameOver;
            if let Some(Err(e)) = self.save_path.as_deref().map(snapshot::remove) {
                log::warn!("could not delete save: {e}");
            }
            return;
        }
        if progress_save_due(self.saved_progress, progress(&self.session), now.duration_since(self.last_save)) {
            self.save();
        }
    }

    fn save(&mut self) {
        self.last_save = Instant::now();
        self.saved_progress = progress(&self.session);
        let Some(path) = &self.save_path else {
            return;
        };
        let Some(snap) = self.session.snapshot(SystemTime::now()) else {
            return;
        };
        match snapshot::store(path, &snap) {
            Ok(()) => log::debug!("saved to {}", path.display()),
            Err(e) => log::warn!("save failed: {e}"),
        }
    }

    /// Finish any running turn so the save reflects a resting grid.
    fn quit(&mut self) {
        if self.session.is_simulating() {
            self.session.complete_turn(&mut self.rng);
            self.turn_ended(Instant::now());
        }
        if self.screen == Screen::Playing {
            self.save();
        }
    }
}

fn progress(session: &Session) -> (u64, u32, u32) {
    (session.score(), session.level(), session.lines_cleared())
}

/// A finished turn that moved score, level or lines is saved, at most once per gap.
fn progress_save_due(saved: (u64, u32, u32), current: (u64, u32, u32), since_save: Duration) -> bool {
    saved != current && since_save > PROGRESS_SAVE_GAP
}
