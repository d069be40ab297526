use crate::logging;
use crate::models::{Action, Chapter, DisplayMode, KeyToken, ReadingPosition};
use crate::settings::KeyBindings;
use crate::ui::decoy::{DecoyScreen, DecoySelector, EntropySelector};
use crate::ui::terminal::{self, InputGuard};
use chrono::Utc;
use eyre::Result;
use std::io::Write;
use std::sync::mpsc;
use std::thread::JoinHandle;

const MAX_LIST_INPUT: usize = 6;
const LIST_TITLE_WIDTH: usize = 40;

/// Position-save callback. Runs on the save worker thread once the
/// session has started.
pub type PersistFn = Box<dyn Fn(&ReadingPosition) -> Result<()> + Send>;

/// What the session hands back when the reader exits.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub chapter_title: String,
    pub chapter_index: usize,
}

/// Rendering knobs, frozen at construction.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub clear_on_navigate: bool,
    pub chapters_per_page: usize,
    pub lines_per_page: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let settings = crate::settings::ReadingSettings::default();
        Self {
            clear_on_navigate: settings.clear_on_navigate,
            chapters_per_page: settings.chapters_per_page,
            lines_per_page: settings.lines_per_page,
        }
    }
}

impl From<&crate::settings::ReadingSettings> for RenderOptions {
    fn from(settings: &crate::settings::ReadingSettings) -> Self {
        Self {
            clear_on_navigate: settings.clear_on_navigate,
            chapters_per_page: settings.chapters_per_page,
            lines_per_page: settings.lines_per_page,
        }
    }
}

/// The interactive reading state machine. Owns the terminal exclusively
/// between `start()` and exit; everything it prints goes through the
/// generic writer so tests can capture output.
pub struct ReadingSession<W: Write> {
    document_id: String,
    chapters: Vec<Chapter>,
    current: usize,
    mode: DisplayMode,
    bindings: KeyBindings,
    options: RenderOptions,
    out: W,

    /// Callback until the save worker takes it over.
    persist: Option<PersistFn>,
    save_tx: Option<mpsc::Sender<ReadingPosition>>,
    save_worker: Option<JoinHandle<()>>,

    list_page: usize,
    list_input: String,
    list_error: Option<String>,
    pending_confirm: Option<usize>,

    /// The last screen emitted outside privacy mode, restored verbatim
    /// when the privacy overlay is dismissed.
    last_screen: String,
    prior_mode: DisplayMode,
    decoys: Box<dyn DecoySelector>,

    on_exit: Option<Box<dyn FnOnce(&SessionOutcome)>>,
}

impl<W: Write> ReadingSession<W> {
    pub fn new(
        document_id: impl Into<String>,
        chapters: Vec<Chapter>,
        start_index: usize,
        persist: PersistFn,
        bindings: KeyBindings,
        mut options: RenderOptions,
        out: W,
    ) -> Self {
        options.chapters_per_page = options.chapters_per_page.max(1);
        options.lines_per_page = options.lines_per_page.max(1);
        let chapters = if chapters.is_empty() {
            vec![Chapter {
                title: crate::parser::WHOLE_DOCUMENT_TITLE.to_string(),
                content: String::new(),
                start_offset: 0,
                end_offset: 0,
            }]
        } else {
            chapters
        };
        let current = start_index.min(chapters.len() - 1);
        Self {
            document_id: document_id.into(),
            chapters,
            current,
            mode: DisplayMode::Reading,
            bindings,
            options,
            out,
            persist: Some(persist),
            save_tx: None,
            save_worker: None,
            list_page: 0,
            list_input: String::new(),
            list_error: None,
            pending_confirm: None,
            last_screen: String::new(),
            prior_mode: DisplayMode::Reading,
            decoys: Box::new(EntropySelector::new()),
            on_exit: None,
        }
    }

    /// Replace the pseudo-random decoy selector, mainly for tests.
    pub fn with_decoy_selector(mut self, selector: Box<dyn DecoySelector>) -> Self {
        self.decoys = selector;
        self
    }

    pub fn set_on_exit(&mut self, hook: Box<dyn FnOnce(&SessionOutcome)>) {
        self.on_exit = Some(hook);
    }

    pub fn current_chapter_index(&self) -> usize {
        self.current
    }

    /// Enter interactive mode. Blocks until the user exits, then returns
    /// the final position. Failing to acquire raw mode is fatal; nothing
    /// else in the loop is.
    pub fn start(&mut self) -> Result<SessionOutcome> {
        let guard = InputGuard::acquire()?;
        self.spawn_save_worker();
        self.render_reading()?;

        loop {
            let token = terminal::read_token()?;
            if self.handle_token(&token) {
                break;
            }
        }

        drop(guard);
        self.finish()
    }

    /// Feed one key token through the state machine. Returns `true` when
    /// the session should exit. Internal errors never escape; they are
    /// reported inline and the session keeps running.
    pub fn handle_token(&mut self, token: &KeyToken) -> bool {
        match self.step(token) {
            Ok(exit) => exit,
            Err(err) => {
                logging::error(format!("render failed: {err}"));
                let _ = write!(self.out, "\r\n[display error: {err}]\r\n");
                let _ = self.out.flush();
                false
            }
        }
    }

    fn step(&mut self, token: &KeyToken) -> Result<bool> {
        let action = self.bindings.resolve(token);
        match self.mode {
            DisplayMode::Privacy => {
                if action == Some(Action::PrivacyToggle) {
                    self.leave_privacy()?;
                }
                Ok(false)
            }
            DisplayMode::Help => {
                self.mode = DisplayMode::Reading;
                self.render_reading()?;
                Ok(false)
            }
            DisplayMode::Reading => self.step_reading(action),
            DisplayMode::ChapterList => self.step_chapter_list(action, token),
        }
    }

    fn step_reading(&mut self, action: Option<Action>) -> Result<bool> {
        match action {
            Some(Action::Exit) => return Ok(true),
            Some(Action::PreviousChapter) => self.navigate(-1)?,
            Some(Action::NextChapter) => self.navigate(1)?,
            Some(Action::Help) => {
                self.mode = DisplayMode::Help;
                self.render_help()?;
            }
            Some(Action::ChapterList) => self.enter_chapter_list()?,
            Some(Action::ResetPosition) => self.render_reading()?,
            Some(Action::ScrollToEnd) => self.render_reading_tail()?,
            Some(Action::PrivacyToggle) => self.enter_privacy()?,
            // Unbound keys are silent in reading mode.
            None => {}
        }
        Ok(false)
    }

    /// Move by whole chapters. Boundary hits are silent no-ops: no
    /// render, no persistence.
    fn navigate(&mut self, delta: isize) -> Result<()> {
        let target = self.current as isize + delta;
        if target < 0 || target >= self.chapters.len() as isize {
            return Ok(());
        }
        self.current = target as usize;
        self.render_reading()?;
        self.queue_save();
        Ok(())
    }

    fn enter_chapter_list(&mut self) -> Result<()> {
        self.mode = DisplayMode::ChapterList;
        self.list_page = self.current / self.options.chapters_per_page;
        self.list_input.clear();
        self.list_error = None;
        self.pending_confirm = None;
        self.render_list()
    }

    fn step_chapter_list(&mut self, action: Option<Action>, token: &KeyToken) -> Result<bool> {
        if let Some(target) = self.pending_confirm.take() {
            match token {
                KeyToken::Named("enter") | KeyToken::Char('y') | KeyToken::Char('Y') => {
                    self.jump_to(target)?;
                }
                _ => self.render_list()?,
            }
            return Ok(false);
        }

        // Only a subset of actions is honored inside the list; tokens
        // bound to anything else (like the digits on chapter navigation)
        // fall through to the literal input handling below.
        match action {
            Some(Action::Exit) => return Ok(true),
            Some(Action::Help) => {
                self.mode = DisplayMode::Reading;
                self.render_reading()?;
                return Ok(false);
            }
            Some(Action::ResetPosition) => {
                self.list_error = None;
                self.render_list()?;
                return Ok(false);
            }
            Some(Action::PrivacyToggle) => {
                self.enter_privacy()?;
                return Ok(false);
            }
            _ => {}
        }

        match token {
            KeyToken::Char(c) if c.is_ascii_digit() => {
                if self.list_input.len() < MAX_LIST_INPUT {
                    self.list_input.push(*c);
                }
                self.render_list()?;
            }
            KeyToken::Char('j') | KeyToken::Char('J') if self.list_input.is_empty() => {
                self.list_input.push('j');
                self.render_list()?;
            }
            KeyToken::Named("backspace") => {
                self.list_input.pop();
                self.render_list()?;
            }
            KeyToken::Named("enter") => self.commit_list_input()?,
            KeyToken::Named("right") | KeyToken::Named("pagedown") | KeyToken::Char('.') => {
                let last_page = self.page_count().saturating_sub(1);
                self.list_page = (self.list_page + 1).min(last_page);
                self.list_error = None;
                self.render_list()?;
            }
            KeyToken::Named("left") | KeyToken::Named("pageup") | KeyToken::Char(',') => {
                self.list_page = self.list_page.saturating_sub(1);
                self.list_error = None;
                self.render_list()?;
            }
            _ => {}
        }
        Ok(false)
    }

    fn commit_list_input(&mut self) -> Result<()> {
        let input = std::mem::take(&mut self.list_input);
        if input.is_empty() {
            return self.render_list();
        }

        let (direct_jump, digits) = match input.strip_prefix('j') {
            Some(rest) => (true, rest),
            None => (false, input.as_str()),
        };

        let number = match digits.parse::<usize>() {
            Ok(n) if (1..=self.chapters.len()).contains(&n) => n,
            _ => {
                self.list_error = Some(format!("invalid chapter: {input}"));
                return self.render_list();
            }
        };
        let index = number - 1;

        if direct_jump {
            return self.jump_to(index);
        }

        let page = index / self.options.chapters_per_page;
        if page == self.list_page {
            // Already visible: ask before dropping straight into reading.
            self.pending_confirm = Some(index);
        } else {
            self.list_page = page;
        }
        self.render_list()
    }

    /// Leave the list and read the given chapter from its top. Persists
    /// only when the index actually changed.
    fn jump_to(&mut self, index: usize) -> Result<()> {
        self.mode = DisplayMode::Reading;
        let changed = index != self.current;
        self.current = index;
        self.render_reading()?;
        if changed {
            self.queue_save();
        }
        Ok(())
    }

    fn enter_privacy(&mut self) -> Result<()> {
        self.prior_mode = self.mode;
        self.mode = DisplayMode::Privacy;
        let choice = self.decoys.pick(DecoyScreen::ALL.len());
        let body = DecoyScreen::ALL[choice].body().to_string();
        self.emit(&body, true, false)
    }

    fn leave_privacy(&mut self) -> Result<()> {
        self.mode = self.prior_mode;
        let screen = self.last_screen.clone();
        self.emit(&screen, true, false)
    }

    /// Issue a position save without waiting for it. With a running
    /// worker this is a channel send; before `start()` the callback runs
    /// inline. Failures are logged and swallowed either way.
    fn queue_save(&mut self) {
        let position = ReadingPosition {
            file_name: self.document_id.clone(),
            chapter_title: self.chapters[self.current].title.clone(),
            chapter_index: self.current,
            timestamp: Utc::now(),
        };
        if let Some(tx) = &self.save_tx {
            if tx.send(position).is_err() {
                logging::warn("save worker is gone; position not recorded");
            }
        } else if let Some(persist) = &self.persist
            && let Err(err) = persist(&position)
        {
            logging::warn(format!("could not save reading position: {err}"));
        }
    }

    fn spawn_save_worker(&mut self) {
        let Some(persist) = self.persist.take() else {
            return;
        };
        let (tx, rx) = mpsc::channel::<ReadingPosition>();
        self.save_tx = Some(tx);
        self.save_worker = Some(std::thread::spawn(move || {
            for position in rx {
                if let Err(err) = persist(&position) {
                    logging::warn(format!("could not save reading position: {err}"));
                }
            }
        }));
    }

    /// Final persist, worker drain and exit hook. The session terminates
    /// whether or not the last save succeeds.
    fn finish(&mut self) -> Result<SessionOutcome> {
        let outcome = SessionOutcome {
            chapter_title: self.chapters[self.current].title.clone(),
            chapter_index: self.current,
        };

        self.queue_save();
        if let Some(tx) = self.save_tx.take() {
            drop(tx);
        }
        if let Some(worker) = self.save_worker.take() {
            let _ = worker.join();
        }

        let _ = write!(self.out, "\r\n");
        let _ = self.out.flush();

        if let Some(hook) = self.on_exit.take() {
            hook(&outcome);
        }
        Ok(outcome)
    }

    // ---- rendering ----------------------------------------------------

    fn emit(&mut self, screen: &str, clear: bool, remember: bool) -> Result<()> {
        if clear {
            terminal::clear_screen(&mut self.out)?;
        }
        // Raw mode does not translate line feeds; write explicit CRLF.
        for (i, line) in screen.split('\n').enumerate() {
            if i > 0 {
                self.out.write_all(b"\r\n")?;
            }
            self.out.write_all(line.as_bytes())?;
        }
        self.out.write_all(b"\r\n")?;
        self.out.flush()?;
        if remember {
            self.last_screen = screen.to_string();
        }
        Ok(())
    }

    fn text_width() -> usize {
        (terminal::terminal_size().0 as usize).clamp(40, 120)
    }

    fn compose_reading(&self) -> String {
        let chapter = &self.chapters[self.current];
        let width = Self::text_width();
        let mut lines: Vec<String> = vec![
            format!("===== {} =====", self.document_id),
            format!(
                "Chapter: {} ({}/{})",
                chapter.title,
                self.current + 1,
                self.chapters.len()
            ),
            String::new(),
        ];
        for raw in chapter.content.split('\n') {
            if raw.is_empty() {
                lines.push(String::new());
            } else {
                for wrapped in textwrap::wrap(raw, width) {
                    lines.push(wrapped.into_owned());
                }
            }
        }
        lines.push(String::new());
        lines.push(self.compose_footer());
        lines.join("\n")
    }

    fn compose_footer(&self) -> String {
        let parts: Vec<String> = Action::PRIORITY
            .iter()
            .map(|action| {
                format!(
                    "{}={}",
                    self.bindings.tokens_for(*action).join("/"),
                    action.label()
                )
            })
            .collect();
        format!("----- {} -----", parts.join("  "))
    }

    fn render_reading(&mut self) -> Result<()> {
        let screen = self.compose_reading();
        self.emit(&screen, self.options.clear_on_navigate, true)
    }

    /// Cosmetic viewport jump to the chapter tail: re-emit only as many
    /// trailing lines as fit one screen. No state changes.
    fn render_reading_tail(&mut self) -> Result<()> {
        let screen = self.compose_reading();
        let rows = (terminal::terminal_size().1 as usize)
            .saturating_sub(1)
            .max(self.options.lines_per_page);
        let lines: Vec<&str> = screen.split('\n').collect();
        let tail_start = lines.len().saturating_sub(rows);
        let tail = lines[tail_start..].join("\n");
        self.emit(&tail, true, true)
    }

    fn render_help(&mut self) -> Result<()> {
        let mut lines = vec!["===== reader help =====".to_string(), String::new()];
        let descriptions = [
            (Action::Exit, "leave the reader and save progress"),
            (Action::PreviousChapter, "go to the previous chapter"),
            (Action::NextChapter, "go to the next chapter"),
            (Action::Help, "show this help"),
            (Action::ResetPosition, "jump back to the chapter top"),
            (Action::ChapterList, "open the chapter list"),
            (Action::PrivacyToggle, "switch to the privacy screen"),
            (Action::ScrollToEnd, "jump to the chapter end"),
        ];
        for (action, text) in descriptions {
            lines.push(format!(
                "  {:<18} {}",
                self.bindings.tokens_for(action).join(", "),
                text
            ));
        }
        lines.push(String::new());
        lines.push("Progress is saved after every chapter change.".to_string());
        lines.push(String::new());
        lines.push("Press any key to return to reading...".to_string());
        self.emit(&lines.join("\n"), true, true)
    }

    fn page_count(&self) -> usize {
        self.chapters.len().div_ceil(self.options.chapters_per_page)
    }

    fn render_list(&mut self) -> Result<()> {
        let per_page = self.options.chapters_per_page;
        let start = self.list_page * per_page;
        let end = (start + per_page).min(self.chapters.len());

        let mut lines = vec![
            format!("===== {} - chapters =====", self.document_id),
            String::new(),
        ];
        for (index, chapter) in self.chapters[start..end].iter().enumerate() {
            let global = start + index;
            let marker = if global == self.current { '►' } else { ' ' };
            let title: String = if chapter.title.chars().count() > LIST_TITLE_WIDTH {
                let prefix: String = chapter.title.chars().take(LIST_TITLE_WIDTH - 3).collect();
                format!("{prefix}...")
            } else {
                chapter.title.clone()
            };
            lines.push(format!("{marker} {:>4}. {title}", global + 1));
        }
        lines.push(String::new());
        lines.push(format!(
            "Page {}/{} ({} chapters)",
            self.list_page + 1,
            self.page_count(),
            self.chapters.len()
        ));

        if let Some(target) = self.pending_confirm {
            lines.push(format!(
                "Open chapter {}? enter/y to confirm, any other key to stay",
                target + 1
            ));
        } else if let Some(error) = &self.list_error {
            lines.push(format!("! {error}"));
        }
        if !self.list_input.is_empty() {
            lines.push(format!("> {}", self.list_input));
        }
        lines.push(
            "number+enter=go to chapter  j<number>+enter=open directly  ,/.=page".to_string(),
        );
        self.emit(&lines.join("\n"), true, true)
    }
}
