use crate::{
    add_native_word,
    lang::tokenizing::strip_quotes,
    runtime::{data_structures::bounded_stack::StackStatus, error, interpreter::Interpreter},
};
use lazy_static::lazy_static;
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};
use tracing::{debug, info};

/// The most controls a screen can hold at once.
pub const MAX_WIDGETS: usize = 10;

const fn rgb565(red: u16, green: u16, blue: u16) -> u16 {
    ((red >> 3) << 11) | ((green >> 2) << 5) | (blue >> 3)
}

lazy_static! {
    /// Colours picked by index from scripts: black, white, red, green, blue, yellow, magenta,
    /// orange, cyan, gray, silver and gold.
    static ref COLOUR_TABLE: [u16; 12] = [
        rgb565(0x00, 0x00, 0x00),
        rgb565(0xff, 0xff, 0xff),
        rgb565(0xff, 0x00, 0x00),
        rgb565(0x00, 0xff, 0x00),
        rgb565(0x00, 0x00, 0xff),
        rgb565(0xff, 0xff, 0x00),
        rgb565(0xff, 0x00, 0xff),
        rgb565(0xff, 0x99, 0x00),
        rgb565(0x00, 0xff, 0xff),
        rgb565(0x80, 0x80, 0x40),
        rgb565(0xa0, 0xa0, 0x80),
        rgb565(0xa0, 0xa0, 0x40),
    ];
}

/// Look up a colour by its index, unknown indices are black.
pub fn colour_value(index: i32) -> u16 {
    usize::try_from(index)
        .ok()
        .and_then(|index| COLOUR_TABLE.get(index))
        .copied()
        .unwrap_or(COLOUR_TABLE[0])
}

/// Where the next piece of printed text goes once `SET_ST_TXT` or `SET_BMP` has run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextTarget {
    StaticText(i32),
    Bitmap(i32),

    /// The control id was missing, the text is dropped.
    Discard,
}

/// A button press waiting to be handled by the main loop.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GuiEvent {
    pub id: i32,
    pub callback: String,
}

impl GuiEvent {
    pub fn new(id: i32, callback: &str) -> GuiEvent {
        GuiEvent {
            id,
            callback: callback.to_string(),
        }
    }
}

/// A word run periodically between lines and between main loop events.
#[derive(Clone, Debug)]
struct Ticker {
    word: String,
    period: Duration,
    next_due: Instant,
}

/// The state the GUI words share with each other and with the interpreter's loops.
#[derive(Default)]
pub struct GuiState {
    /// Set by `EXIT_ML` to end the main loop after the current event.
    pub exit_main_loop: bool,

    text_target: Option<TextTarget>,
    ticker: Option<Ticker>,
}

impl GuiState {
    pub fn set_text_target(&mut self, target: TextTarget) {
        self.text_target = Some(target);
    }

    /// Take the pending text target, the text after it goes back to the output.
    pub fn take_text_target(&mut self) -> Option<TextTarget> {
        self.text_target.take()
    }

    /// Attach a ticker, replacing any existing one.  It first comes due one period from now.
    pub fn attach_ticker(&mut self, word: &str, period: Duration, now: Instant) {
        self.ticker = Some(Ticker {
            word: word.to_string(),
            period,
            next_due: now + period,
        });
    }

    pub fn detach_ticker(&mut self) {
        self.ticker = None;
    }

    /// If the ticker has come due, schedule its next run and return the word to run now.
    pub fn ticker_due(&mut self, now: Instant) -> Option<String> {
        let ticker = self.ticker.as_mut()?;

        if now < ticker.next_due {
            return None;
        }

        ticker.next_due = now + ticker.period;
        Some(ticker.word.clone())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WidgetKind {
    Button { label: String, callback: String },
    ProgressBar { volume: i32 },
    StaticText { text: String, foreground: u16, background: u16 },
    Bitmap { file: String },
}

/// A control on the screen.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Widget {
    pub id: i32,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn new(id: i32, name: &str, x: i32, y: i32, kind: WidgetKind) -> Widget {
        Widget {
            id,
            name: name.to_string(),
            x,
            y,
            kind,
        }
    }
}

/// The display and touch screen the GUI words drive.  The update methods return false if there is
/// no control of the right kind with the given id.
pub trait Gui {
    /// Add a control, fails if the id is taken or the screen is full.
    fn add_widget(&mut self, widget: Widget) -> bool;

    fn widget(&self, id: i32) -> Option<&Widget>;

    /// A negative volume leaves the bar as it is and redraws it.
    fn set_progress_bar(&mut self, id: i32, volume: i32) -> bool;

    fn set_static_text(&mut self, id: i32, text: &str) -> bool;

    fn set_static_text_colour(&mut self, id: i32, foreground: u16, background: u16) -> bool;

    fn set_bitmap(&mut self, id: i32, file: &str) -> bool;

    /// Draw every control.
    fn draw(&mut self);

    /// Remove every control.
    fn clear(&mut self);

    /// The next button press, if there is one.
    fn next_event(&mut self) -> Option<GuiEvent>;
}

/// A screen kept in memory.  Presses are queued with `touch` or `queue_event`.
#[derive(Default)]
pub struct HostGui {
    widgets: Vec<Widget>,
    events: VecDeque<GuiEvent>,
}

impl HostGui {
    pub fn new() -> HostGui {
        HostGui::default()
    }

    pub fn queue_event(&mut self, event: GuiEvent) {
        self.events.push_back(event);
    }

    /// Press a button, queueing its callback.  Returns false if the id isn't a button.
    pub fn touch(&mut self, id: i32) -> bool {
        match self.widget(id).map(|widget| &widget.kind) {
            Some(WidgetKind::Button { callback, .. }) => {
                let event = GuiEvent::new(id, callback);

                self.queue_event(event);
                true
            }

            _ => false,
        }
    }

    fn widget_mut(&mut self, id: i32) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|widget| widget.id == id)
    }
}

impl Gui for HostGui {
    fn add_widget(&mut self, widget: Widget) -> bool {
        if self.widgets.len() >= MAX_WIDGETS || self.widget(widget.id).is_some() {
            return false;
        }

        debug!(id = widget.id, name = %widget.name, "widget added");
        self.widgets.push(widget);
        true
    }

    fn widget(&self, id: i32) -> Option<&Widget> {
        self.widgets.iter().find(|widget| widget.id == id)
    }

    fn set_progress_bar(&mut self, id: i32, new_volume: i32) -> bool {
        match self.widget_mut(id).map(|widget| &mut widget.kind) {
            Some(WidgetKind::ProgressBar { volume }) => {
                if new_volume >= 0 {
                    *volume = new_volume;
                }

                true
            }

            _ => false,
        }
    }

    fn set_static_text(&mut self, id: i32, new_text: &str) -> bool {
        match self.widget_mut(id).map(|widget| &mut widget.kind) {
            Some(WidgetKind::StaticText { text, .. }) => {
                *text = new_text.to_string();
                true
            }

            _ => false,
        }
    }

    fn set_static_text_colour(&mut self, id: i32, new_foreground: u16, new_background: u16) -> bool {
        match self.widget_mut(id).map(|widget| &mut widget.kind) {
            Some(WidgetKind::StaticText {
                foreground,
                background,
                ..
            }) => {
                *foreground = new_foreground;
                *background = new_background;
                true
            }

            _ => false,
        }
    }

    fn set_bitmap(&mut self, id: i32, new_file: &str) -> bool {
        match self.widget_mut(id).map(|widget| &mut widget.kind) {
            Some(WidgetKind::Bitmap { file }) => {
                *file = new_file.to_string();
                true
            }

            _ => false,
        }
    }

    fn draw(&mut self) {
        for widget in &self.widgets {
            info!(id = widget.id, x = widget.x, y = widget.y, kind = ?widget.kind, "draw");
        }
    }

    fn clear(&mut self) {
        self.widgets.clear();
    }

    fn next_event(&mut self) -> Option<GuiEvent> {
        self.events.pop_front()
    }
}

/// Pop the values for a word, pushing false and reporting if there aren't enough.
fn pop_or_fail(interpreter: &mut dyn Interpreter, count: usize) -> Option<Vec<i32>> {
    let values = interpreter.pop_values(count);

    if values.is_none() {
        interpreter.write_output("Insufficient parameters\n");
        let _ = interpreter.push_flag(false);
    }

    values
}

/// Read a quoted string following the word.
fn quoted_argument(interpreter: &mut dyn Interpreter) -> Option<String> {
    let token = interpreter.next_token_quoted();

    (!token.is_empty()).then(|| strip_quotes(&token))
}

/// Add the control and push whether that worked.
fn add_and_report(interpreter: &mut dyn Interpreter, widget: Widget) {
    let added = interpreter.gui().add_widget(widget);

    if !added {
        interpreter.write_output("Could not add GUI element\n");
    }

    let _ = interpreter.push_flag(added);
}

fn report_update(interpreter: &mut dyn Interpreter, id: i32, updated: bool) {
    if !updated {
        interpreter.write_output(&format!("GUI element {} not found\n", id));
    }

    let _ = interpreter.push_flag(updated);
}

/// Create a button.  The word is followed by the quoted name and label and then the word to run
/// when the button is pressed.
///
/// Signature: `x y id -- flag`
fn word_create_button(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = pop_or_fail(interpreter, 3) else {
        return Ok(());
    };

    let name = quoted_argument(interpreter);
    let label = quoted_argument(interpreter);
    let callback = interpreter.next_token();

    match (name, label) {
        (Some(name), Some(label)) if !callback.is_empty() => {
            let widget = Widget::new(
                values[2],
                &name,
                values[0],
                values[1],
                WidgetKind::Button { label, callback },
            );

            add_and_report(interpreter, widget);
        }

        _ => {
            interpreter.write_output("Insufficient parameters\n");
            let _ = interpreter.push_flag(false);
        }
    }

    Ok(())
}

/// Signature: ` -- `
fn word_show(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.gui().draw();
    Ok(())
}

/// Create a progress bar, the quoted name follows the word.
///
/// Signature: `x y id -- flag`
fn word_create_progress_bar(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = pop_or_fail(interpreter, 3) else {
        return Ok(());
    };

    let Some(name) = quoted_argument(interpreter) else {
        interpreter.write_output("Insufficient parameters\n");
        let _ = interpreter.push_flag(false);
        return Ok(());
    };

    let widget = Widget::new(
        values[2],
        &name,
        values[0],
        values[1],
        WidgetKind::ProgressBar { volume: 0 },
    );

    add_and_report(interpreter, widget);
    Ok(())
}

/// Signature: `volume id -- flag`
fn word_set_progress_bar(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = pop_or_fail(interpreter, 2) else {
        return Ok(());
    };

    let updated = interpreter.gui().set_progress_bar(values[1], values[0]);

    report_update(interpreter, values[1], updated);
    Ok(())
}

/// Create a static text control.  The quoted name and initial text follow the word.
///
/// Signature: `foreground background x y id -- flag`
fn word_create_static_text(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = pop_or_fail(interpreter, 5) else {
        return Ok(());
    };

    let name = quoted_argument(interpreter);
    let text = quoted_argument(interpreter);

    let (Some(name), Some(text)) = (name, text) else {
        interpreter.write_output("Insufficient parameters\n");
        let _ = interpreter.push_flag(false);
        return Ok(());
    };

    let widget = Widget::new(
        values[4],
        &name,
        values[2],
        values[3],
        WidgetKind::StaticText {
            text,
            foreground: colour_value(values[0]),
            background: colour_value(values[1]),
        },
    );

    add_and_report(interpreter, widget);
    Ok(())
}

/// Send the next printed text to a static text control.  Without an id the text is dropped.
///
/// Signature: `id -- `
fn word_set_static_text(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let target = match interpreter.pop() {
        (id, StackStatus::Ok) => TextTarget::StaticText(id),

        _ => {
            interpreter.write_output("Insufficient parameters\n");
            TextTarget::Discard
        }
    };

    interpreter.gui_state().set_text_target(target);
    Ok(())
}

/// Signature: `foreground background id -- flag`
fn word_set_static_text_colour(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = pop_or_fail(interpreter, 3) else {
        return Ok(());
    };

    let (foreground, background) = (colour_value(values[0]), colour_value(values[1]));
    let updated = interpreter
        .gui()
        .set_static_text_colour(values[2], foreground, background);

    report_update(interpreter, values[2], updated);
    Ok(())
}

/// Create a bitmap control.  The quoted name and image file follow the word.
///
/// Signature: `x y id -- flag`
fn word_create_bitmap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = pop_or_fail(interpreter, 3) else {
        return Ok(());
    };

    let name = quoted_argument(interpreter);
    let file = quoted_argument(interpreter);

    let (Some(name), Some(file)) = (name, file) else {
        interpreter.write_output("Insufficient parameters\n");
        let _ = interpreter.push_flag(false);
        return Ok(());
    };

    let widget = Widget::new(
        values[2],
        &name,
        values[0],
        values[1],
        WidgetKind::Bitmap { file },
    );

    add_and_report(interpreter, widget);
    Ok(())
}

/// Send the next printed text to a bitmap control as its image file.
///
/// Signature: `id -- `
fn word_set_bitmap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let target = match interpreter.pop() {
        (id, StackStatus::Ok) => TextTarget::Bitmap(id),

        _ => {
            interpreter.write_output("Insufficient parameters\n");
            TextTarget::Discard
        }
    };

    interpreter.gui_state().set_text_target(target);
    Ok(())
}

/// Signature: ` -- `
fn word_clear_gui(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.gui().clear();
    Ok(())
}

/// Run button callbacks and the ticker until `EXIT_ML` runs or there are no more events.
///
/// Signature: ` -- `
fn word_main_loop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    loop {
        let _ = interpreter.service_ticker(Instant::now());

        let Some(event) = interpreter.gui().next_event() else {
            break;
        };

        debug!(id = event.id, word = %event.callback, "button pressed");

        let _ = interpreter.interpret_nested(&event.callback);

        if std::mem::take(&mut interpreter.gui_state().exit_main_loop)
            || interpreter.exit_requested()
        {
            break;
        }
    }

    Ok(())
}

/// Signature: ` -- `
fn word_exit_main_loop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.gui_state().exit_main_loop = true;
    Ok(())
}

/// Run the word named after this one every given number of seconds.
///
/// Signature: `seconds -- `
fn word_add_ticker(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let word = interpreter.next_token();

    if word.is_empty() {
        interpreter.write_output("Please specify a callback word for the ticker\n");
        return Ok(());
    }

    let (seconds, status) = interpreter.pop();

    if status != StackStatus::Ok {
        interpreter.write_output("This word requires delay in seconds to be pushed onto stack\n");
        return Ok(());
    }

    let period = Duration::from_secs(seconds.max(0) as u64);

    info!(word = %word, ?period, "ticker attached");
    interpreter
        .gui_state()
        .attach_ticker(&word, period, Instant::now());

    Ok(())
}

pub fn register_gui_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "CRT_BTN",
        word_create_button,
        "Create a button, followed by \"name\" \"label\" and the word to run when it's pressed.",
        "x y id -- flag"
    );

    add_native_word!(
        interpreter,
        "SHOW",
        word_show,
        "Draw the GUI.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "CRT_P_BAR",
        word_create_progress_bar,
        "Create a progress bar, followed by \"name\".",
        "x y id -- flag"
    );

    add_native_word!(
        interpreter,
        "SET_P_BAR",
        word_set_progress_bar,
        "Set a progress bar's volume.",
        "volume id -- flag"
    );

    add_native_word!(
        interpreter,
        "CRT_ST_TXT",
        word_create_static_text,
        "Create a static text control, followed by \"name\" \"text\".",
        "foreground background x y id -- flag"
    );

    add_native_word!(
        interpreter,
        "SET_ST_TXT",
        word_set_static_text,
        "Send the next printed text to a static text control.",
        "id -- "
    );

    add_native_word!(
        interpreter,
        "SET_ST_CLR",
        word_set_static_text_colour,
        "Set a static text control's colours.",
        "foreground background id -- flag"
    );

    add_native_word!(
        interpreter,
        "CRT_BMP",
        word_create_bitmap,
        "Create a bitmap control, followed by \"name\" \"file\".",
        "x y id -- flag"
    );

    add_native_word!(
        interpreter,
        "SET_BMP",
        word_set_bitmap,
        "Send the next printed text to a bitmap control as its file.",
        "id -- "
    );

    add_native_word!(
        interpreter,
        "CLR_GUI",
        word_clear_gui,
        "Remove every GUI control.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "ML",
        word_main_loop,
        "Run button callbacks until EXIT_ML.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "EXIT_ML",
        word_exit_main_loop,
        "Leave the main loop after the current callback.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "ADDTICKER",
        word_add_ticker,
        "Run the following word every few seconds.",
        "seconds -- "
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0 => 0x0000 ; "black")]
    #[test_case(1 => 0xffff ; "white")]
    #[test_case(2 => 0xf800 ; "red")]
    #[test_case(3 => 0x07e0 ; "green")]
    #[test_case(4 => 0x001f ; "blue")]
    #[test_case(12 => 0x0000 ; "past the table")]
    #[test_case(-1 => 0x0000 ; "negative")]
    fn colours(index: i32) -> u16 {
        colour_value(index)
    }

    #[test]
    fn ticker_comes_due_once_per_period() {
        let start = Instant::now();
        let mut state = GuiState::default();

        state.attach_ticker("TICK", Duration::from_secs(2), start);

        assert_eq!(state.ticker_due(start), None);
        assert_eq!(
            state.ticker_due(start + Duration::from_secs(2)),
            Some("TICK".to_string())
        );
        assert_eq!(state.ticker_due(start + Duration::from_secs(3)), None);

        state.detach_ticker();
        assert_eq!(state.ticker_due(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn text_target_is_used_once() {
        let mut state = GuiState::default();

        state.set_text_target(TextTarget::StaticText(4));

        assert_eq!(state.take_text_target(), Some(TextTarget::StaticText(4)));
        assert_eq!(state.take_text_target(), None);
    }

    #[test]
    fn host_gui_rejects_duplicate_ids_and_a_full_screen() {
        let mut gui = HostGui::new();

        for id in 0..MAX_WIDGETS as i32 {
            let added = gui.add_widget(Widget::new(
                id,
                "bar",
                0,
                0,
                WidgetKind::ProgressBar { volume: 0 },
            ));

            assert!(added);
        }

        let bar = Widget::new(0, "bar", 0, 0, WidgetKind::ProgressBar { volume: 0 });
        assert!(!gui.add_widget(bar));

        gui.clear();

        let extra = Widget::new(99, "bar", 0, 0, WidgetKind::ProgressBar { volume: 0 });
        assert!(gui.add_widget(extra));
    }

    #[test]
    fn touching_a_button_queues_its_callback() {
        let mut gui = HostGui::new();
        let button = WidgetKind::Button {
            label: "Go".to_string(),
            callback: "START".to_string(),
        };

        assert!(gui.add_widget(Widget::new(1, "go", 10, 20, button)));
        assert!(gui.touch(1));
        assert!(!gui.touch(2));

        assert_eq!(gui.next_event(), Some(GuiEvent::new(1, "START")));
        assert_eq!(gui.next_event(), None);
    }

    #[test]
    fn negative_volume_keeps_the_bar() {
        let mut gui = HostGui::new();

        assert!(gui.add_widget(Widget::new(
            3,
            "level",
            0,
            0,
            WidgetKind::ProgressBar { volume: 0 }
        )));
        assert!(gui.set_progress_bar(3, 40));
        assert!(gui.set_progress_bar(3, -1));
        assert!(!gui.set_static_text(3, "not text"));

        assert_eq!(
            gui.widget(3).map(|widget| widget.kind.clone()),
            Some(WidgetKind::ProgressBar { volume: 40 })
        );
    }
}
