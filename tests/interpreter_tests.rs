// Tests of the interpreter working with storage, the board and the screen.


use rcforth::lang::code::Cell;
use rcforth::lang::source_buffer::SourceLocation;
use rcforth::runtime::built_ins::board_words::{Board, HostBoard, SpiConfig};
use rcforth::runtime::built_ins::gui_words::{GuiEvent, HostGui, WidgetKind};
use rcforth::runtime::config::InterpreterConfig;
use rcforth::runtime::data_structures::dictionary::{WordBody, WordFlags, WordInfo};
use rcforth::runtime::interpreter::forth_interpreter::ForthInterpreter;
use rcforth::runtime::interpreter::{
    CodeManagement, InterpretStatus, Interpreter, InterpreterStack, Peripherals, WordManagement,
};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

// Create an empty storage directory for one test.
fn sd_root(test_name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("rcforth-{}-{}", test_name, std::process::id()));

    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    root
}

fn interpreter_with_root(root: PathBuf) -> ForthInterpreter {
    ForthInterpreter::new(InterpreterConfig {
        sd_root: root,
        ..InterpreterConfig::default()
    })
}

fn run(interp: &mut ForthInterpreter, source: &str) {
    for line in source.lines() {
        interp.process_line(line);
    }
}


#[test]
fn fload_runs_a_file_from_storage() {
    let root = sd_root("fload");
    fs::write(root.join("lib.f"), ": triple 3 * ;\n: sixfold triple 2 * ;\n").unwrap();

    let mut interp = interpreter_with_root(root);
    run(&mut interp, "fload \"lib.f\"\n2 sixfold");

    assert_eq!(interp.stack(), &[12]);
}

#[test]
fn fload_reports_a_missing_file() {
    let root = sd_root("fload-missing");
    let mut interp = interpreter_with_root(root);

    run(&mut interp, "fload \"nope.f\" 5");

    assert_eq!(interp.take_output(), "Could not find file nope.f\n");
    assert_eq!(interp.stack(), &[5]);
}

#[test]
fn loaded_file_with_errors_keeps_going() {
    let root = sd_root("fload-errors");
    fs::write(root.join("BAD.F"), "1 nothing\n2\n").unwrap();

    let mut interp = interpreter_with_root(root);
    run(&mut interp, "fload bad.f");

    let output = interp.take_output();

    assert!(output.contains("NOTHING not recognised"));
    assert!(output.contains("Errors while executing BAD.F"));
    assert_eq!(interp.stack(), &[1, 2]);
}

#[test]
fn definition_can_span_lines_of_a_file() {
    let root = sd_root("fload-multiline");
    fs::write(root.join("SQ.F"), ": sq\n  dup *\n;\n").unwrap();

    let mut interp = interpreter_with_root(root);
    run(&mut interp, "fload sq.f\n9 sq");

    assert_eq!(interp.stack(), &[81]);
}

#[test]
fn init_file_runs_the_scripts_it_names() {
    let root = sd_root("init");
    fs::write(root.join("init"), "SETUP.F\n\nMORE.F\n").unwrap();
    fs::write(root.join("SETUP.F"), ": boot 7 ;\n").unwrap();
    fs::write(root.join("MORE.F"), "boot boot +\n").unwrap();

    let mut interp = interpreter_with_root(root);

    assert_eq!(interp.run_init_script("init").unwrap(), 2);
    assert_eq!(interp.stack(), &[14]);
}

#[test]
fn missing_init_file_is_not_an_error() {
    let root = sd_root("init-missing");
    let mut interp = interpreter_with_root(root);

    assert_eq!(interp.run_init_script("init").unwrap(), 0);
}

#[test]
fn data_stack_capacity_is_enforced() {
    let mut interp = ForthInterpreter::new(InterpreterConfig {
        data_stack_size: 4,
        ..InterpreterConfig::default()
    });

    run(&mut interp, "1 2 3 4 5");

    assert_eq!(interp.stack(), &[1, 2, 3, 4]);
    assert_eq!(interp.take_output(), "Data stack full\n");
}

#[test]
fn full_dictionary_rejects_new_words() {
    let built_ins = ForthInterpreter::default().dictionary().len();
    let mut interp = ForthInterpreter::new(InterpreterConfig {
        max_words: built_ins + 1,
        ..InterpreterConfig::default()
    });

    run(&mut interp, ": a 1 ;\n: b 2 ;\nb");

    assert_eq!(
        interp.take_output(),
        "Out of dictionary space: B\nB not recognised\n"
    );
    assert!(!interp.is_compiling());
}

#[test]
fn branch_must_stay_inside_the_word() {
    let mut interp = ForthInterpreter::default();
    let branch = interp.find_word("BRANCH").unwrap();

    for (name, offset) in [("SKIP", 1), ("JUMP", 50)] {
        let body = WordBody::Code(vec![Cell::WordRef(branch), Cell::Literal(offset)]);

        interp
            .define_word(WordInfo::new(name, WordFlags::USER, body, SourceLocation::default()))
            .unwrap();
    }

    run(&mut interp, "skip 1\njump 2");

    assert_eq!(interp.take_output(), "Branch offset 50 is out of range\n");
    assert_eq!(interp.stack(), &[1]);
}

#[test]
fn failing_source_reports_its_first_bad_line() {
    let mut interp = ForthInterpreter::default();

    let error = interp.process_source("LIB.F", "1\nnothing\n2 nope").unwrap_err();
    let location = error.location().as_ref().unwrap();

    assert_eq!(error.error(), "Errors while executing LIB.F");
    assert_eq!(location.path(), "LIB.F");
    assert_eq!(location.line(), 2);
    assert!(error.call_stack().is_none());
}

#[test]
fn runtime_error_carries_the_call_stack() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, ": inner 99 @ ;\n: outer inner 1 drop ;");

    let outer = interp.find_word("OUTER").unwrap();
    let error = interp.execute_word(outer).unwrap_err();
    let call_stack = error.call_stack().as_ref().unwrap();

    assert_eq!(error.error(), "Invalid address 99");
    assert_eq!(call_stack.first().map(|item| item.word().as_str()), Some("OUTER"));
    assert!(interp.call_stack().is_empty());
}

#[test]
fn deep_nesting_overflows_the_control_stack() {
    let mut interp = ForthInterpreter::default();
    let mut source = String::from(": w0 1 ;\n");

    // Each level calls the one below before doing more work, so every call keeps a frame.
    for level in 1..=30 {
        source.push_str(&format!(": w{} w{} 0 drop ;\n", level, level - 1));
    }

    source.push_str("w30");
    run(&mut interp, &source);

    assert!(interp.take_output().contains("Control stack overflow"));
    assert!(interp.call_stack().is_empty());
}

#[test]
fn exit_stops_the_console() {
    let mut interp = ForthInterpreter::default();

    assert_eq!(interp.process_line("1 exit 2"), InterpretStatus::Halt);
    assert!(interp.exit_requested());
    assert_eq!(interp.stack(), &[1]);
}

#[test]
fn open_definition_continues_compiling() {
    let mut interp = ForthInterpreter::default();

    assert_eq!(interp.process_line(": sq dup"), InterpretStatus::ContinueCompiling);
    assert_eq!(interp.process_line("* ;"), InterpretStatus::Continue);
    assert!(interp.find_word("SQ").is_some());
}

#[test]
fn forget_latest_releases_variables() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "variable a\nvariable b\n2 forget-latest");

    assert!(interp.find_word("A").is_none());
    assert_eq!(interp.dictionary().variables().live_count(), 0);
}

#[test]
fn ticker_runs_its_word_when_due() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, ": tick 1 ;\n1 addticker tick");

    assert!(!interp.service_ticker(Instant::now()));
    assert!(interp.service_ticker(Instant::now() + Duration::from_secs(2)));
    assert_eq!(interp.stack(), &[1]);
}

#[test]
fn ticker_waits_while_compiling() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, ": tick 1 ;\n1 addticker tick\n: open");

    assert!(!interp.service_ticker(Instant::now() + Duration::from_secs(2)));
    assert!(interp.stack().is_empty());
}

#[test]
fn failing_ticker_is_detached() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, ": tick 99 @ ;\n1 addticker tick");

    assert!(interp.service_ticker(Instant::now() + Duration::from_secs(2)));
    assert!(interp.gui_state().ticker_due(Instant::now() + Duration::from_secs(10)).is_none());
}


#[test]
fn digital_pins_read_back_what_was_written() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "1 12 digitalout 12 digitalin 0 12 digitalout 12 digitalin");

    assert_eq!(interp.stack(), &[1, 0]);
}

#[test]
fn invalid_port_is_reported() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "1 40 digitalout");

    assert_eq!(interp.take_output(), "Invalid port\n");
}

#[test]
fn most_negative_port_is_invalid() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "-2147483648 digitalin\n1 -2147483648 digitalout\n-2147483648 analogin");

    assert_eq!(interp.take_output(), "Invalid port\nInvalid port\nInvalid port\n");
    assert!(interp.stack().is_empty());
}

#[derive(Default)]
struct RecordingBoard {
    transfers: Rc<RefCell<Vec<(SpiConfig, Vec<i32>)>>>,
}

impl Board for RecordingBoard {
    fn digital_write(&mut self, _pin: &str, _high: bool) {}

    fn digital_read(&mut self, _pin: &str) -> bool {
        false
    }

    fn analog_read(&mut self, pin: &str) -> i32 {
        if pin == "p17" { 700 } else { 0 }
    }

    fn analog_write(&mut self, _value: i32) {}

    fn spi_write(&mut self, config: SpiConfig, data: &[i32]) {
        self.transfers.borrow_mut().push((config, data.to_vec()));
    }

    fn delay(&mut self, _duration: Duration) {}
}

#[test]
fn spi_write_sends_data_in_push_order() {
    let board = RecordingBoard::default();
    let transfers = board.transfers.clone();

    let mut interp = ForthInterpreter::with_peripherals(
        InterpreterConfig::default(),
        Box::new(board),
        Box::new(HostGui::new()),
    );

    run(&mut interp, "10 20 30 3 16 1 1000000 spiwrite");

    let expected = SpiConfig {
        bits: 16,
        mode: 1,
        frequency: 1000000,
    };

    assert_eq!(*transfers.borrow(), vec![(expected, vec![10, 20, 30])]);
    assert!(interp.stack().is_empty());
}

#[test]
fn spi_write_without_enough_data_is_reported() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "10 3 8 0 1000 spiwrite");

    assert_eq!(interp.take_output(), "Insufficient parameters\n");
    assert_eq!(interp.stack(), &[10]);
}

#[test]
fn analog_channels_map_to_pins() {
    let mut interp = ForthInterpreter::with_peripherals(
        InterpreterConfig::default(),
        Box::new(RecordingBoard::default()),
        Box::new(HostGui::new()),
    );

    run(&mut interp, "2 analogin 0 analogin");

    assert_eq!(interp.stack(), &[700, 0]);
}

#[test]
fn host_board_keeps_the_analog_output() {
    let mut board = HostBoard::new();

    board.analog_write(300);

    assert_eq!(board.analog_output(), 300);
}


fn interpreter_with_events(events: &[GuiEvent]) -> ForthInterpreter {
    let mut gui = HostGui::new();

    for event in events {
        gui.queue_event(event.clone());
    }

    ForthInterpreter::with_peripherals(
        InterpreterConfig::default(),
        Box::new(HostBoard::new()),
        Box::new(gui),
    )
}

#[test]
fn main_loop_runs_callbacks_until_exit() {
    let events = [
        GuiEvent::new(1, "PRESS"),
        GuiEvent::new(2, "STOP"),
        GuiEvent::new(1, "PRESS"),
    ];
    let mut interp = interpreter_with_events(&events);

    run(&mut interp, ": press 1 ;\n: stop exit_ml ;\nml");

    assert_eq!(interp.stack(), &[1]);
    assert_eq!(interp.gui().next_event(), Some(GuiEvent::new(1, "PRESS")));
    assert!(!interp.gui_state().exit_main_loop);
}

#[test]
fn main_loop_ends_when_events_run_out() {
    let mut interp = interpreter_with_events(&[GuiEvent::new(1, "PRESS")]);

    run(&mut interp, ": press 5 ;\nml 6");

    assert_eq!(interp.stack(), &[5, 6]);
}

#[test]
fn button_creation_reports_success_and_duplicates() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "10 20 1 crt_btn \"go\" \"Go!\" start");
    run(&mut interp, "30 40 1 crt_btn \"again\" \"Again\" start");

    assert_eq!(interp.stack(), &[-1, 0]);
    assert_eq!(interp.take_output(), "Could not add GUI element\n");

    let kind = interp.gui().widget(1).map(|widget| widget.kind.clone());

    assert_eq!(
        kind,
        Some(WidgetKind::Button {
            label: "Go!".to_string(),
            callback: "START".to_string(),
        })
    );
}

#[test]
fn printed_text_goes_to_the_static_text_control() {
    let mut interp = ForthInterpreter::default();

    run(
        &mut interp,
        "1 0 5 5 3 crt_st_txt \"label\" \"start\" drop\n: ready 3 set_st_txt .\" Ready\" ;\nready",
    );

    let kind = interp.gui().widget(3).map(|widget| widget.kind.clone());

    assert_eq!(
        kind,
        Some(WidgetKind::StaticText {
            text: "Ready".to_string(),
            foreground: 0xffff,
            background: 0x0000,
        })
    );
    assert_eq!(interp.take_output(), "");
}

#[test]
fn text_without_a_control_id_is_dropped() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, ": lost set_st_txt .\" gone\" .\" kept\" ;\nlost");

    assert_eq!(interp.take_output(), "Insufficient parameters\nkept");
}

#[test]
fn progress_bar_volume_is_updated() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "0 0 4 crt_p_bar \"level\" drop\n60 4 set_p_bar\n10 9 set_p_bar");

    assert_eq!(interp.stack(), &[-1, 0]);
    assert_eq!(interp.take_output(), "GUI element 9 not found\n");
    assert_eq!(
        interp.gui().widget(4).map(|widget| widget.kind.clone()),
        Some(WidgetKind::ProgressBar { volume: 60 })
    );
}

#[test]
fn clear_gui_removes_every_control() {
    let mut interp = ForthInterpreter::default();

    run(&mut interp, "0 0 4 crt_p_bar \"level\" drop\nclr_gui");

    assert!(interp.gui().widget(4).is_none());
}
