mod session;

use std::env;
use std::io::{self, Write};
use std::process;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{self, Attribute, SetAttribute};
use crossterm::{ExecutableCommand, QueueableCommand, cursor, terminal};
use meter_core::config::MeterConfig;
use meter_core::input::Direction;
use meter_core::scheduler::Channel;

use session::{POT_STEP, Session, TranscriptProfile};

const USAGE: &str = "Usage: meter-emulator [--profile <interactive|navigation|reset|idle>] [--tick-ms <n>]";

struct Options {
    profile: TranscriptProfile,
    tick_ms: u32,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let config = MeterConfig::DEFAULT.with_tick_period_ms(options.tick_ms);
    let mut session = Session::new(options.profile, config)?;
    session.play(options.profile)?;
    let mut tui = Tui::setup()?;
    let result = run(&mut tui, &mut session, options.tick_ms);
    tui.teardown();
    result
}

fn run(tui: &mut Tui, session: &mut Session, tick_ms: u32) -> io::Result<()> {
    let period = Duration::from_millis(u64::from(tick_ms));
    let mut next_tick = Instant::now();

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        if event::poll(wait)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                || (key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL);
            if quit {
                return Ok(());
            }
            apply_key(session, key.code)?;
        }

        if Instant::now() >= next_tick {
            session.tick()?;
            next_tick += period;
            tui.draw(session)?;
        }
    }
}

fn apply_key(session: &mut Session, code: KeyCode) -> io::Result<()> {
    match code {
        KeyCode::Right | KeyCode::Down => session.turn(Direction::Clockwise),
        KeyCode::Left | KeyCode::Up => session.turn(Direction::CounterClockwise),
        KeyCode::Enter => session.tap(),
        KeyCode::Char('h') => session.toggle_hold(),
        KeyCode::Char('v') => session.adjust_pot(Channel::Voltage, -POT_STEP),
        KeyCode::Char('V') => session.adjust_pot(Channel::Voltage, POT_STEP),
        KeyCode::Char('c') => session.adjust_pot(Channel::Current, -POT_STEP),
        KeyCode::Char('C') => session.adjust_pot(Channel::Current, POT_STEP),
        _ => Ok(()),
    }
}

struct Tui {
    stdout: io::Stdout,
}

impl Tui {
    fn setup() -> io::Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(terminal::EnterAlternateScreen)?;
        stdout.execute(cursor::Hide)?;
        Ok(Self { stdout })
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn draw(&mut self, session: &Session) -> io::Result<()> {
        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout
            .queue(terminal::Clear(terminal::ClearType::All))?;

        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.print_line("Power Meter emulator")?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        let border = format!("+{}+", "-".repeat(66));
        self.print_line(&border)?;
        for row in session.display() {
            self.print_line(&format!("| {row:<64} |"))?;
        }
        self.print_line(&border)?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;

        let pots = session.pots();
        self.print_line(&format!(
            "t={}ms screen={} sel={} pots V={} I={} button={}",
            session.now(),
            session.screen(),
            session.selection(),
            pots.voltage,
            pots.current,
            if session.button_down() { "held" } else { "up" }
        ))?;
        self.print_line("arrows: turn  enter: tap  h: hold  v/V c/C: pots  q: quit")?;
        self.stdout.flush()
    }

    fn print_line(&mut self, text: &str) -> io::Result<()> {
        self.stdout.queue(style::Print(text))?;
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        Ok(())
    }
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        profile: TranscriptProfile::Interactive,
        tick_ms: MeterConfig::DEFAULT.tick_period_ms,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--profile=") {
            options.profile = TranscriptProfile::from_tag(value)?;
        } else if arg == "--profile" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --profile".to_string())?;
            options.profile = TranscriptProfile::from_tag(&value)?;
        } else if let Some(value) = arg.strip_prefix("--tick-ms=") {
            options.tick_ms = parse_tick(value)?;
        } else if arg == "--tick-ms" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --tick-ms".to_string())?;
            options.tick_ms = parse_tick(&value)?;
        } else {
            options.profile = TranscriptProfile::from_tag(&arg)?;
        }
    }
    Ok(options)
}

fn parse_tick(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(0) | Err(_) => Err(format!("Invalid tick period `{value}`")),
        Ok(ms) => Ok(ms),
    }
}
