//! Interactive control loop
//!
//! Reads one command per line and applies it through the chain's control
//! handle. Slot numbers are 1-based, matching the listing.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::dsp::{ChainControls, EffectParam, ParamValue};
use crate::engine::ShutdownToken;

const HELP: &str = "\
Commands:
  list                        Show the chain
  gain <value>                Set input gain (0-10)
  toggle <n> | <n>            Toggle effect n
  enable <n> | disable <n>    Switch effect n on or off
  show <n>                    Show parameters of effect n
  set <n> <param> <value>     Set a parameter (e.g. set 1 gain 6, set 1 tanh on)
  help                        Show this help
  quit | q                    Exit";

/// One parsed control line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    List,
    Help,
    Gain(f32),
    Toggle(usize),
    Enable(usize),
    Disable(usize),
    Show(usize),
    Set {
        slot: usize,
        param: EffectParam,
        value: ParamValue,
    },
    Quit,
}

/// Why a control line could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("'{0}' is not a slot number")]
    InvalidSlot(String),

    #[error("Unknown parameter '{0}'")]
    UnknownParam(String),

    #[error("'{0}' is not on/off")]
    InvalidToggle(String),
}

impl Command {
    /// Parse a control line (case-insensitive)
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let lower = line.trim().to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        let Some((&head, args)) = words.split_first() else {
            return Ok(Command::Empty);
        };

        match (head, args) {
            ("list" | "l" | "ls", []) => Ok(Command::List),
            ("help" | "h" | "?", []) => Ok(Command::Help),
            ("quit" | "q" | "exit", []) => Ok(Command::Quit),
            ("gain", [value]) => Ok(Command::Gain(parse_number(value)?)),
            ("gain", _) => Err(CommandError::Usage("gain <value>")),
            ("toggle", [slot]) => Ok(Command::Toggle(parse_slot(slot)?)),
            ("toggle", _) => Err(CommandError::Usage("toggle <n>")),
            ("enable" | "on", [slot]) => Ok(Command::Enable(parse_slot(slot)?)),
            ("enable" | "on", _) => Err(CommandError::Usage("enable <n>")),
            ("disable" | "off", [slot]) => Ok(Command::Disable(parse_slot(slot)?)),
            ("disable" | "off", _) => Err(CommandError::Usage("disable <n>")),
            ("show", [slot]) => Ok(Command::Show(parse_slot(slot)?)),
            ("show", _) => Err(CommandError::Usage("show <n>")),
            ("set", [slot, param, value]) => {
                let slot = parse_slot(slot)?;
                let param = EffectParam::from_name(param)
                    .ok_or_else(|| CommandError::UnknownParam(param.to_string()))?;
                let value = if param.is_toggle() {
                    ParamValue::Toggle(parse_toggle(value)?)
                } else {
                    ParamValue::Float(parse_number(value)?)
                };
                Ok(Command::Set { slot, param, value })
            }
            ("set", _) => Err(CommandError::Usage("set <n> <param> <value>")),
            (word, []) if word.chars().all(|c| c.is_ascii_digit()) => {
                Ok(Command::Toggle(parse_slot(word)?))
            }
            _ => Err(CommandError::Unknown(line.trim().to_string())),
        }
    }
}

fn parse_number(text: &str) -> Result<f32, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidNumber(text.to_string()))
}

fn parse_slot(text: &str) -> Result<usize, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidSlot(text.to_string()))
}

fn parse_toggle(text: &str) -> Result<bool, CommandError> {
    match text {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(CommandError::InvalidToggle(text.to_string())),
    }
}

/// Apply a command, writing feedback to `out`
///
/// Returns `false` once the loop should stop.
pub fn execute<W: Write>(command: &Command, controls: &ChainControls, out: &mut W) -> io::Result<bool> {
    match command {
        Command::Empty => {}
        Command::List => write!(out, "{controls}")?,
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(false),
        Command::Gain(gain) => match controls.set_input_gain(*gain) {
            Ok(()) => writeln!(out, "Input gain: {:.2}", controls.input_gain())?,
            Err(e) => writeln!(out, "Error: {e}")?,
        },
        Command::Toggle(slot) => match index(*slot).and_then(|i| controls.toggle_effect(i)) {
            Some(_) => write_slot(out, controls, *slot)?,
            None => no_slot(out, *slot)?,
        },
        Command::Enable(slot) | Command::Disable(slot) => {
            let enabled = matches!(command, Command::Enable(_));
            if index(*slot).is_some_and(|i| controls.enable_effect(i, enabled)) {
                write_slot(out, controls, *slot)?;
            } else {
                no_slot(out, *slot)?;
            }
        }
        Command::Show(slot) => match index(*slot).and_then(|i| controls.slot(i)) {
            Some(entry) => {
                let state = if entry.is_enabled() { "Enabled" } else { "Disabled" };
                writeln!(
                    out,
                    "[{}] {} ({}) - {}",
                    slot,
                    entry.name(),
                    entry.effect().kind(),
                    state
                )?;
                for &param in entry.effect().params() {
                    if let Ok(value) = entry.effect().get_param(param) {
                        writeln!(out, "  {param} = {value}")?;
                    }
                }
            }
            None => no_slot(out, *slot)?,
        },
        Command::Set { slot, param, value } => {
            match index(*slot).and_then(|i| controls.get_effect(i)) {
                Some(effect) => match effect.set_param(*param, *value) {
                    Ok(()) => {
                        let shown = effect.get_param(*param).unwrap_or(*value);
                        writeln!(out, "[{slot}] {param} = {shown}")?;
                    }
                    Err(e) => writeln!(out, "Error: {e}")?,
                },
                None => no_slot(out, *slot)?,
            }
        }
    }
    Ok(true)
}

fn index(slot: usize) -> Option<usize> {
    slot.checked_sub(1)
}

fn write_slot<W: Write>(out: &mut W, controls: &ChainControls, slot: usize) -> io::Result<()> {
    if let Some(entry) = index(slot).and_then(|i| controls.slot(i)) {
        let state = if entry.is_enabled() { "Enabled" } else { "Disabled" };
        writeln!(out, "[{}] {} - {}", slot, entry.name(), state)?;
    }
    Ok(())
}

fn no_slot<W: Write>(out: &mut W, slot: usize) -> io::Result<()> {
    writeln!(out, "No effect at slot {slot}")
}

/// Run the control loop until `quit`, end of input, or cancellation
///
/// Always cancels `shutdown` on the way out.
pub fn run_control_loop<R: BufRead, W: Write>(
    controls: &ChainControls,
    input: R,
    mut out: W,
    shutdown: &ShutdownToken,
) -> io::Result<()> {
    let result = control_loop(controls, input, &mut out, shutdown);
    shutdown.cancel();
    result
}

fn control_loop<R: BufRead, W: Write>(
    controls: &ChainControls,
    input: R,
    out: &mut W,
    shutdown: &ShutdownToken,
) -> io::Result<()> {
    write!(out, "{controls}")?;
    writeln!(out, "Type 'help' for commands.")?;
    out.flush()?;

    for line in input.lines() {
        if shutdown.is_cancelled() {
            break;
        }
        let line = line?;
        match Command::parse(&line) {
            Ok(command) => {
                tracing::debug!(?command, "control command");
                if !execute(&command, controls, out)? {
                    break;
                }
            }
            Err(e) => writeln!(out, "{e}")?,
        }
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_default_chain;
    use test_case::test_case;

    #[test_case("list", Command::List ; "list")]
    #[test_case("  HELP ", Command::Help ; "help uppercase")]
    #[test_case("q", Command::Quit ; "quit short")]
    #[test_case("", Command::Empty ; "empty")]
    #[test_case("gain 2.5", Command::Gain(2.5) ; "gain")]
    #[test_case("2", Command::Toggle(2) ; "bare slot")]
    #[test_case("toggle 3", Command::Toggle(3) ; "toggle")]
    #[test_case("disable 1", Command::Disable(1) ; "disable")]
    #[test_case("set 1 tanh on", Command::Set { slot: 1, param: EffectParam::UseTanh, value: ParamValue::Toggle(true) } ; "set toggle")]
    #[test_case("set 2 depth% 0.5", Command::Set { slot: 2, param: EffectParam::DepthPercent, value: ParamValue::Float(0.5) } ; "set percent")]
    #[test_case("set 3 time 0.2", Command::Set { slot: 3, param: EffectParam::DelayTime, value: ParamValue::Float(0.2) } ; "set time alias")]
    fn test_parse(line: &str, expected: Command) {
        assert_eq!(Command::parse(line).unwrap(), expected);
    }

    #[test_case("gain" ; "missing gain value")]
    #[test_case("gain loud" ; "non numeric gain")]
    #[test_case("toggle x" ; "non numeric slot")]
    #[test_case("set 1 wobble 3" ; "unknown param")]
    #[test_case("set 1 tanh maybe" ; "bad toggle")]
    #[test_case("launch" ; "unknown command")]
    fn test_parse_errors(line: &str) {
        assert!(Command::parse(line).is_err());
    }

    fn run(script: &str) -> (ChainControls, String) {
        let chain = build_default_chain(48000, 5.0).unwrap();
        let controls = chain.chain_controls();
        let shutdown = ShutdownToken::new();
        let mut out = Vec::new();
        run_control_loop(&controls, script.as_bytes(), &mut out, &shutdown).unwrap();
        assert!(shutdown.is_cancelled());
        (controls, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_loop_applies_commands() {
        let (controls, out) = run("gain 2\n1\nset 1 gain 10\nenable 3\nq\n");
        assert_eq!(controls.input_gain(), 2.0);
        assert!(controls.slot(0).unwrap().is_enabled());
        assert!(!controls.slot(1).unwrap().is_enabled());
        assert!(controls.slot(2).unwrap().is_enabled());
        let dist = controls.get_effect(0).unwrap().as_distortion().unwrap();
        assert_eq!(dist.gain(), 10.0);
        assert!(out.contains("[1] Distortion - Enabled"));
    }

    #[test]
    fn test_loop_rejects_bad_values() {
        let (controls, out) = run("gain 20\nset 3 feedback 1.0\n9\n0\nbogus\n");
        assert_eq!(controls.input_gain(), 5.0);
        let delay = controls.get_effect(2).unwrap().as_delay().unwrap();
        assert_eq!(delay.feedback(), 0.6);
        assert!(out.contains("No effect at slot 9"));
        assert!(out.contains("No effect at slot 0"));
        assert!(out.contains("Unknown command"));
    }

    #[test]
    fn test_loop_stops_at_quit() {
        let (controls, _) = run("quit\n1\n");
        assert!(!controls.slot(0).unwrap().is_enabled());
    }

    #[test]
    fn test_show_lists_params() {
        let (_, out) = run("show 3\n");
        assert!(out.contains("[3] Delay (delay) - Disabled"));
        assert!(out.contains("feedback = 0.6"));
        assert!(out.contains("delay_time = 0.15"));
    }

    #[test]
    fn test_percent_depth() {
        let (controls, _) = run("set 2 depth% 0.5\n");
        let chorus = controls.get_effect(1).unwrap().as_chorus().unwrap();
        assert!((chorus.depth() - 0.005).abs() < 1e-7);
    }
}
