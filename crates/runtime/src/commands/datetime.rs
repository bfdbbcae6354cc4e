//! Date/Time family (§4.4, ambient — supplements the distilled spec's command list): scripts use
//! these for rate-limiting and logging elapsed turns, not for anything the VM itself schedules
//! by wall clock (that's the Delay trigger's job, §4.7).

use chrono::{Local, NaiveDateTime};
use twx_compiler::Expr;
use twx_core::Value;

use crate::commands::{dest, eval_arg, opt_arg};
use crate::error::FatalKind;
use crate::vm::Vm;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn get_date(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "getDate")?.clone();
    vm.set_var(&target, Value::str(Local::now().format(DATE_FORMAT).to_string()))
}

pub fn get_date_time(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "getDateTime")?.clone();
    vm.set_var(&target, Value::str(Local::now().format(DATETIME_FORMAT).to_string()))
}

fn parse_datetime(command: &'static str, s: &str) -> Result<NaiveDateTime, FatalKind> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| FatalKind::TypeMismatch { command: command.to_string(), detail: format!("not a datetime: {e}") })
}

/// `dateTimeDiff a b unit dest`: `b - a` expressed in `unit` (`seconds`, `minutes`, `hours`,
/// or `days`).
pub fn date_time_diff(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let a = eval_arg(vm, args, 0, "dateTimeDiff", "4")?.to_display_string();
    let b = eval_arg(vm, args, 1, "dateTimeDiff", "4")?.to_display_string();
    let unit = eval_arg(vm, args, 2, "dateTimeDiff", "4")?.to_display_string();
    let target = dest(args, 3, "dateTimeDiff")?.clone();

    let a = parse_datetime("dateTimeDiff", &a)?;
    let b = parse_datetime("dateTimeDiff", &b)?;
    let delta = b - a;
    let value = match unit.to_lowercase().as_str() {
        "seconds" => delta.num_seconds() as f64,
        "minutes" => delta.num_minutes() as f64,
        "hours" => delta.num_hours() as f64,
        "days" => delta.num_days() as f64,
        other => {
            return Err(FatalKind::TypeMismatch {
                command: "dateTimeDiff".into(),
                detail: format!("unknown unit {other}"),
            });
        }
    };
    vm.set_var(&target, Value::Number(value))
}

/// `dateTimeToStr src dest [format]`: reformats `src` with a `chrono` strftime pattern,
/// defaulting to the canonical datetime format when none is given.
pub fn date_time_to_str(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let src = eval_arg(vm, args, 0, "dateTimeToStr", "2 or 3")?.to_display_string();
    let target = dest(args, 1, "dateTimeToStr")?.clone();
    let format = match opt_arg(args, 2) {
        Some(e) => vm.eval(e)?.to_display_string(),
        None => DATETIME_FORMAT.to_string(),
    };
    let parsed = parse_datetime("dateTimeToStr", &src)?;
    vm.set_var(&target, Value::str(parsed.format(&format).to_string()))
}

/// `startTimer name`: records the current instant under the canonical name.
pub fn start_timer(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "startTimer")?.clone();
    vm.start_timer(&target.base);
    Ok(())
}

/// `stopTimer name`: writes the elapsed seconds since the matching `startTimer` into `name`
/// itself (mutate-in-place, the same shape as the arithmetic family).
pub fn stop_timer(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "stopTimer")?.clone();
    let elapsed = vm.stop_timer(&target.base);
    vm.set_var(&target, Value::Number(elapsed))
}
