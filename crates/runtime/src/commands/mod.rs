//! Command Dispatcher (C4): a case-insensitive static table mapping command names to handlers,
//! built once via `std::sync::LazyLock` in the style of the pack's builtin-signature tables
//! (`examples/navicore-cem3/crates/compiler/src/builtins.rs`).

mod arithmetic;
mod arrays;
mod comparison;
mod control;
mod datetime;
mod gamestate;
mod output;
mod persistence_cmds;
mod text;
mod triggers_cmds;
mod vars;

use std::collections::HashMap;
use std::sync::LazyLock;

use twx_compiler::{Expr, VarRef};
use twx_core::Value;

use crate::error::FatalKind;
use crate::vm::Vm;

pub type CommandFn = fn(&mut Vm, &[Expr], usize) -> Result<(), FatalKind>;

static COMMANDS: LazyLock<HashMap<&'static str, CommandFn>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, CommandFn> = HashMap::new();
    m.insert("echo", output::echo);
    m.insert("clientmessage", output::client_message);
    m.insert("displaytext", output::display_text);
    m.insert("send", output::send);

    m.insert("setvar", vars::set_var);
    m.insert("setarray", arrays::set_array);

    m.insert("add", arithmetic::add);
    m.insert("subtract", arithmetic::subtract);
    m.insert("multiply", arithmetic::multiply);
    m.insert("divide", arithmetic::divide);
    m.insert("mod", arithmetic::modulo);
    m.insert("power", arithmetic::power);
    m.insert("sqr", arithmetic::sqr);
    m.insert("abs", arithmetic::abs);
    m.insert("int", arithmetic::int);
    m.insert("round", arithmetic::round);
    m.insert("random", arithmetic::random);

    m.insert("isequal", comparison::is_equal);
    m.insert("isgreater", comparison::is_greater);
    m.insert("isless", comparison::is_less);
    m.insert("isnotequal", comparison::is_not_equal);
    m.insert("isgreaterequal", comparison::is_greater_equal);
    m.insert("islessequal", comparison::is_less_equal);

    m.insert("cuttext", text::cut_text);
    m.insert("getword", text::get_word);
    m.insert("striptext", text::strip_text);
    m.insert("mergetext", text::merge_text);
    m.insert("upper", text::upper);
    m.insert("lower", text::lower);
    m.insert("len", text::len);

    m.insert("pause", control::pause);
    m.insert("getinput", control::get_input);
    m.insert("waitfor", control::wait_for);

    m.insert("settexttrigger", triggers_cmds::set_text_trigger);
    m.insert("settextlinetrigger", triggers_cmds::set_text_line_trigger);
    m.insert("setdelaytrigger", triggers_cmds::set_delay_trigger);
    m.insert("seteventtrigger", triggers_cmds::set_event_trigger);
    m.insert("killtrigger", triggers_cmds::kill_trigger);
    m.insert("killalltriggers", triggers_cmds::kill_all_triggers);

    m.insert("savevar", persistence_cmds::save_var);
    m.insert("loadvar", persistence_cmds::load_var);

    m.insert("getdate", datetime::get_date);
    m.insert("getdatetime", datetime::get_date_time);
    m.insert("datetimediff", datetime::date_time_diff);
    m.insert("datetimetostr", datetime::date_time_to_str);
    m.insert("starttimer", datetime::start_timer);
    m.insert("stoptimer", datetime::stop_timer);

    m.insert("getsector", gamestate::get_sector);
    m
});

/// Look up and run `command` (goto/gosub/return/halt never reach here — the compiler lowers
/// those to dedicated `Instr` variants, see `twx_compiler::preprocess`).
pub fn dispatch(vm: &mut Vm, command: &str, args: &[Expr], line: usize) -> Result<(), FatalKind> {
    let key = command.to_lowercase();
    match COMMANDS.get(key.as_str()) {
        Some(handler) => handler(vm, args, line),
        None => Err(FatalKind::UnknownCommand { command: command.to_string() }),
    }
}

// ---- shared argument helpers, used across the handler families --------------------------

fn arg<'a>(args: &'a [Expr], i: usize, command: &str, expected: &'static str) -> Result<&'a Expr, FatalKind> {
    args.get(i).ok_or_else(|| FatalKind::Arity { command: command.to_string(), expected, got: args.len() })
}

fn opt_arg(args: &[Expr], i: usize) -> Option<&Expr> {
    args.get(i)
}

/// Extract the `VarRef` a handler needs to write to (destination arguments are never
/// pre-evaluated — see DESIGN.md's note on command-argument grammar).
fn dest<'a>(args: &'a [Expr], i: usize, command: &str) -> Result<&'a VarRef, FatalKind> {
    match arg(args, i, command, "a variable destination")? {
        Expr::Var(v) => Ok(v),
        _ => Err(FatalKind::TypeMismatch {
            command: command.to_string(),
            detail: format!("argument {} must be a variable, not an expression", i + 1),
        }),
    }
}

fn eval_arg(vm: &mut Vm, args: &[Expr], i: usize, command: &str, expected: &'static str) -> Result<Value, FatalKind> {
    let expr = arg(args, i, command, expected)?;
    vm.eval(expr)
}

/// Extract a trigger handler's label name as a bare identifier rather than evaluating it as a
/// variable read — mirrors the compiler's `goto`/`gosub` bare-label handling, since a handler
/// argument like `ONENEMY` in `setTextTrigger 1 ONENEMY "orc"` names a label, not a variable.
fn label_arg<'a>(args: &'a [Expr], i: usize, command: &str) -> Result<&'a str, FatalKind> {
    match arg(args, i, command, "a label name")? {
        Expr::Var(v) if v.subscripts.is_empty() && v.accessors.is_empty() => Ok(v.base.as_str()),
        _ => Err(FatalKind::TypeMismatch {
            command: command.to_string(),
            detail: format!("argument {} must be a bare label name", i + 1),
        }),
    }
}
