//! Trigger-registration family (§4.4, §4.7): sets/kills entries in the `TriggerTable`. Actual
//! dispatch against incoming text lives on `Vm`, not here.

use std::time::{Duration, Instant};

use twx_compiler::Expr;

use crate::commands::{arg, eval_arg, label_arg};
use crate::error::FatalKind;
use crate::triggers::TriggerKind;
use crate::vm::Vm;

fn trigger_id(vm: &mut Vm, args: &[Expr], command: &'static str) -> Result<i64, FatalKind> {
    Ok(eval_arg(vm, args, 0, command, "3")?.as_number() as i64)
}

pub fn set_text_trigger(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let id = trigger_id(vm, args, "setTextTrigger")?;
    let handler = label_arg(args, 1, "setTextTrigger")?.to_string();
    let pattern = eval_arg(vm, args, 2, "setTextTrigger", "3")?.to_display_string();
    vm.triggers_mut().set(id, TriggerKind::TextMatch { pattern }, handler);
    Ok(())
}

pub fn set_text_line_trigger(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let id = trigger_id(vm, args, "setTextLineTrigger")?;
    let handler = label_arg(args, 1, "setTextLineTrigger")?.to_string();
    let pattern = eval_arg(vm, args, 2, "setTextLineTrigger", "3")?.to_display_string();
    vm.triggers_mut().set(id, TriggerKind::TextLine { pattern }, handler);
    Ok(())
}

pub fn set_delay_trigger(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let id = trigger_id(vm, args, "setDelayTrigger")?;
    let handler = label_arg(args, 1, "setDelayTrigger")?.to_string();
    let millis = eval_arg(vm, args, 2, "setDelayTrigger", "3")?.as_number().max(0.0) as u64;
    let deadline = Instant::now() + Duration::from_millis(millis);
    vm.triggers_mut().set(id, TriggerKind::Delay { deadline }, handler);
    Ok(())
}

pub fn set_event_trigger(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let id = trigger_id(vm, args, "setEventTrigger")?;
    let handler = label_arg(args, 1, "setEventTrigger")?.to_string();
    let name = eval_arg(vm, args, 2, "setEventTrigger", "3")?.to_display_string();
    vm.triggers_mut().set(id, TriggerKind::Event { name }, handler);
    Ok(())
}

pub fn kill_trigger(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let id_expr = arg(args, 0, "killTrigger", "1")?;
    let id = vm.eval(id_expr)?.as_number() as i64;
    vm.triggers_mut().kill(id);
    Ok(())
}

pub fn kill_all_triggers(vm: &mut Vm, _args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    vm.triggers_mut().kill_all();
    Ok(())
}
