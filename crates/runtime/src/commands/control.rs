//! Control family (§4.4, §4.6): `pause`/`getInput`/`waitFor` are the only control-flow commands
//! left in the dispatcher — `goto`/`gosub`/`return`/`halt` are lowered to dedicated `Instr`
//! variants during preprocessing and never reach here.

use twx_compiler::Expr;

use crate::commands::{dest, opt_arg};
use crate::error::FatalKind;
use crate::vm::Vm;

pub fn pause(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let millis = match opt_arg(args, 0) {
        Some(e) => Some(vm.eval(e)?.as_number().max(0.0) as u64),
        None => None,
    };
    vm.begin_pause(millis);
    Ok(())
}

/// `getInput dest prompt [default]`: renders `"<prompt> [<default>]"` when a default is given,
/// else just `"<prompt>"` (§4.4).
pub fn get_input(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "getInput")?.clone();
    let prompt_text = match args.get(1) {
        Some(e) => vm.eval(e)?.to_display_string(),
        None => return Err(FatalKind::Arity { command: "getInput".into(), expected: "2 or 3", got: args.len() }),
    };
    let default = match opt_arg(args, 2) {
        Some(e) => vm.eval(e)?.to_display_string(),
        None => String::new(),
    };

    let rendered = if args.len() >= 3 {
        format!("{prompt_text} [{default}]")
    } else {
        prompt_text
    };
    vm.begin_wait_for_input(rendered, default, target);
    Ok(())
}

pub fn wait_for(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let pattern = match args.first() {
        Some(e) => vm.eval(e)?.to_display_string(),
        None => return Err(FatalKind::Arity { command: "waitFor".into(), expected: "1", got: 0 }),
    };
    vm.begin_wait_for_text(pattern);
    Ok(())
}
