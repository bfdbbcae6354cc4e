//! Output family (§4.4): `echo`/`clientMessage`/`displayText` share one concatenate-and-expand
//! shape and differ only in which sink they write to vs. `send`'s CR expansion.

use twx_compiler::Expr;

use crate::error::FatalKind;
use crate::sinks::{expand_star_cr, expand_star_crlf};
use crate::vm::Vm;

fn concat_args(vm: &mut Vm, args: &[Expr]) -> Result<String, FatalKind> {
    let mut out = String::new();
    for expr in args {
        out.push_str(&vm.eval(expr)?.to_display_string());
    }
    Ok(out)
}

pub fn echo(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let text = expand_star_crlf(&concat_args(vm, args)?);
    vm.output(&text);
    Ok(())
}

pub fn client_message(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    echo(vm, args, _line)
}

pub fn display_text(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    echo(vm, args, _line)
}

pub fn send(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let bytes = expand_star_cr(&concat_args(vm, args)?);
    vm.send(&bytes);
    Ok(())
}
