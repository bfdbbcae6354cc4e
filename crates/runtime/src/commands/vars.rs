//! `setVar name arg1 arg2…` (§4.4): concatenates every trailing argument stringified into the
//! named variable — Pascal TWX semantics, shared with `echo`'s concatenation shape but writing
//! to a variable instead of a sink.

use twx_compiler::Expr;
use twx_core::Value;

use crate::commands::dest;
use crate::error::FatalKind;
use crate::vm::Vm;

pub fn set_var(vm: &mut Vm, args: &[Expr], line: usize) -> Result<(), FatalKind> {
    let _ = line;
    let target = dest(args, 0, "setVar")?.clone();
    let mut out = String::new();
    for expr in &args[1..] {
        out.push_str(&vm.eval(expr)?.to_display_string());
    }
    vm.set_var(&target, Value::Str(out))
}
