//! `setArray name N` (§4.4): declares a bounded 1-based static array.

use twx_compiler::Expr;

use crate::commands::{arg, dest};
use crate::error::FatalKind;
use crate::vm::Vm;

pub fn set_array(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let name = dest(args, 0, "setArray")?.base.clone();
    let size_expr = arg(args, 1, "setArray", "2")?;
    let size = vm.eval(size_expr)?.as_number();
    vm.declare_array(&name, size.max(0.0) as usize);
    Ok(())
}
