//! `saveVar`/`loadVar` (§4.4, §4.8): thin adapters from the dispatcher onto `Vm`'s persistence
//! helpers, which do the actual store round-trip against the qualified canonical name.

use twx_compiler::Expr;

use crate::commands::dest;
use crate::error::FatalKind;
use crate::vm::Vm;

pub fn save_var(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "saveVar")?.clone();
    let path = vm.resolve_write_path(&target)?;
    vm.persistence_save(&path)
}

/// Missing key is a silent no-op (§7): `Vm::persistence_load` already leaves the variable
/// untouched when the store has nothing for the qualified name.
pub fn load_var(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "loadVar")?.clone();
    let path = vm.resolve_write_path(&target)?;
    vm.persistence_load(&path)
}
