//! `getSector n destVar` (§4.4, §4.9): populates a structured `SectorRecord` behind `destVar`,
//! readable afterward through dotted accessors (`destVar.port.class`, `destVar.warp[k]`, …).

use twx_compiler::Expr;

use crate::commands::{dest, eval_arg};
use crate::error::FatalKind;
use crate::vm::Vm;

pub fn get_sector(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let index = eval_arg(vm, args, 0, "getSector", "2")?.as_number() as i64;
    let target = dest(args, 1, "getSector")?.clone();
    let record = vm.game().get_sector(index);
    vm.bind_sector(&target.base, record);
    Ok(())
}
