//! Comparison family (§4.4): `isEqual a b dest` and friends write `"1"`/`"0"` to `dest`, using
//! the same numeric-if-either-side-looks-numeric rule as the `=`/`<`/`>` operators (§4.3).

use std::cmp::Ordering;
use twx_compiler::Expr;
use twx_core::Value;

use crate::commands::{dest, eval_arg};
use crate::error::FatalKind;
use crate::eval::compare;
use crate::vm::Vm;

fn write_bool(vm: &mut Vm, args: &[Expr], command: &'static str, f: impl FnOnce(Ordering) -> bool) -> Result<(), FatalKind> {
    let a = eval_arg(vm, args, 0, command, "3")?;
    let b = eval_arg(vm, args, 1, command, "3")?;
    let target = dest(args, 2, command)?.clone();
    vm.set_var(&target, Value::bool(f(compare(&a, &b))))
}

pub fn is_equal(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    write_bool(vm, args, "isEqual", |o| o == Ordering::Equal)
}

pub fn is_not_equal(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    write_bool(vm, args, "isNotEqual", |o| o != Ordering::Equal)
}

pub fn is_greater(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    write_bool(vm, args, "isGreater", |o| o == Ordering::Greater)
}

pub fn is_less(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    write_bool(vm, args, "isLess", |o| o == Ordering::Less)
}

pub fn is_greater_equal(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    write_bool(vm, args, "isGreaterEqual", |o| o != Ordering::Less)
}

pub fn is_less_equal(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    write_bool(vm, args, "isLessEqual", |o| o != Ordering::Greater)
}
