//! Arithmetic family (§4.4): two shapes — `add`/`subtract`/`multiply`/`divide` mutate their
//! first argument in place; `mod`/`power`/`sqr`/`abs`/`int`/`round`/`random` read their
//! operands and write a fresh destination.

use rand::Rng;
use twx_compiler::Expr;
use twx_core::{Value, banker_round};

use crate::commands::{dest, eval_arg};
use crate::error::FatalKind;
use crate::vm::Vm;

fn mutate(vm: &mut Vm, args: &[Expr], command: &'static str, f: impl FnOnce(f64, f64) -> Result<f64, FatalKind>) -> Result<(), FatalKind> {
    let target = dest(args, 0, command)?.clone();
    let operand = eval_arg(vm, args, 1, command, "2")?.as_number();
    let current = vm.read_var(&target)?.as_number();
    let result = f(current, operand)?;
    vm.set_var(&target, Value::Number(result))
}

pub fn add(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    mutate(vm, args, "add", |a, b| Ok(a + b))
}

pub fn subtract(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    mutate(vm, args, "subtract", |a, b| Ok(a - b))
}

pub fn multiply(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    mutate(vm, args, "multiply", |a, b| Ok(a * b))
}

pub fn divide(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    mutate(vm, args, "divide", |a, b| if b == 0.0 { Err(FatalKind::DivideByZero) } else { Ok(a / b) })
}

pub fn modulo(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let a = eval_arg(vm, args, 0, "mod", "3")?.as_number();
    let b = eval_arg(vm, args, 1, "mod", "3")?.as_number();
    if b == 0.0 {
        return Err(FatalKind::ModuloByZero);
    }
    let result = a - b * (a / b).trunc();
    let target = dest(args, 2, "mod")?.clone();
    vm.set_var(&target, Value::Number(result))
}

pub fn power(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let base = eval_arg(vm, args, 0, "power", "3")?.as_number();
    let exponent = eval_arg(vm, args, 1, "power", "3")?.as_number();
    if base == 0.0 && exponent < 0.0 {
        return Err(FatalKind::IllegalPower { base, exponent });
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(FatalKind::IllegalPower { base, exponent });
    }
    let target = dest(args, 2, "power")?.clone();
    vm.set_var(&target, Value::Number(base.powf(exponent)))
}

pub fn sqr(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let x = eval_arg(vm, args, 0, "sqr", "2")?.as_number();
    if x < 0.0 {
        return Err(FatalKind::NegativeSquareRoot { value: x });
    }
    let target = dest(args, 1, "sqr")?.clone();
    vm.set_var(&target, Value::Number(x.sqrt()))
}

pub fn abs(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let x = eval_arg(vm, args, 0, "abs", "2")?.as_number();
    let target = dest(args, 1, "abs")?.clone();
    vm.set_var(&target, Value::Number(x.abs()))
}

pub fn int(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let x = eval_arg(vm, args, 0, "int", "2")?.as_number();
    let target = dest(args, 1, "int")?.clone();
    vm.set_var(&target, Value::Number(x.trunc()))
}

pub fn round(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let x = eval_arg(vm, args, 0, "round", "2")?.as_number();
    let target = dest(args, 1, "round")?.clone();
    vm.set_var(&target, Value::Number(banker_round(x)))
}

pub fn random(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let max = eval_arg(vm, args, 0, "random", "2")?.as_number();
    let target = dest(args, 1, "random")?.clone();
    let bound = max.trunc() as i64;
    let value = if bound < 1 { 0 } else { rand::thread_rng().gen_range(1..=bound) };
    vm.set_var(&target, Value::Number(value as f64))
}
