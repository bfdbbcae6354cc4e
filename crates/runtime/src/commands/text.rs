//! Text family (§4.4): substring extraction, word splitting, stripping, merging, and case
//! conversion, all operating on evaluated source strings and writing a fresh destination.

use twx_compiler::Expr;
use twx_core::Value;

use crate::commands::{dest, eval_arg, opt_arg};
use crate::error::FatalKind;
use crate::vm::Vm;

/// `cutText src dest start length`: 1-based positions. `length 0` yields `""`; `start` past the
/// end of `src` is fatal; a `start + length` overrun clamps to the end of `src` (§4.4).
pub fn cut_text(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let src = eval_arg(vm, args, 0, "cutText", "4")?.to_display_string();
    let target = dest(args, 1, "cutText")?.clone();
    let start = eval_arg(vm, args, 2, "cutText", "4")?.as_number() as i64;
    let length = eval_arg(vm, args, 3, "cutText", "4")?.as_number() as i64;

    if length <= 0 {
        return vm.set_var(&target, Value::empty());
    }
    let chars: Vec<char> = src.chars().collect();
    let len = chars.len() as i64;
    if start > len {
        return Err(FatalKind::CutTextStartBeyondEnd);
    }
    let start_idx = (start.max(1) - 1) as usize;
    let end_idx = if start + length > len + 1 { chars.len() } else { start_idx + length as usize };
    let result: String = chars[start_idx..end_idx.min(chars.len())].iter().collect();
    vm.set_var(&target, Value::str(result))
}

/// `getWord src dest n [default]`: whitespace-run-collapsed, 1-based. `n <= 0` or out-of-range
/// yields `default` (or `"0"` if none given).
pub fn get_word(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let src = eval_arg(vm, args, 0, "getWord", "3 or 4")?.to_display_string();
    let target = dest(args, 1, "getWord")?.clone();
    let n = eval_arg(vm, args, 2, "getWord", "3 or 4")?.as_number() as i64;
    let default = match opt_arg(args, 3) {
        Some(e) => vm.eval(e)?.to_display_string(),
        None => "0".to_string(),
    };

    if n <= 0 {
        return vm.set_var(&target, Value::str(default));
    }
    let words: Vec<&str> = src.split_whitespace().collect();
    let value = words.get((n - 1) as usize).map(|w| w.to_string()).unwrap_or(default);
    vm.set_var(&target, Value::str(value))
}

/// `stripText var needle`: removes every occurrence of `needle` from `var`'s current text.
pub fn strip_text(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let target = dest(args, 0, "stripText")?.clone();
    let needle = eval_arg(vm, args, 1, "stripText", "2")?.to_display_string();
    let current = vm.read_var(&target)?.to_display_string();
    vm.set_var(&target, Value::str(current.replace(&needle, "")))
}

/// `mergeText a b dest`: concatenates both operands stringified.
pub fn merge_text(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let a = eval_arg(vm, args, 0, "mergeText", "3")?.to_display_string();
    let b = eval_arg(vm, args, 1, "mergeText", "3")?.to_display_string();
    let target = dest(args, 2, "mergeText")?.clone();
    vm.set_var(&target, Value::str(format!("{a}{b}")))
}

pub fn upper(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let s = eval_arg(vm, args, 0, "upper", "2")?.to_display_string();
    let target = dest(args, 1, "upper")?.clone();
    vm.set_var(&target, Value::str(s.to_uppercase()))
}

pub fn lower(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let s = eval_arg(vm, args, 0, "lower", "2")?.to_display_string();
    let target = dest(args, 1, "lower")?.clone();
    vm.set_var(&target, Value::str(s.to_lowercase()))
}

pub fn len(vm: &mut Vm, args: &[Expr], _line: usize) -> Result<(), FatalKind> {
    let s = eval_arg(vm, args, 0, "len", "2")?.to_display_string();
    let target = dest(args, 1, "len")?.clone();
    vm.set_var(&target, Value::Number(s.chars().count() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::persistence::MemoryStore;
    use crate::sinks::BufferSink;
    use twx_core::StaticGameState;

    fn run(source: &str) -> Vm {
        let program = twx_compiler::compile(source).unwrap();
        let mut vm = Vm::new(
            program,
            Box::new(StaticGameState::new(0)),
            Box::new(MemoryStore::new()),
            Box::new(BufferSink::new()),
            Box::new(BufferSink::new()),
            VmConfig::default(),
        );
        vm.execute().unwrap();
        vm
    }

    #[test]
    fn cut_text_clamps_overrunning_length() {
        let vm = run("setVar src \"Hello, World\"\ncutText src dest 8 100\nhalt\n");
        assert_eq!(vm.store().get(&twx_core::Path::scalar("dest")).unwrap(), Value::str("World"));
    }

    #[test]
    fn cut_text_zero_length_is_empty() {
        let vm = run("setVar src \"Hello\"\ncutText src dest 1 0\nhalt\n");
        assert_eq!(vm.store().get(&twx_core::Path::scalar("dest")).unwrap(), Value::empty());
    }

    #[test]
    fn get_word_collapses_whitespace_runs() {
        let vm = run("setVar src \"Trade  Wars   2002\"\ngetWord src w2 2\nhalt\n");
        assert_eq!(vm.store().get(&twx_core::Path::scalar("w2")).unwrap(), Value::str("Wars"));
    }

    #[test]
    fn get_word_out_of_range_uses_default() {
        let vm = run("setVar src \"one two\"\ngetWord src w5 5 \"none\"\nhalt\n");
        assert_eq!(vm.store().get(&twx_core::Path::scalar("w5")).unwrap(), Value::str("none"));
    }
}
