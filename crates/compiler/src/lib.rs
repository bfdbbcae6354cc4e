//! Script compiler (C2): lexes, parses, macro-expands, and label-resolves `.ts` script source
//! into a `Program` the runtime crate can execute.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod preprocess;

use std::collections::HashMap;

pub use ast::{Accessor, BinOp, Expr, Instr, Program, VarRef};
pub use error::{CompileError, LoadError, ParseError, PreprocessError};
pub use parser::RawStmt;

/// Supplies the text behind an `include "path"` statement. The compiler crate has no opinion
/// on where script files live — that's the embedding host's call.
pub trait IncludeResolver {
    fn resolve(&self, path: &str) -> Option<String>;
}

/// A resolver for scripts that never `include`.
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, _path: &str) -> Option<String> {
        None
    }
}

const MAX_INCLUDE_DEPTH: usize = 32;

/// Compile script source into a fully resolved `Program`, using `resolver` to satisfy any
/// `include` statements encountered.
pub fn compile_source(source: &str, resolver: &dyn IncludeResolver) -> Result<Program, CompileError> {
    let raw = parser::parse_source(source)?;
    let flattened = flatten_includes(raw, resolver, 0)?;
    let instrs = preprocess::preprocess(&flattened)?;
    Ok(build_program(instrs)?)
}

/// Convenience entry point for scripts known not to use `include`.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    compile_source(source, &NoIncludes)
}

fn flatten_includes(
    stmts: Vec<RawStmt>,
    resolver: &dyn IncludeResolver,
    depth: usize,
) -> Result<Vec<RawStmt>, CompileError> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            RawStmt::Include { path, line } => {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(ParseError::IncludeTooDeep { line, path }.into());
                }
                let text = resolver
                    .resolve(&path)
                    .ok_or_else(|| ParseError::IncludeNotFound { line, path: path.clone() })?;
                let nested = parser::parse_source(&text)?;
                let expanded = flatten_includes(nested, resolver, depth + 1)?;
                out.extend(expanded);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn build_program(instrs: Vec<Instr>) -> Result<Program, LoadError> {
    let mut labels = HashMap::new();
    for (idx, instr) in instrs.iter().enumerate() {
        if let Instr::Label(name) = instr {
            labels.insert(name.clone(), idx);
        }
    }

    for instr in &instrs {
        match instr {
            Instr::Jump(target) | Instr::Gosub(target) if !labels.contains_key(target) => {
                return Err(LoadError::UnknownLabel { label: target.clone() });
            }
            Instr::Branch { then_label, else_label, .. } => {
                if !labels.contains_key(then_label) {
                    return Err(LoadError::UnknownLabel { label: then_label.clone() });
                }
                if !labels.contains_key(else_label) {
                    return Err(LoadError::UnknownLabel { label: else_label.clone() });
                }
            }
            _ => {}
        }
    }

    Ok(Program { instrs, labels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_straight_line_script() {
        let program = compile("add depth 1\nsend \"done\"\n").unwrap();
        assert_eq!(program.instrs.len(), 2);
    }

    #[test]
    fn compiles_if_while_and_resolves_labels() {
        let source = "\
:start
if $x > 0
while $x > 0
sub x 1
end
end
goto start
";
        let program = compile(source).unwrap();
        assert!(program.label_index("start").is_some());
    }

    #[test]
    fn unknown_goto_target_is_a_load_error() {
        let err = compile("goto nowhere\n").unwrap_err();
        assert!(matches!(err, CompileError::Load(LoadError::UnknownLabel { .. })));
    }

    #[test]
    fn include_is_resolved_and_flattened() {
        struct Fixture;
        impl IncludeResolver for Fixture {
            fn resolve(&self, path: &str) -> Option<String> {
                if path == "helpers" {
                    Some("send \"from include\"\n".to_string())
                } else {
                    None
                }
            }
        }
        let program = compile_source("include \"helpers\"\nsend \"done\"\n", &Fixture).unwrap();
        assert_eq!(program.instrs.len(), 2);
    }

    #[test]
    fn missing_include_target_is_a_parse_error() {
        let err = compile_source("include \"missing\"\n", &NoIncludes).unwrap_err();
        assert!(matches!(err, CompileError::Parse(ParseError::IncludeNotFound { .. })));
    }

    #[test]
    fn unterminated_if_propagates_as_compile_error() {
        let err = compile("if $x = 1\nsend \"hi\"\n").unwrap_err();
        assert!(matches!(err, CompileError::Preprocess(PreprocessError::UnterminatedBlock { .. })));
    }
}
