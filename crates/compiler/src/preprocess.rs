//! Macro expansion (C2): lowers the block-structured `if/elseif/else/end` and `while/end`
//! statements produced by the parser into the flat, label-addressed `Instr` sequence the VM
//! actually steps through. Imbalanced blocks are rejected here, before a single `Instr` is
//! handed to the loader (§4.2).

use crate::ast::{Expr, Instr};
use crate::error::PreprocessError;
use crate::parser::RawStmt;

/// A bare label argument, e.g. the `start` in `goto start` — a plain variable reference with
/// no subscripts or dotted accessors, used purely as a label name rather than evaluated.
fn bare_label(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Var(v) if v.subscripts.is_empty() && v.accessors.is_empty() => Some(v.base.as_str()),
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum BlockKind {
    TopLevel,
    If,
    While,
}

/// `goto`/`gosub`/`return`/`halt` are control transfers, not dispatcher commands — the loader
/// needs their label targets as plain strings so it can validate them, so they're rewritten
/// into dedicated `Instr` variants here rather than left as `Instr::Call`.
fn lower_call(command: &str, args: &[Expr], line: usize) -> Result<Instr, PreprocessError> {
    match command.to_lowercase().as_str() {
        "goto" => {
            let label = args
                .first()
                .filter(|_| args.len() == 1)
                .and_then(bare_label)
                .ok_or_else(|| PreprocessError::InvalidControlTransfer { line, command: command.to_string() })?;
            Ok(Instr::Jump(label.to_string()))
        }
        "gosub" => {
            let label = args
                .first()
                .filter(|_| args.len() == 1)
                .and_then(bare_label)
                .ok_or_else(|| PreprocessError::InvalidControlTransfer { line, command: command.to_string() })?;
            Ok(Instr::Gosub(label.to_string()))
        }
        "return" if args.is_empty() => Ok(Instr::Return),
        "halt" if args.is_empty() => Ok(Instr::Halt),
        _ => Ok(Instr::Call { command: command.to_string(), args: args.to_vec(), line }),
    }
}

pub fn preprocess(stmts: &[RawStmt]) -> Result<Vec<Instr>, PreprocessError> {
    let mut lowerer = Lowerer { stmts, pos: 0, next_id: 0 };
    let mut out = Vec::new();
    lowerer.lower_block(&mut out, BlockKind::TopLevel)?;
    if lowerer.pos != stmts.len() {
        // Only reachable if a stray End/ElseIf/Else slipped through; surface it plainly.
        let line = lowerer.current_line();
        return Err(PreprocessError::EndWithoutOpenBlock { line });
    }
    Ok(out)
}

struct Lowerer<'a> {
    stmts: &'a [RawStmt],
    pos: usize,
    next_id: usize,
}

impl<'a> Lowerer<'a> {
    fn fresh_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn current_line(&self) -> usize {
        match self.stmts.get(self.pos) {
            Some(RawStmt::Label { line, .. })
            | Some(RawStmt::If { line, .. })
            | Some(RawStmt::ElseIf { line, .. })
            | Some(RawStmt::Else { line })
            | Some(RawStmt::While { line, .. })
            | Some(RawStmt::End { line })
            | Some(RawStmt::Include { line, .. })
            | Some(RawStmt::Assign { line, .. })
            | Some(RawStmt::Call { line, .. }) => *line,
            None => 0,
        }
    }

    fn lower_block(&mut self, out: &mut Vec<Instr>, kind: BlockKind) -> Result<(), PreprocessError> {
        loop {
            let Some(stmt) = self.stmts.get(self.pos) else { return Ok(()) };
            match stmt {
                RawStmt::Label { name, .. } => {
                    out.push(Instr::Label(name.clone()));
                    self.pos += 1;
                }
                RawStmt::Assign { target, expr, line } => {
                    out.push(Instr::Assign { target: target.clone(), expr: expr.clone(), line: *line });
                    self.pos += 1;
                }
                RawStmt::Call { command, args, line } => {
                    out.push(lower_call(command, args, *line)?);
                    self.pos += 1;
                }
                RawStmt::If { cond, line } => {
                    let cond = cond.clone();
                    let line = *line;
                    self.pos += 1;
                    self.lower_if(out, cond, line)?;
                }
                RawStmt::While { cond, line } => {
                    let cond = cond.clone();
                    let line = *line;
                    self.pos += 1;
                    self.lower_while(out, cond, line)?;
                }
                RawStmt::End { line } => {
                    if kind == BlockKind::TopLevel {
                        return Err(PreprocessError::EndWithoutOpenBlock { line: *line });
                    }
                    return Ok(());
                }
                RawStmt::ElseIf { line, .. } => {
                    if kind == BlockKind::If {
                        return Ok(());
                    }
                    return Err(PreprocessError::ElseIfWithoutIf { line: *line });
                }
                RawStmt::Else { line } => {
                    if kind == BlockKind::If {
                        return Ok(());
                    }
                    return Err(PreprocessError::ElseWithoutIf { line: *line });
                }
                RawStmt::Include { .. } => {
                    unreachable!("includes must be flattened before preprocessing")
                }
            }
        }
    }

    fn lower_if(&mut self, out: &mut Vec<Instr>, first_cond: crate::ast::Expr, line: usize) -> Result<(), PreprocessError> {
        let id = self.fresh_id();
        let end_label = format!("__if_{id}_end");
        let mut cond = first_cond;
        let mut branch_idx = 0usize;

        loop {
            let then_label = format!("__if_{id}_then_{branch_idx}");
            let next_label = format!("__if_{id}_check_{branch_idx}");
            out.push(Instr::Branch {
                cond,
                then_label: then_label.clone(),
                else_label: next_label.clone(),
                line,
            });
            out.push(Instr::Label(then_label));
            self.lower_block(out, BlockKind::If)?;
            out.push(Instr::Jump(end_label.clone()));
            out.push(Instr::Label(next_label));
            branch_idx += 1;

            match self.stmts.get(self.pos) {
                Some(RawStmt::ElseIf { cond: c, .. }) => {
                    cond = c.clone();
                    self.pos += 1;
                }
                Some(RawStmt::Else { .. }) => {
                    self.pos += 1;
                    self.lower_block(out, BlockKind::If)?;
                    break;
                }
                Some(RawStmt::End { .. }) => break,
                _ => return Err(PreprocessError::UnterminatedBlock { line, construct: "if" }),
            }
        }

        match self.stmts.get(self.pos) {
            Some(RawStmt::End { .. }) => self.pos += 1,
            _ => return Err(PreprocessError::UnterminatedBlock { line, construct: "if" }),
        }
        out.push(Instr::Label(end_label));
        Ok(())
    }

    fn lower_while(&mut self, out: &mut Vec<Instr>, cond: crate::ast::Expr, line: usize) -> Result<(), PreprocessError> {
        let id = self.fresh_id();
        let top_label = format!("__while_{id}_top");
        let body_label = format!("__while_{id}_body");
        let end_label = format!("__while_{id}_end");

        out.push(Instr::Label(top_label.clone()));
        out.push(Instr::Branch {
            cond,
            then_label: body_label.clone(),
            else_label: end_label.clone(),
            line,
        });
        out.push(Instr::Label(body_label));
        self.lower_block(out, BlockKind::While)?;
        out.push(Instr::Jump(top_label));

        match self.stmts.get(self.pos) {
            Some(RawStmt::End { .. }) => self.pos += 1,
            _ => return Err(PreprocessError::UnterminatedBlock { line, construct: "while" }),
        }
        out.push(Instr::Label(end_label));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    #[test]
    fn simple_if_expands_to_branch_and_labels() {
        let stmts = parse_source("if $x > 0\nsend \"positive\"\nend\n").unwrap();
        let instrs = preprocess(&stmts).unwrap();
        assert!(matches!(instrs[0], Instr::Branch { .. }));
        assert!(instrs.iter().any(|i| matches!(i, Instr::Call { command, .. } if command == "send")));
    }

    #[test]
    fn if_elseif_else_chain_lowers_without_error() {
        let stmts = parse_source(
            "if $x = 1\nsend \"one\"\nelseif $x = 2\nsend \"two\"\nelse\nsend \"other\"\nend\n",
        )
        .unwrap();
        assert!(preprocess(&stmts).is_ok());
    }

    #[test]
    fn while_loop_jumps_back_to_top() {
        let stmts = parse_source("while $x < 10\nadd x 1\nend\n").unwrap();
        let instrs = preprocess(&stmts).unwrap();
        let top_label = match &instrs[0] {
            Instr::Label(name) => name.clone(),
            other => panic!("expected leading Label, got {other:?}"),
        };
        assert!(instrs.iter().any(|i| matches!(i, Instr::Jump(target) if *target == top_label)));
    }

    #[test]
    fn end_without_open_block_is_an_error() {
        let stmts = parse_source("end\n").unwrap();
        assert_eq!(preprocess(&stmts), Err(PreprocessError::EndWithoutOpenBlock { line: 1 }));
    }

    #[test]
    fn unterminated_if_is_an_error() {
        let stmts = parse_source("if $x = 1\nsend \"hi\"\n").unwrap();
        assert!(matches!(preprocess(&stmts), Err(PreprocessError::UnterminatedBlock { construct: "if", .. })));
    }

    #[test]
    fn goto_and_gosub_lower_to_dedicated_instructions() {
        let stmts = parse_source(":there\ngoto there\ngosub there\nreturn\nhalt\n").unwrap();
        let instrs = preprocess(&stmts).unwrap();
        assert!(matches!(instrs[1], Instr::Jump(ref l) if l == "there"));
        assert!(matches!(instrs[2], Instr::Gosub(ref l) if l == "there"));
        assert!(matches!(instrs[3], Instr::Return));
        assert!(matches!(instrs[4], Instr::Halt));
    }

    #[test]
    fn else_without_if_is_an_error() {
        let stmts = parse_source("else\n").unwrap();
        assert_eq!(preprocess(&stmts), Err(PreprocessError::ElseWithoutIf { line: 1 }));
    }
}
