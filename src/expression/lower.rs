use crate::expression::ast::{BinaryOp, Expr, Lit, LogicalOp, UnaryOp};
use crate::expression::bytecode::{BuiltinId, BytecodeProgram, ConstVal, Op};
use crate::expression::error::ExprError;

pub(crate) fn lower_to_bytecode(expr: &Expr) -> Result<BytecodeProgram, ExprError> {
    let mut p = BytecodeProgram::new();
    lower_expr(expr, &mut p)?;
    Ok(p)
}

fn lower_expr(e: &Expr, out: &mut BytecodeProgram) -> Result<(), ExprError> {
    match e {
        Expr::Lit(lit) => {
            let c = match lit {
                Lit::Number(v) => ConstVal::Number(*v),
                Lit::Bool(v) => ConstVal::Bool(*v),
                Lit::Str(s) => ConstVal::Str(s.clone()),
                Lit::Null => ConstVal::Null,
                Lit::Undefined => ConstVal::Undefined,
            };
            let idx = out.push_const(c);
            out.ops.push(Op::PushConst(idx));
        }
        Expr::Var(name) => {
            let idx = out.intern(name);
            out.ops.push(Op::LoadVar(idx));
        }
        Expr::Member { object, name } => {
            lower_expr(object, out)?;
            let idx = out.intern(name);
            out.ops.push(Op::GetMember(idx));
        }
        Expr::Index { object, index } => {
            lower_expr(object, out)?;
            lower_expr(index, out)?;
            out.ops.push(Op::GetIndex);
        }
        Expr::Array(items) => {
            for item in items {
                lower_expr(item, out)?;
            }
            out.ops.push(Op::MakeArray(items.len() as u32));
        }
        Expr::Object(entries) => {
            for (key, value) in entries {
                let idx = out.push_const(ConstVal::Str(key.clone()));
                out.ops.push(Op::PushConst(idx));
                lower_expr(value, out)?;
            }
            out.ops.push(Op::MakeObject(entries.len() as u32));
        }
        Expr::Unary { op, expr } => {
            lower_expr(expr, out)?;
            out.ops.push(match op {
                UnaryOp::Neg => Op::Neg,
                UnaryOp::Plus => Op::ToNumber,
                UnaryOp::Not => Op::Not,
            });
        }
        Expr::Binary { op, left, right } => {
            lower_expr(left, out)?;
            lower_expr(right, out)?;
            out.ops.push(match op {
                BinaryOp::Add => Op::Add,
                BinaryOp::Sub => Op::Sub,
                BinaryOp::Mul => Op::Mul,
                BinaryOp::Div => Op::Div,
                BinaryOp::Mod => Op::Mod,
                BinaryOp::Eq => Op::Eq,
                BinaryOp::Ne => Op::Ne,
                BinaryOp::StrictEq => Op::StrictEq,
                BinaryOp::StrictNe => Op::StrictNe,
                BinaryOp::Lt => Op::Lt,
                BinaryOp::Le => Op::Le,
                BinaryOp::Gt => Op::Gt,
                BinaryOp::Ge => Op::Ge,
            });
        }
        Expr::Logical { op, left, right } => {
            lower_expr(left, out)?;
            let at = out.ops.len();
            out.ops.push(match op {
                LogicalOp::And => Op::JumpIfFalseKeep(0),
                LogicalOp::Or => Op::JumpIfTrueKeep(0),
                LogicalOp::Nullish => Op::JumpIfNotNullishKeep(0),
            });
            lower_expr(right, out)?;
            patch(out, at);
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            lower_expr(cond, out)?;
            let to_else = out.ops.len();
            out.ops.push(Op::JumpIfFalse(0));
            lower_expr(then, out)?;
            let to_end = out.ops.len();
            out.ops.push(Op::Jump(0));
            patch(out, to_else);
            lower_expr(otherwise, out)?;
            patch(out, to_end);
        }
        Expr::Call { func, args } => {
            let Some(id) = BuiltinId::from_name(func) else {
                return Err(ExprError::new(
                    0,
                    format!("unknown builtin function \"{func}\""),
                ));
            };
            let (lo, hi) = id.arity();
            if args.len() < lo || hi.is_some_and(|hi| args.len() > hi) {
                return Err(ExprError::new(
                    0,
                    format!("{func} called with {} argument(s)", args.len()),
                ));
            }
            let argc = u8::try_from(args.len())
                .map_err(|_| ExprError::new(0, format!("too many arguments to {func}")))?;
            for a in args {
                lower_expr(a, out)?;
            }
            out.ops.push(Op::CallBuiltin { id, argc });
        }
    }
    Ok(())
}

/// Point the jump at `at` to the next op to be emitted.
fn patch(out: &mut BytecodeProgram, at: usize) {
    let target = out.ops.len() as u32;
    if let Some(op) = out.ops.get_mut(at) {
        *op = match *op {
            Op::Jump(_) => Op::Jump(target),
            Op::JumpIfFalse(_) => Op::JumpIfFalse(target),
            Op::JumpIfFalseKeep(_) => Op::JumpIfFalseKeep(target),
            Op::JumpIfTrueKeep(_) => Op::JumpIfTrueKeep(target),
            Op::JumpIfNotNullishKeep(_) => Op::JumpIfNotNullishKeep(target),
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse_expr;

    #[test]
    fn interns_repeated_names_once() {
        let ast = parse_expr("a + a * b").unwrap();
        let bc = lower_to_bytecode(&ast).unwrap();
        assert_eq!(bc.names, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(bc.free_variables(), vec!["a", "b"]);
    }

    #[test]
    fn member_names_are_not_free_variables() {
        let ast = parse_expr("item.width").unwrap();
        let bc = lower_to_bytecode(&ast).unwrap();
        assert_eq!(bc.free_variables(), vec!["item"]);
    }

    #[test]
    fn rejects_unknown_builtins_and_bad_arity() {
        let ast = parse_expr("frobnicate(1)").unwrap();
        assert!(lower_to_bytecode(&ast).is_err());
        let ast = parse_expr("clamp(1, 2)").unwrap();
        assert!(lower_to_bytecode(&ast).is_err());
    }

    #[test]
    fn conditional_jumps_are_patched() {
        let ast = parse_expr("c ? 1 : 2").unwrap();
        let bc = lower_to_bytecode(&ast).unwrap();
        assert!(bc.ops.iter().all(|op| !matches!(op, Op::Jump(0) | Op::JumpIfFalse(0))));
    }
}
