use std::collections::BTreeMap;

use crate::expression::bytecode::{BuiltinId, BytecodeProgram, ConstVal, Op};
use crate::expression::error::VmError;
use crate::value::Value;

/// Read access to the variables an expression can see.
pub trait Environment {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Environment for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn lookup(&self, name: &str) -> Option<Value> {
        (**self).lookup(name)
    }
}

/// An environment with no variables.
pub struct NoEnv;

impl Environment for NoEnv {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

pub(crate) fn eval_program(p: &BytecodeProgram, env: &dyn Environment) -> Result<Value, VmError> {
    let mut stack: Vec<Value> = Vec::with_capacity(16);
    let mut pc = 0usize;

    while let Some(&op) = p.ops.get(pc) {
        pc += 1;
        match op {
            Op::PushConst(idx) => {
                let c = p
                    .consts
                    .get(idx.0 as usize)
                    .ok_or_else(|| VmError::new("const idx out of range"))?;
                stack.push(match c {
                    ConstVal::Number(v) => Value::Number(*v),
                    ConstVal::Bool(v) => Value::Bool(*v),
                    ConstVal::Str(s) => Value::String(s.clone()),
                    ConstVal::Null => Value::Null,
                    ConstVal::Undefined => Value::Undefined,
                });
            }
            Op::LoadVar(idx) => {
                let name = p
                    .name(idx)
                    .ok_or_else(|| VmError::new("name idx out of range"))?;
                stack.push(env.lookup(name).unwrap_or_default());
            }
            Op::GetMember(idx) => {
                let name = p
                    .name(idx)
                    .ok_or_else(|| VmError::new("name idx out of range"))?;
                let obj = pop(&mut stack)?;
                if obj.is_nullish() {
                    return Err(VmError::new(format!(
                        "cannot read property '{name}' of {}",
                        obj.type_name()
                    )));
                }
                stack.push(obj.member(name));
            }
            Op::GetIndex => {
                let idx = pop(&mut stack)?;
                let obj = pop(&mut stack)?;
                if obj.is_nullish() {
                    return Err(VmError::new(format!(
                        "cannot read index '{idx}' of {}",
                        obj.type_name()
                    )));
                }
                stack.push(obj.index(&idx));
            }
            Op::MakeArray(n) => {
                let items = pop_n(&mut stack, n as usize)?;
                stack.push(Value::Array(items));
            }
            Op::MakeObject(n) => {
                let flat = pop_n(&mut stack, n as usize * 2)?;
                let mut map = BTreeMap::new();
                let mut it = flat.into_iter();
                while let (Some(k), Some(v)) = (it.next(), it.next()) {
                    map.insert(k.to_display_string(), v);
                }
                stack.push(Value::Object(map));
            }

            Op::Neg => {
                let v = pop(&mut stack)?;
                stack.push(Value::Number(-v.to_number()));
            }
            Op::ToNumber => {
                let v = pop(&mut stack)?;
                stack.push(Value::Number(v.to_number()));
            }
            Op::Not => {
                let v = pop(&mut stack)?;
                stack.push(Value::Bool(!v.is_truthy()));
            }
            Op::Add => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                stack.push(add(&a, &b));
            }
            Op::Sub => bin_num(&mut stack, |a, b| a - b)?,
            Op::Mul => bin_num(&mut stack, |a, b| a * b)?,
            Op::Div => bin_num(&mut stack, |a, b| a / b)?,
            Op::Mod => bin_num(&mut stack, |a, b| a % b)?,

            Op::Eq => bin_eq(&mut stack, |a, b| a.loose_eq(b))?,
            Op::Ne => bin_eq(&mut stack, |a, b| !a.loose_eq(b))?,
            Op::StrictEq => bin_eq(&mut stack, |a, b| a.strict_eq(b))?,
            Op::StrictNe => bin_eq(&mut stack, |a, b| !a.strict_eq(b))?,
            Op::Lt => bin_cmp(&mut stack, |o| o == Some(std::cmp::Ordering::Less))?,
            Op::Le => bin_cmp(&mut stack, |o| {
                matches!(o, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal))
            })?,
            Op::Gt => bin_cmp(&mut stack, |o| o == Some(std::cmp::Ordering::Greater))?,
            Op::Ge => bin_cmp(&mut stack, |o| {
                matches!(
                    o,
                    Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                )
            })?,

            Op::Jump(target) => pc = target as usize,
            Op::JumpIfFalse(target) => {
                if !pop(&mut stack)?.is_truthy() {
                    pc = target as usize;
                }
            }
            Op::JumpIfFalseKeep(target) => {
                if !peek(&stack)?.is_truthy() {
                    pc = target as usize;
                } else {
                    stack.pop();
                }
            }
            Op::JumpIfTrueKeep(target) => {
                if peek(&stack)?.is_truthy() {
                    pc = target as usize;
                } else {
                    stack.pop();
                }
            }
            Op::JumpIfNotNullishKeep(target) => {
                if !peek(&stack)?.is_nullish() {
                    pc = target as usize;
                } else {
                    stack.pop();
                }
            }

            Op::CallBuiltin { id, argc } => {
                let args = pop_n(&mut stack, argc as usize)?;
                stack.push(call_builtin(id, args)?);
            }
        }
    }

    if stack.len() != 1 {
        return Err(VmError::new(format!(
            "stack has {} values at end of program",
            stack.len()
        )));
    }
    pop(&mut stack)
}

fn pop(stack: &mut Vec<Value>) -> Result<Value, VmError> {
    stack.pop().ok_or_else(|| VmError::new("stack underflow"))
}

fn peek(stack: &[Value]) -> Result<&Value, VmError> {
    stack.last().ok_or_else(|| VmError::new("stack underflow"))
}

/// Pop `n` values, returned in push order.
fn pop_n(stack: &mut Vec<Value>, n: usize) -> Result<Vec<Value>, VmError> {
    if stack.len() < n {
        return Err(VmError::new("stack underflow"));
    }
    Ok(stack.split_off(stack.len() - n))
}

fn add(a: &Value, b: &Value) -> Value {
    let textual = |v: &Value| {
        matches!(
            v,
            Value::String(_) | Value::Array(_) | Value::Object(_)
        )
    };
    if textual(a) || textual(b) {
        let mut s = a.to_display_string();
        s.push_str(&b.to_display_string());
        Value::String(s)
    } else {
        Value::Number(a.to_number() + b.to_number())
    }
}

fn bin_num(stack: &mut Vec<Value>, f: impl FnOnce(f64, f64) -> f64) -> Result<(), VmError> {
    let b = pop(stack)?.to_number();
    let a = pop(stack)?.to_number();
    stack.push(Value::Number(f(a, b)));
    Ok(())
}

fn bin_eq(stack: &mut Vec<Value>, f: impl FnOnce(&Value, &Value) -> bool) -> Result<(), VmError> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    stack.push(Value::Bool(f(&a, &b)));
    Ok(())
}

/// Relational comparison: two strings compare lexicographically, anything else numerically.
fn bin_cmp(
    stack: &mut Vec<Value>,
    f: impl FnOnce(Option<std::cmp::Ordering>) -> bool,
) -> Result<(), VmError> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    let ord = match (&a, &b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    };
    stack.push(Value::Bool(f(ord)));
    Ok(())
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    args.get(i).map(Value::to_number).unwrap_or(f64::NAN)
}

fn call_builtin(id: BuiltinId, args: Vec<Value>) -> Result<Value, VmError> {
    let (lo, hi) = id.arity();
    if args.len() < lo || hi.is_some_and(|hi| args.len() > hi) {
        return Err(VmError::new(format!(
            "{id:?} called with {} argument(s)",
            args.len()
        )));
    }

    let x = num_arg(&args, 0);
    let out = match id {
        BuiltinId::Abs => Value::Number(x.abs()),
        BuiltinId::Sin => Value::Number(x.sin()),
        BuiltinId::Cos => Value::Number(x.cos()),
        BuiltinId::Floor => Value::Number(x.floor()),
        BuiltinId::Ceil => Value::Number(x.ceil()),
        // Halves round toward +Infinity.
        BuiltinId::Round => Value::Number((x + 0.5).floor()),
        BuiltinId::Sqrt => Value::Number(x.sqrt()),
        BuiltinId::Pow => Value::Number(x.powf(num_arg(&args, 1))),
        BuiltinId::Min => Value::Number(fold_numbers(&args, f64::INFINITY, f64::min)),
        BuiltinId::Max => Value::Number(fold_numbers(&args, f64::NEG_INFINITY, f64::max)),
        BuiltinId::Clamp => {
            let lo = num_arg(&args, 1);
            let hi = num_arg(&args, 2);
            if lo > hi {
                return Err(VmError::new("clamp lower bound exceeds upper bound"));
            }
            Value::Number(x.max(lo).min(hi))
        }
        BuiltinId::Lerp => {
            let b = num_arg(&args, 1);
            let t = num_arg(&args, 2);
            Value::Number(x + (b - x) * t)
        }
        BuiltinId::Len => match &args[0] {
            Value::String(s) => Value::Number(s.chars().count() as f64),
            Value::Array(items) => Value::Number(items.len() as f64),
            Value::Object(map) => Value::Number(map.len() as f64),
            other => {
                return Err(VmError::new(format!("len of {}", other.type_name())));
            }
        },
        BuiltinId::Str => Value::String(args[0].to_display_string()),
        BuiltinId::Num => Value::Number(x),
        BuiltinId::Upper => Value::String(args[0].to_display_string().to_uppercase()),
        BuiltinId::Lower => Value::String(args[0].to_display_string().to_lowercase()),
        BuiltinId::Join => {
            let sep = args
                .get(1)
                .map(Value::to_display_string)
                .unwrap_or_else(|| ",".to_owned());
            match &args[0] {
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(Value::to_display_string)
                        .collect::<Vec<_>>()
                        .join(&sep),
                ),
                other => Value::String(other.to_display_string()),
            }
        }
    };
    Ok(out)
}

/// NaN in any argument poisons the result.
fn fold_numbers(args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for a in args {
        let n = a.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = f(acc, n);
    }
    acc
}

#[cfg(test)]
#[path = "../../tests/unit/expression/vm.rs"]
mod tests;
