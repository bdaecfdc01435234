//! Reference interpreter for lowered IR.
//!
//! Runs functions straight out of an analyzed module, so tests can check
//! what compiled code computes without a WebAssembly engine. It covers the
//! node kinds that survive the pipeline and the `i32` instructions the
//! prelude's operator macros expand to. Match dispatch follows the emitted
//! code: an enum match indexes its table with `discriminant mod K`.

use std::cell::RefCell;
use std::rc::Rc;

use gi_ir::{AsmTerm, Binding, Expr, ExprKind, FuncId, LabelId, MatchEnum, MatchInt, Module, VarId};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    /// A struct or array; fields in declaration order.
    Ref(Rc<RefCell<Vec<Value>>>),
    Void,
}

impl Value {
    pub fn object(fields: Vec<Value>) -> Self {
        Value::Ref(Rc::new(RefCell::new(fields)))
    }

    pub fn int(&self) -> i64 {
        match self {
            Value::Int(value) => *value,
            other => panic!("expected an integer, got {other:?}"),
        }
    }

    /// Field `index` of an object.
    pub fn field(&self, index: usize) -> Value {
        match self {
            Value::Ref(fields) => fields.borrow()[index].clone(),
            other => panic!("expected an object, got {other:?}"),
        }
    }

    fn set_field(&self, index: usize, value: Value) {
        match self {
            Value::Ref(fields) => fields.borrow_mut()[index] = value,
            other => panic!("expected an object, got {other:?}"),
        }
    }
}

/// Non-local exits.
enum Flow {
    Break(LabelId, Value),
    Return(Value),
}

type Run<T> = Result<T, Flow>;

type Frame = FxHashMap<VarId, Value>;

pub struct Interpreter<'m> {
    module: &'m Module,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Interpreter { module }
    }

    /// Call the root-scope function `name`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Value {
        match self.module.scopes[self.module.root].value(name) {
            Some(Binding::Func(func)) => self.call_func(*func, args),
            other => panic!("`{name}` is not a single function: {other:?}"),
        }
    }

    fn call_func(&self, func: FuncId, args: Vec<Value>) -> Value {
        let def = &self.module.funcs[func];
        let body = def
            .lowered_body()
            .unwrap_or_else(|| panic!("`{}` has no lowered body", def.name));
        let mut frame: Frame = def.params.iter().copied().zip(args).collect();
        match self.block(body, &mut frame) {
            Ok(value) | Err(Flow::Return(value)) => value,
            Err(Flow::Break(label, _)) => panic!("break to {label:?} left `{}`", def.name),
        }
    }

    fn block(&self, body: &[Expr], frame: &mut Frame) -> Run<Value> {
        let mut last = Value::Void;
        for expr in body {
            last = self.eval(expr, frame)?;
        }
        Ok(last)
    }

    /// Run `body`, stopping at a break to `label`.
    fn labeled(&self, label: LabelId, body: &[Expr], frame: &mut Frame) -> Run<Value> {
        match self.block(body, frame) {
            Err(Flow::Break(target, value)) if target == label => Ok(value),
            other => other,
        }
    }

    fn eval_all(&self, exprs: &[Expr], frame: &mut Frame) -> Run<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr, frame)).collect()
    }

    fn eval(&self, expr: &Expr, frame: &mut Frame) -> Run<Value> {
        Ok(match &expr.kind {
            ExprKind::Int(value) => Value::Int(*value),
            ExprKind::Str(text) => {
                Value::object(text.bytes().map(|byte| Value::Int(i64::from(byte))).collect())
            }
            ExprKind::Nop => Value::Void,
            // Locals start out zero, as in the target.
            ExprKind::Var(var) => frame.get(var).cloned().unwrap_or(Value::Int(0)),
            ExprKind::Const(id) => Value::Int(self.module.consts[*id].value.unwrap()),
            ExprKind::FunctionCall { func, args } => {
                let args = self.eval_all(args, frame)?;
                self.call_func(*func, args)
            }
            ExprKind::TupleInst { fields } => Value::object(self.eval_all(fields, frame)?),
            ExprKind::GetField { obj, index } => {
                self.eval(obj, frame)?.field(*index as usize)
            }
            ExprKind::SetField { obj, index, value } => {
                let obj = self.eval(obj, frame)?;
                let value = self.eval(value, frame)?;
                obj.set_field(*index as usize, value);
                Value::Void
            }
            ExprKind::GetItem { obj, index } => {
                let obj = self.eval(obj, frame)?;
                let index = self.eval(index, frame)?.int();
                obj.field(usize::try_from(index).unwrap())
            }
            ExprKind::SetItem { obj, index, value } => {
                let obj = self.eval(obj, frame)?;
                let index = self.eval(index, frame)?.int();
                let value = self.eval(value, frame)?;
                obj.set_field(usize::try_from(index).unwrap(), value);
                Value::Void
            }
            ExprKind::SetLocal { var, value } => {
                let value = self.eval(value, frame)?;
                frame.insert(*var, value);
                Value::Void
            }
            ExprKind::Retag(inner) => self.eval(inner, frame)?,
            ExprKind::Block { label, body } => self.labeled(*label, body, frame)?,
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.eval(cond, frame)?.int() != 0 {
                    self.block(then_body, frame)?
                } else {
                    self.block(else_body, frame)?
                }
            }
            ExprKind::Loop { label, cond, body } => {
                while self.eval(cond, frame)?.int() != 0 {
                    match self.block(body, frame) {
                        Ok(_) => {}
                        Err(Flow::Break(target, _)) if target == *label => break,
                        Err(flow) => return Err(flow),
                    }
                }
                Value::Void
            }
            ExprKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, frame)?,
                    None => Value::Void,
                };
                return Err(Flow::Return(value));
            }
            ExprKind::Break { label, value } => {
                let value = match value {
                    Some(value) => self.eval(value, frame)?,
                    None => Value::Void,
                };
                return Err(Flow::Break(*label, value));
            }
            ExprKind::Drop(inner) => {
                self.eval(inner, frame)?;
                Value::Void
            }
            ExprKind::MatchEnum(m) => self.enum_match(m, frame)?,
            ExprKind::MatchInt(m) => self.int_match(m, frame)?,
            ExprKind::Asm(terms) => {
                let mut stack = Vec::new();
                for term in terms {
                    self.asm(term, frame, &mut stack)?;
                }
                stack.pop().map_or(Value::Void, Value::Int)
            }
            other => panic!("{} left after lowering", other.describe()),
        })
    }

    fn enum_match(&self, m: &MatchEnum, frame: &mut Frame) -> Run<Value> {
        let scrutinee = self.eval(&m.scrutinee, frame)?;
        frame.insert(m.tmp, scrutinee.clone());
        let discriminant = u64::try_from(scrutinee.field(0).int()).unwrap();
        let entry = usize::try_from(discriminant % m.table.len() as u64).unwrap();
        let Some(arm) = m.table[entry] else {
            return Ok(Value::Void);
        };
        let arm = &m.arms[arm];
        for &(var, field) in &arm.bindings {
            frame.insert(var, scrutinee.field(field as usize));
        }
        self.labeled(m.label, &arm.body, frame)
    }

    fn int_match(&self, m: &MatchInt, frame: &mut Frame) -> Run<Value> {
        let scrutinee = self.eval(&m.scrutinee, frame)?;
        frame.insert(m.tmp, scrutinee.clone());
        let value = scrutinee.int();
        match m.arms.iter().find(|arm| arm.value == value) {
            Some(arm) => self.labeled(m.label, &arm.body, frame),
            None => match &m.fallback {
                Some(fallback) => self.labeled(m.label, fallback, frame),
                None => Ok(Value::Void),
            },
        }
    }

    /// Folded and flat instructions over an integer stack.
    fn asm(&self, term: &AsmTerm, frame: &mut Frame, stack: &mut Vec<i64>) -> Run<()> {
        match term {
            AsmTerm::Expr(expr) => stack.push(self.eval(expr, frame)?.int()),
            AsmTerm::Atom(op) => apply(op, stack),
            AsmTerm::List(items) => {
                let Some(AsmTerm::Atom(op)) = items.first() else {
                    panic!("instruction without an opcode: {items:?}");
                };
                if op.ends_with(".const") {
                    let Some(AsmTerm::Int(value)) = items.get(1) else {
                        panic!("`{op}` without an immediate");
                    };
                    stack.push(*value);
                    return Ok(());
                }
                for item in &items[1..] {
                    self.asm(item, frame, stack)?;
                }
                apply(op, stack);
            }
            AsmTerm::Int(_) | AsmTerm::Str(_) => panic!("stray immediate {term:?}"),
        }
        Ok(())
    }
}

fn apply(op: &str, stack: &mut Vec<i64>) {
    if op == "i32.eqz" {
        let value = stack.pop().unwrap();
        stack.push(i64::from(value == 0));
        return;
    }
    let b = i32::try_from(stack.pop().unwrap()).unwrap();
    let a = i32::try_from(stack.pop().unwrap()).unwrap();
    let result = match op {
        "i32.add" => a.wrapping_add(b),
        "i32.sub" => a.wrapping_sub(b),
        "i32.mul" => a.wrapping_mul(b),
        "i32.eq" => i32::from(a == b),
        "i32.ne" => i32::from(a != b),
        "i32.lt_s" => i32::from(a < b),
        _ => panic!("unsupported instruction `{op}`"),
    };
    stack.push(i64::from(result));
}
