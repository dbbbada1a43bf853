//! Tree-walking evaluator for Opal programs.
//!
//! The evaluator is a recursive descent over the AST with one case per node
//! kind. Each step produces an [`Outcome`]; function returns and fatal
//! errors unwind as [`Signal`] values through the `Err` arm, so nested
//! blocks and loop bodies short-circuit without host exceptions. The run is
//! single-threaded and synchronous; the only external resource is the
//! console used by the built-in functions.

pub mod builtins;
pub mod error;
pub mod ops;
pub mod outcome;
pub mod reference;
pub mod scope;
pub mod value;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use crate::parser::ast::{
    Ast, BinaryOp, FunctionRegistry, IncDecOp, Literal, Program, StructRegistry, UserFunction,
};

pub use builtins::{Console, NativeRegistry, StdConsole};
pub use error::RuntimeError;
pub use outcome::{ExecResult, Outcome, Signal};
pub use reference::{Reference, SlotRef};
pub use scope::ScopeStack;
pub use value::{compare_values, values_equal, ScalarType, StructInstance, Value};

/// Executes one parsed program.
///
/// The struct and function registries are read-only inputs threaded in at
/// construction; the scope stack and the value graph reachable from it are
/// the only mutable state.
pub struct Evaluator<'p> {
    scope: ScopeStack,
    structs: &'p StructRegistry,
    functions: &'p FunctionRegistry,
    natives: NativeRegistry,
    console: Box<dyn Console>,
}

impl<'p> Evaluator<'p> {
    /// Create an evaluator for `program`, writing through `console`.
    pub fn new(program: &'p Program, console: Box<dyn Console>) -> Evaluator<'p> {
        Evaluator {
            scope: ScopeStack::new(),
            structs: &program.structs,
            functions: &program.functions,
            natives: NativeRegistry::default(),
            console,
        }
    }

    /// Execute the top-level statements. The program runs for effect; a
    /// fatal error aborts the run and is returned here.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.scope.begin_block();

        for statement in &program.statements {
            match self.eval(statement) {
                Ok(_) => {}
                Err(Signal::Return(_)) => {
                    self.scope.end_block();
                    return Err(RuntimeError::ReturnOutsideFunction);
                }
                Err(Signal::Error(error)) => {
                    self.scope.end_block();
                    return Err(error);
                }
            }
        }

        self.scope.end_block();
        Ok(())
    }

    /// Central dispatch: one case per AST kind.
    fn eval(&mut self, ast: &Ast) -> ExecResult {
        match ast {
            Ast::StatementList { statements } => self.eval_statement_list(statements),
            Ast::Literal { value } => self.eval_literal(value),
            Ast::Identifier { name } => self.eval_identifier(name),
            Ast::ArrayLit { elements } => self.eval_array_literal(elements),
            Ast::ArrayAccess { base, index } => self.eval_array_access(base, index.as_deref()),
            Ast::StructAccess { base, member } => self.eval_struct_access(base, member),
            Ast::Declare { target, init } => self.eval_declaration(target, init),
            Ast::Assign { target, value } => self.eval_assignment(target, value),
            Ast::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            Ast::Not { expr } => self.eval_not(expr),
            Ast::IncDec { op, target } => self.eval_inc_dec(*op, target),
            Ast::Len { expr } => self.eval_len(expr),
            Ast::Typeof { expr } => self.eval_typeof(expr),
            Ast::Cast { expr, ty } => self.eval_cast(expr, ty),
            Ast::TypeCheck { expr, ty } => self.eval_type_check(expr, ty),
            Ast::New { name } => self.eval_new(name),
            Ast::Call { name, args } => self.eval_call(name, args),
            Ast::Return { expr } => self.eval_return(expr.as_deref()),
            Ast::Unset { target } => self.eval_unset(target),
            Ast::If { cond, body } => self.eval_if(cond, body),
            Ast::IfElse {
                if_branch,
                else_body,
            } => self.eval_if_else(if_branch, else_body),
            Ast::For {
                init,
                cond,
                step,
                body,
            } => self.eval_for(init, cond, step, body),
            Ast::Foreach { var, iter, body } => self.eval_foreach(var, iter, body),
            Ast::DoWhile { body, cond } => self.eval_do_while(body, cond),
            Ast::While { cond, body } => self.eval_while(cond, body),
        }
    }

    // ---- Statements ------------------------------------------------------

    /// Execute children in order inside a fresh block frame. A return or
    /// error from any child stops the remaining children and propagates
    /// verbatim; the frame is popped on every path.
    fn eval_statement_list(&mut self, statements: &[Ast]) -> ExecResult {
        self.scope.begin_block();

        for statement in statements {
            if let Err(signal) = self.eval(statement) {
                self.scope.end_block();
                return Err(signal);
            }
        }

        self.scope.end_block();
        Ok(Outcome::none())
    }

    fn eval_declaration(&mut self, target: &Ast, init: &Ast) -> ExecResult {
        let Ast::Identifier { name } = target else {
            return Err(RuntimeError::IllegalLvalue.into());
        };

        if self.scope.has_local(name) {
            return Err(RuntimeError::AlreadyDeclared(name.clone()).into());
        }

        let value = self.eval(init)?.into_constant("initializer")?;
        self.scope.declare(name, value.clone())?;
        Ok(Outcome::constant(value))
    }

    fn eval_assignment(&mut self, target: &Ast, value: &Ast) -> ExecResult {
        match target {
            Ast::ArrayAccess { .. } | Ast::StructAccess { .. } => {
                let mut resolved = self.eval(target)?;
                let Some(reference) = resolved.take_reference() else {
                    return Err(RuntimeError::NotAssignable.into());
                };
                let value = self.eval(value)?.into_constant("assigned value")?;
                reference.set(value.clone());
                Ok(Outcome::constant(value))
            }
            Ast::Identifier { name } => {
                if !self.scope.has(name) {
                    return Err(RuntimeError::UndefinedVariable(name.clone()).into());
                }
                let value = self.eval(value)?.into_constant("assigned value")?;
                self.scope.set(name, value.clone());
                Ok(Outcome::constant(value))
            }
            _ => Err(RuntimeError::NotAssignable.into()),
        }
    }

    fn eval_unset(&mut self, target: &Ast) -> ExecResult {
        match target {
            Ast::ArrayAccess { .. } | Ast::StructAccess { .. } => {
                let mut resolved = self.eval(target)?;
                if let Some(reference) = resolved.take_reference() {
                    reference.remove();
                }
                Ok(Outcome::none())
            }
            Ast::Identifier { name } => {
                // Removing an undeclared name is a no-op, not an error.
                self.scope.remove(name);
                Ok(Outcome::none())
            }
            _ => Err(RuntimeError::IllegalLvalue.into()),
        }
    }

    fn eval_return(&mut self, expr: Option<&Ast>) -> ExecResult {
        let value = match expr {
            Some(expr) => Some(self.eval(expr)?.into_constant("return value")?),
            None => None,
        };
        Err(Signal::Return(value))
    }

    // ---- Control flow ----------------------------------------------------

    /// Evaluate a loop/branch condition down to a boolean.
    fn eval_condition(&mut self, cond: &Ast) -> Result<bool, Signal> {
        let value = self.eval(cond)?.into_constant("condition")?;
        Ok(value.to_boolean())
    }

    /// Run a statement inside its own block frame, popping the frame before
    /// any signal propagates.
    fn eval_in_block(&mut self, body: &Ast) -> ExecResult {
        self.scope.begin_block();
        let result = self.eval(body);
        self.scope.end_block();
        result
    }

    /// `if` yields a transient flag telling the enclosing `if-else` whether
    /// the branch ran; the flag never reaches user code.
    fn eval_if(&mut self, cond: &Ast, body: &Ast) -> ExecResult {
        let mut executed = false;

        if self.eval_condition(cond)? {
            self.eval_in_block(body)?;
            executed = true;
        }

        Ok(Outcome::transient(Value::Bool(executed)))
    }

    fn eval_if_else(&mut self, if_branch: &Ast, else_body: &Ast) -> ExecResult {
        let branch = self.eval(if_branch)?;
        let executed = branch.value().is_some_and(Value::to_boolean);

        if !executed {
            self.eval_in_block(else_body)?;
        }

        Ok(Outcome::none())
    }

    fn eval_for(&mut self, init: &Ast, cond: &Ast, step: &Ast, body: &Ast) -> ExecResult {
        // The init clause runs in the enclosing scope, so its declaration
        // stays visible to the condition and step.
        self.eval(init)?;

        while self.eval_condition(cond)? {
            self.eval_in_block(body)?;
            self.eval(step)?;
        }

        Ok(Outcome::none())
    }

    fn eval_while(&mut self, cond: &Ast, body: &Ast) -> ExecResult {
        while self.eval_condition(cond)? {
            self.eval_in_block(body)?;
        }

        Ok(Outcome::none())
    }

    fn eval_do_while(&mut self, body: &Ast, cond: &Ast) -> ExecResult {
        loop {
            self.eval_in_block(body)?;
            if !self.eval_condition(cond)? {
                break;
            }
        }

        Ok(Outcome::none())
    }

    fn eval_foreach(&mut self, var: &str, iter: &Ast, body: &Ast) -> ExecResult {
        let target = self.eval(iter)?;
        let type_name = target.value().map_or("none", Value::type_name);
        let Some(Value::Array(items)) = target.value().filter(|_| target.is_constant()) else {
            return Err(RuntimeError::NotIterable(type_name).into());
        };

        // The loop variable lives in the enclosing scope: declared once if
        // absent, then rebound to each element.
        if !self.scope.has(var) {
            self.scope.declare(var, Value::Empty)?;
        }

        // Snapshot the elements so the body may mutate the array itself.
        let elements: Vec<Value> = items.borrow().clone();
        for element in elements {
            self.scope.set(var, element);
            self.eval_in_block(body)?;
        }

        Ok(Outcome::none())
    }

    // ---- Expressions -----------------------------------------------------

    fn eval_literal(&mut self, literal: &Literal) -> ExecResult {
        let value = match literal {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Float(v) => Value::Float(*v),
            Literal::Int(n) => Value::Int(*n),
            Literal::Str(s) => Value::Str(s.clone()),
        };
        Ok(Outcome::constant(value))
    }

    fn eval_identifier(&mut self, name: &str) -> ExecResult {
        match self.scope.get(name) {
            Some(value) => Ok(Outcome::constant(value)),
            None => Err(RuntimeError::UndefinedVariable(name.to_string()).into()),
        }
    }

    fn eval_array_literal(&mut self, elements: &[Ast]) -> ExecResult {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(self.eval(element)?.into_constant("array element")?);
        }
        Ok(Outcome::constant(Value::array(values)))
    }

    /// Array access resolves both the element value and a slot reference so
    /// assignment, increment/decrement, and unset can reuse it. A missing
    /// index is the append sentinel: a placeholder slot is pushed and the
    /// outcome carries only the reference to it.
    fn eval_array_access(&mut self, base: &Ast, index: Option<&Ast>) -> ExecResult {
        let base_value = self.eval(base)?.into_constant("array expression")?;
        let Value::Array(items) = base_value else {
            return Err(RuntimeError::NotAnArray(base_value.type_name()).into());
        };

        let Some(index) = index else {
            let slot = SlotRef::append(items);
            return Ok(Outcome::none().with_reference(Reference::Slot(slot)));
        };

        let index_value = self.eval(index)?.into_constant("array index")?;
        let slot = SlotRef::new(items, index_value.to_int())?;
        let reference = Reference::Slot(slot);
        let value = reference.get()?;
        Ok(Outcome::constant(value).with_reference(reference))
    }

    fn eval_struct_access(&mut self, base: &Ast, member: &str) -> ExecResult {
        let base_value = self.eval(base)?.into_constant("object expression")?;
        let Value::Struct(instance) = base_value else {
            return Err(RuntimeError::NotAnObject(base_value.type_name()).into());
        };

        if !instance.has_member(member) {
            return Err(RuntimeError::UndefinedMember(
                instance.struct_name().to_string(),
                member.to_string(),
            )
            .into());
        }

        let value = instance.member_value(member);
        let reference = Reference::Member(reference::MemberRef::new(Rc::clone(&instance), member));
        Ok(Outcome::constant(value).with_reference(reference))
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Ast, rhs: &Ast) -> ExecResult {
        match op {
            BinaryOp::And | BinaryOp::Or => self.eval_logical(op, lhs, rhs),
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => self.eval_comparison(op, lhs, rhs),
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Pow
            | BinaryOp::Div
            | BinaryOp::Mod => self.eval_arithmetic(op, lhs, rhs),
        }
    }

    /// Short-circuit logic: the right operand is evaluated only when the
    /// left operand's truth value leaves the result open.
    fn eval_logical(&mut self, op: BinaryOp, lhs: &Ast, rhs: &Ast) -> ExecResult {
        let left = self.eval(lhs)?.into_constant("left-hand side operand")?;

        let decided = match op {
            BinaryOp::And => !left.to_boolean(),
            _ => left.to_boolean(),
        };
        if decided {
            let value = matches!(op, BinaryOp::Or);
            return Ok(Outcome::constant(Value::Bool(value)));
        }

        let right = self.eval(rhs)?.into_constant("right-hand side operand")?;
        Ok(Outcome::constant(Value::Bool(right.to_boolean())))
    }

    fn eval_comparison(&mut self, op: BinaryOp, lhs: &Ast, rhs: &Ast) -> ExecResult {
        let left = self.eval(lhs)?.into_constant("left-hand side operand")?;
        let right = self.eval(rhs)?.into_constant("right-hand side operand")?;

        let result = match op {
            BinaryOp::Eq => values_equal(&left, &right),
            BinaryOp::NotEq => !values_equal(&left, &right),
            BinaryOp::Lt => compare_values(&left, &right).is_lt(),
            BinaryOp::LtEq => compare_values(&left, &right).is_le(),
            BinaryOp::Gt => compare_values(&left, &right).is_gt(),
            _ => compare_values(&left, &right).is_ge(),
        };

        Ok(Outcome::constant(Value::Bool(result)))
    }

    fn eval_arithmetic(&mut self, op: BinaryOp, lhs: &Ast, rhs: &Ast) -> ExecResult {
        let left = self.eval(lhs)?.into_constant("left-hand side operand")?;
        let right = self.eval(rhs)?.into_constant("right-hand side operand")?;

        let value = match op {
            BinaryOp::Add => ops::add(&left, &right)?,
            BinaryOp::Sub => ops::subtract(&left, &right)?,
            BinaryOp::Mul => ops::multiply(&left, &right)?,
            BinaryOp::Pow => ops::pow(&left, &right)?,
            BinaryOp::Div => ops::divide(&left, &right)?,
            _ => ops::modulo(&left, &right)?,
        };

        Ok(Outcome::constant(value))
    }

    fn eval_not(&mut self, expr: &Ast) -> ExecResult {
        let value = self.eval(expr)?.into_constant("operand")?;
        Ok(Outcome::constant(Value::Bool(!value.to_boolean())))
    }

    /// Pre/post increment and decrement. The new value is written back
    /// through the resolved reference when the target produced one,
    /// otherwise the identifier is rebound in scope. Post-forms yield the
    /// prior value, pre-forms the new one.
    fn eval_inc_dec(&mut self, op: IncDecOp, target: &Ast) -> ExecResult {
        let mut resolved = self.eval(target)?;
        let reference = resolved.take_reference();
        let original = resolved.into_constant("operand")?;

        if original.is_array() || original.is_string() {
            return Err(RuntimeError::NotIncrementable(original.type_name()).into());
        }

        let one = Value::Int(1);
        let modified = match op {
            IncDecOp::PreInc | IncDecOp::PostInc => ops::add(&original, &one)?,
            IncDecOp::PreDec | IncDecOp::PostDec => ops::subtract(&original, &one)?,
        };

        if let Some(reference) = reference {
            reference.set(modified.clone());
        } else if let Ast::Identifier { name } = target {
            self.scope.set(name, modified.clone());
        } else {
            return Err(RuntimeError::NotAssignable.into());
        }

        let result = match op {
            IncDecOp::PreInc | IncDecOp::PreDec => modified,
            IncDecOp::PostInc | IncDecOp::PostDec => original,
        };
        Ok(Outcome::constant(result))
    }

    fn eval_len(&mut self, expr: &Ast) -> ExecResult {
        let value = self.eval(expr)?.into_constant("len() argument")?;

        let length = match &value {
            Value::Array(items) => items.borrow().len(),
            Value::Str(s) => s.chars().count(),
            _ => return Err(RuntimeError::InvalidLenArgument(value.type_name()).into()),
        };

        Ok(Outcome::constant(Value::Int(length as i64)))
    }

    fn eval_typeof(&mut self, expr: &Ast) -> ExecResult {
        let value = self.eval(expr)?.into_constant("typeof operand")?;
        Ok(Outcome::constant(Value::Str(value.type_name().to_string())))
    }

    fn eval_cast(&mut self, expr: &Ast, ty: &str) -> ExecResult {
        let Some(target) = ScalarType::from_name(ty) else {
            return Err(RuntimeError::UnknownType(ty.to_string()).into());
        };
        if target == ScalarType::Object {
            return Err(RuntimeError::CannotCastToObject.into());
        }

        let value = self.eval(expr)?.into_constant("cast operand")?;
        let casted = match target {
            ScalarType::Array => value.to_array(),
            ScalarType::Bool => Value::Bool(value.to_boolean()),
            ScalarType::Float => Value::Float(value.to_float()),
            ScalarType::Int => Value::Int(value.to_int()),
            ScalarType::String => Value::Str(value.to_string()),
            ScalarType::Object => unreachable!("rejected above"),
        };

        Ok(Outcome::constant(casted))
    }

    fn eval_type_check(&mut self, expr: &Ast, ty: &str) -> ExecResult {
        let Some(target) = ScalarType::from_name(ty) else {
            return Err(RuntimeError::UnknownType(ty.to_string()).into());
        };

        let value = self.eval(expr)?.into_constant("type check operand")?;
        let matches = value.scalar_type() == Some(target);
        Ok(Outcome::constant(Value::Bool(matches)))
    }

    fn eval_new(&mut self, name: &str) -> ExecResult {
        let Some(members) = self.structs.get(name) else {
            return Err(RuntimeError::UndefinedStruct(name.to_string()).into());
        };

        let instance = StructInstance::instantiate(name, members);
        Ok(Outcome::constant(Value::Struct(Rc::new(instance))))
    }

    // ---- Calls -----------------------------------------------------------

    /// Function dispatch: native handlers take precedence over user
    /// functions. Arguments are evaluated eagerly in order; extra arguments
    /// to a user function are silently ignored.
    fn eval_call(&mut self, name: &str, args: &[Ast]) -> ExecResult {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?.into_constant("argument")?);
        }

        if let Some(handler) = self.natives.get(name) {
            return match handler(self.console.as_mut(), &values) {
                Ok(Some(value)) => Ok(Outcome::constant(value)),
                Ok(None) => Ok(Outcome::none()),
                // A native error propagates like a return and turns fatal at
                // the program boundary.
                Err(error) => Err(Signal::Error(error)),
            };
        }

        let Some(function) = self.functions.get(name) else {
            return Err(RuntimeError::UndefinedFunction(name.to_string()).into());
        };

        if values.len() < function.params.len() {
            return Err(RuntimeError::TooFewArguments {
                name: name.to_string(),
                expected: function.params.len(),
                got: values.len(),
            }
            .into());
        }

        self.scope.push_frame();
        let result = self.call_user_function(function, values);
        self.scope.pop_frame();

        match result {
            Ok(_) => Ok(Outcome::none()),
            Err(Signal::Return(Some(value))) => Ok(Outcome::constant(value)),
            Err(Signal::Return(None)) => Ok(Outcome::none()),
            Err(error) => Err(error),
        }
    }

    /// Bind parameters into the already-pushed isolated frame and execute
    /// the body.
    fn call_user_function(&mut self, function: &UserFunction, mut args: Vec<Value>) -> ExecResult {
        args.truncate(function.params.len());
        for (param, value) in function.params.iter().zip(args) {
            self.scope.declare(param, value)?;
        }

        self.eval(&function.body)
    }
}
