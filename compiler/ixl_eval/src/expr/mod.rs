//! Expression trees.
//!
//! One closed [`Expression`] enum covers every node kind. Verification
//! ([`Expression::verify`]), type propagation ([`Expression::set_input_type`],
//! [`Expression::set_output_type`]) and execution ([`Expression::execute`])
//! each dispatch over it with an exhaustive match.
//!
//! # Type contract
//!
//! Every node has a *required input type* and a *created output type*:
//!
//! | required      | meaning                                    |
//! |---------------|--------------------------------------------|
//! | `None`        | accepts anything, including no input       |
//! | `Some(Any)`   | needs some input, of any type              |
//! | `Some(T)`     | needs an input assignable to `T`           |
//!
//! | created            | meaning                                   |
//! |--------------------|-------------------------------------------|
//! | `None`             | passes its input through                  |
//! | `Some(Unresolved)` | produces a value typed during verification |
//! | `Some(T)`          | produces a `T`                            |
//!
//! Composite nodes derive both from their children when they are built, so
//! a tree never changes after construction and can be shared freely between
//! threads.

mod arith;
mod display;
mod execute;
mod propagate;
mod verify;

use std::cmp::Ordering;

use ixl_types::DataType;
use ixl_value::Value;
use smallvec::SmallVec;

use crate::errors::{
    conflicting_input_types, conflicting_output_types, conflicting_statement_types,
    VerificationError, VerificationErrorKind, VerifyResult,
};
use crate::ops::OperationCall;

/// Field names read by a subtree. Most statements read one or two.
pub type InputFields = SmallVec<[String; 4]>;

/// A node of an expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    // Leaves
    /// A literal value.
    Constant(Value),
    /// `_`: the current value, unchanged.
    This,
    /// Read a document field.
    Input(String),
    /// Write the current value to an output field.
    Output { kind: OutputKind, field: String },
    /// Read a variable.
    GetVar(String),
    /// Bind the current value to a variable.
    SetVar(String),
    /// A registered leaf operation.
    Operation(OperationCall),

    // Composites
    Statement(StatementExpr),
    Script(ScriptExpr),
    ForEach(Box<Expression>),
    IfThen(IfThenExpr),
    Switch(SwitchExpr),
    SelectInput(SelectInputExpr),
    Guard(GuardExpr),
    Cat(CatExpr),
    Paren(Box<Expression>),
    Arithmetic(ArithmeticExpr),
    Choice(ChoiceExpr),
}

/// Destination of an output write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Attribute,
    Index,
    Summary,
}

impl OutputKind {
    pub fn keyword(self) -> &'static str {
        match self {
            OutputKind::Attribute => "attribute",
            OutputKind::Index => "index",
            OutputKind::Summary => "summary",
        }
    }
}

/// Comparison operator of an [`IfThenExpr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    /// Whether `ordering` (left compared to right) satisfies the operator.
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Ge => ordering != Ordering::Less,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Le => ordering != Ordering::Greater,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
        }
    }
}

/// Operator of an [`ArithmeticExpr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

/// A left-to-right pipe: each child consumes its predecessor's output.
#[derive(Clone, Debug, PartialEq)]
pub struct StatementExpr {
    children: Vec<Expression>,
    required: Option<DataType>,
    created: Option<DataType>,
}

impl StatementExpr {
    pub fn children(&self) -> &[Expression] {
        &self.children
    }
}

/// Independent statements sharing variables but not the piped value.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptExpr {
    statements: Vec<StatementExpr>,
    /// Fields read by each statement, parallel to `statements`.
    inputs: Vec<InputFields>,
    required: Option<DataType>,
    created: Option<DataType>,
}

impl ScriptExpr {
    pub fn statements(&self) -> &[StatementExpr] {
        &self.statements
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfThenExpr {
    left: Box<Expression>,
    comparator: Comparator,
    right: Box<Expression>,
    if_true: Box<Expression>,
    if_false: Option<Box<Expression>>,
    required: Option<DataType>,
    created: Option<DataType>,
}

/// Dispatch on the current string value.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchExpr {
    cases: Vec<(String, Expression)>,
    default: Option<Box<Expression>>,
}

impl SwitchExpr {
    fn case(&self, key: &str) -> Option<&Expression> {
        self.cases
            .iter()
            .find_map(|(k, exp)| (k == key).then_some(exp))
    }

    fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.default.is_none()
    }
}

/// Dispatch on the first available input field.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectInputExpr {
    cases: Vec<(String, Expression)>,
}

/// Run the inner expression only when the fields it reads are present.
#[derive(Clone, Debug, PartialEq)]
pub struct GuardExpr {
    inner: Box<Expression>,
    inputs: InputFields,
}

/// Concatenation of children evaluated against the same input.
#[derive(Clone, Debug, PartialEq)]
pub struct CatExpr {
    children: Vec<Expression>,
    required: Option<DataType>,
    created: Option<DataType>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArithmeticExpr {
    left: Box<Expression>,
    op: ArithmeticOp,
    right: Box<Expression>,
    required: Option<DataType>,
    created: Option<DataType>,
}

/// `a || b`: the first alternative producing a value.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceExpr {
    alternatives: Vec<Expression>,
    required: Option<DataType>,
    created: Option<DataType>,
}

// Construction

impl Expression {
    pub fn constant(value: Value) -> Self {
        Expression::Constant(value)
    }

    pub fn input(field: impl Into<String>) -> Self {
        Expression::Input(field.into())
    }

    pub fn output(kind: OutputKind, field: impl Into<String>) -> Self {
        Expression::Output {
            kind,
            field: field.into(),
        }
    }

    pub fn attribute(field: impl Into<String>) -> Self {
        Self::output(OutputKind::Attribute, field)
    }

    pub fn index(field: impl Into<String>) -> Self {
        Self::output(OutputKind::Index, field)
    }

    pub fn summary(field: impl Into<String>) -> Self {
        Self::output(OutputKind::Summary, field)
    }

    pub fn get_var(name: impl Into<String>) -> Self {
        Expression::GetVar(name.into())
    }

    pub fn set_var(name: impl Into<String>) -> Self {
        Expression::SetVar(name.into())
    }

    /// A pipe of `children`. Nested statements are flattened into it.
    pub fn statement(children: Vec<Expression>) -> Self {
        Expression::Statement(StatementExpr::new(children))
    }

    /// A script of independent statements. Non-statement items become
    /// single-node statements.
    pub fn script(statements: Vec<Expression>) -> VerifyResult<Self> {
        let statements: Vec<StatementExpr> = statements
            .into_iter()
            .map(|exp| match exp {
                Expression::Statement(s) => s,
                other => StatementExpr::new(vec![other]),
            })
            .collect();

        let inputs = statements
            .iter()
            .map(|s| {
                let mut fields = InputFields::new();
                for child in &s.children {
                    child.collect_input_fields(&mut fields);
                }
                fields
            })
            .collect();
        let mut node = ScriptExpr {
            statements,
            inputs,
            required: None,
            created: None,
        };

        let mut required = None;
        for s in &node.statements {
            match merge_required(required, s.required.clone()) {
                Ok(r) => required = r,
                Err((a, b)) => {
                    let kind = conflicting_statement_types(&a, &b);
                    return Err(VerificationError::new(Expression::Script(node.clone()), kind));
                }
            }
        }
        node.required = required;
        node.created = node
            .statements
            .iter()
            .map(|s| s.created.clone())
            .collect::<Option<Vec<_>>>()
            .and_then(|types| merge_resolved_outputs(types.iter()));
        Ok(Expression::Script(node))
    }

    pub fn for_each(inner: Expression) -> Self {
        Expression::ForEach(Box::new(inner))
    }

    /// `if (left <comparator> right) { if_true } else { if_false }`.
    pub fn if_then(
        left: Expression,
        comparator: Comparator,
        right: Expression,
        if_true: Expression,
        if_false: Option<Expression>,
    ) -> VerifyResult<Self> {
        let mut node = IfThenExpr {
            left: Box::new(left),
            comparator,
            right: Box::new(right),
            if_true: Box::new(if_true),
            if_false: if_false.map(Box::new),
            required: None,
            created: None,
        };

        let operands = [
            Some(&*node.left),
            Some(&*node.right),
            Some(&*node.if_true),
            node.if_false.as_deref(),
        ];
        node.required = merge_all_required(operands.into_iter().flatten())
            .map_err(|kind| VerificationError::new(Expression::IfThen(node.clone()), kind))?;

        let created = match &node.if_false {
            None => node.if_true.created_output_type(),
            Some(f) => match (node.if_true.created_output_type(), f.created_output_type()) {
                (Some(t), Some(f)) => merge_branches(Some(t), Some(f)).map_err(|kind| {
                    VerificationError::new(Expression::IfThen(node.clone()), kind)
                })?,
                // One branch passes its input through, so the type depends on the input.
                _ => None,
            },
        };
        node.created = created;
        Ok(Expression::IfThen(node))
    }

    /// `switch { case "k": ...; default: ...; }`.
    pub fn switch(cases: Vec<(String, Expression)>, default: Option<Expression>) -> Self {
        Expression::Switch(SwitchExpr {
            cases,
            default: default.map(Box::new),
        })
    }

    pub fn select_input(cases: Vec<(String, Expression)>) -> Self {
        Expression::SelectInput(SelectInputExpr { cases })
    }

    pub fn guard(inner: Expression) -> Self {
        let mut inputs = InputFields::new();
        inner.collect_input_fields(&mut inputs);
        Expression::Guard(GuardExpr {
            inner: Box::new(inner),
            inputs,
        })
    }

    /// `a . b . c`.
    pub fn cat(children: Vec<Expression>) -> VerifyResult<Self> {
        let mut node = CatExpr {
            children,
            required: None,
            created: None,
        };
        node.required = merge_all_required(node.children.iter()).map_err(|kind| {
            VerificationError::new(Expression::Cat(node.clone()), kind)
        })?;
        let created: Option<Vec<DataType>> = node
            .children
            .iter()
            .map(Expression::created_output_type)
            .collect();
        node.created = Some(match created {
            Some(types) if types.iter().all(DataType::is_resolved) => concat_type(&types),
            _ => DataType::Unresolved,
        });
        Ok(Expression::Cat(node))
    }

    pub fn paren(inner: Expression) -> Self {
        Expression::Paren(Box::new(inner))
    }

    /// `left <op> right`, both operands reading the same input.
    pub fn arithmetic(left: Expression, op: ArithmeticOp, right: Expression) -> VerifyResult<Self> {
        let mut node = ArithmeticExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
            required: None,
            created: None,
        };
        node.required = merge_required(
            node.left.required_input_type(),
            node.right.required_input_type(),
        )
        .map_err(|(a, b)| {
            VerificationError::new(
                Expression::Arithmetic(node.clone()),
                conflicting_input_types(&a, &b),
            )
        })?;
        node.created = Some(
            match (
                node.left.created_output_type(),
                node.right.created_output_type(),
            ) {
                (Some(l), Some(r)) => l.promote(&r).unwrap_or(DataType::Unresolved),
                _ => DataType::Unresolved,
            },
        );
        Ok(Expression::Arithmetic(node))
    }

    /// `a || b || c`.
    pub fn choice(alternatives: Vec<Expression>) -> VerifyResult<Self> {
        let mut node = ChoiceExpr {
            alternatives,
            required: None,
            created: None,
        };
        node.required = merge_all_required(node.alternatives.iter()).map_err(|kind| {
            VerificationError::new(Expression::Choice(node.clone()), kind)
        })?;
        let created: Option<Vec<DataType>> = node
            .alternatives
            .iter()
            .map(Expression::created_output_type)
            .collect();
        node.created = match created {
            None => None,
            Some(types) => {
                let mut merged = None;
                for ty in types {
                    merged = merge_branches(merged, Some(ty)).map_err(|kind| {
                        VerificationError::new(Expression::Choice(node.clone()), kind)
                    })?;
                }
                merged
            }
        };
        Ok(Expression::Choice(node))
    }
}

impl StatementExpr {
    fn new(children: Vec<Expression>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expression::Statement(inner) => flat.extend(inner.children),
                other => flat.push(other),
            }
        }

        // The first child that needs input decides, unless an earlier child
        // already produces its own value.
        let mut required = None;
        for child in &flat {
            if let Some(r) = child.required_input_type() {
                required = Some(r);
                break;
            }
            if child.created_output_type().is_some() {
                break;
            }
        }
        let created = flat.iter().rev().find_map(Expression::created_output_type);

        StatementExpr {
            children: flat,
            required,
            created,
        }
    }
}

// Node types

impl Expression {
    /// The type this node demands on its input.
    pub fn required_input_type(&self) -> Option<DataType> {
        match self {
            Expression::Constant(_)
            | Expression::This
            | Expression::Input(_)
            | Expression::GetVar(_)
            | Expression::SelectInput(_) => None,
            Expression::Output { .. } | Expression::SetVar(_) | Expression::ForEach(_) => {
                Some(DataType::Any)
            }
            Expression::Operation(call) => call.required_input_type(),
            Expression::Statement(s) => s.required.clone(),
            Expression::Script(s) => s.required.clone(),
            Expression::IfThen(s) => s.required.clone(),
            Expression::Switch(s) => (!s.is_empty()).then_some(DataType::String),
            Expression::Guard(s) => s.inner.required_input_type(),
            Expression::Cat(s) => s.required.clone(),
            Expression::Paren(inner) => inner.required_input_type(),
            Expression::Arithmetic(s) => s.required.clone(),
            Expression::Choice(s) => s.required.clone(),
        }
    }

    /// The type this node produces, or `None` for pass-through nodes.
    pub fn created_output_type(&self) -> Option<DataType> {
        match self {
            Expression::Constant(value) => Some(value.data_type()),
            Expression::This
            | Expression::Output { .. }
            | Expression::SetVar(_)
            | Expression::Switch(_)
            | Expression::SelectInput(_) => None,
            Expression::Input(_) | Expression::GetVar(_) | Expression::ForEach(_) => {
                Some(DataType::Unresolved)
            }
            Expression::Operation(call) => call.created_output_type(),
            Expression::Statement(s) => s.created.clone(),
            Expression::Script(s) => s.created.clone(),
            Expression::IfThen(s) => s.created.clone(),
            Expression::Guard(s) => s.inner.created_output_type(),
            Expression::Cat(s) => s.created.clone(),
            Expression::Paren(inner) => inner.created_output_type(),
            Expression::Arithmetic(s) => s.created.clone(),
            Expression::Choice(s) => s.created.clone(),
        }
    }

    /// Whether this node checks its own input and output types during
    /// verification. Composites leave that to their children so errors name
    /// the smallest failing expression.
    fn owns_type_checks(&self) -> bool {
        matches!(
            self,
            Expression::Constant(_)
                | Expression::This
                | Expression::Input(_)
                | Expression::Output { .. }
                | Expression::GetVar(_)
                | Expression::SetVar(_)
                | Expression::Operation(_)
                | Expression::ForEach(_)
                | Expression::Switch(_)
        )
    }

    /// Append the document fields read anywhere in this subtree.
    pub fn collect_input_fields(&self, out: &mut InputFields) {
        match self {
            Expression::Input(field) => push_field(out, field),
            Expression::SelectInput(s) => {
                for (field, exp) in &s.cases {
                    push_field(out, field);
                    exp.collect_input_fields(out);
                }
            }
            _ => self.for_each_child(|child| child.collect_input_fields(out)),
        }
    }

    /// Visit the direct children of this node.
    fn for_each_child(&self, mut f: impl FnMut(&Expression)) {
        match self {
            Expression::Constant(_)
            | Expression::This
            | Expression::Input(_)
            | Expression::Output { .. }
            | Expression::GetVar(_)
            | Expression::SetVar(_)
            | Expression::Operation(_) => {}
            Expression::Statement(s) => s.children.iter().for_each(f),
            Expression::Script(s) => s
                .statements
                .iter()
                .flat_map(|st| st.children.iter())
                .for_each(f),
            Expression::ForEach(inner) | Expression::Paren(inner) => f(inner),
            Expression::IfThen(s) => {
                f(&s.left);
                f(&s.right);
                f(&s.if_true);
                if let Some(exp) = &s.if_false {
                    f(exp);
                }
            }
            Expression::Switch(s) => {
                s.cases.iter().for_each(|(_, exp)| f(exp));
                if let Some(exp) = &s.default {
                    f(exp);
                }
            }
            Expression::SelectInput(s) => s.cases.iter().for_each(|(_, exp)| f(exp)),
            Expression::Guard(s) => f(&s.inner),
            Expression::Cat(s) => s.children.iter().for_each(f),
            Expression::Arithmetic(s) => {
                f(&s.left);
                f(&s.right);
            }
            Expression::Choice(s) => s.alternatives.iter().for_each(f),
        }
    }
}

fn push_field(out: &mut InputFields, field: &str) {
    if !out.iter().any(|f| f == field) {
        out.push(field.to_string());
    }
}

// Type merging

/// Combine two input requirements into the narrower one.
///
/// `Err` carries both types when neither accepts the other.
fn merge_required(
    a: Option<DataType>,
    b: Option<DataType>,
) -> Result<Option<DataType>, (DataType, DataType)> {
    match (a, b) {
        (None, other) | (other, None) => Ok(other),
        (Some(a), Some(b)) => {
            if a.is_assignable_from(&b) {
                Ok(Some(b))
            } else if b.is_assignable_from(&a) {
                Ok(Some(a))
            } else {
                Err((a, b))
            }
        }
    }
}

fn merge_all_required<'e>(
    children: impl Iterator<Item = &'e Expression>,
) -> Result<Option<DataType>, VerificationErrorKind> {
    let mut required = None;
    for child in children {
        required = merge_required(required, child.required_input_type())
            .map_err(|(a, b)| conflicting_input_types(&a, &b))?;
    }
    Ok(required)
}

/// The wider of two output types, if one accepts the other.
fn merge_output(a: &DataType, b: &DataType) -> Option<DataType> {
    if a.is_assignable_from(b) {
        Some(a.clone())
    } else if b.is_assignable_from(a) {
        Some(b.clone())
    } else {
        None
    }
}

/// Output type of two alternative branches: the wider of two resolved
/// types, unresolved if either is, whichever exists if only one does.
fn merge_branches(
    a: Option<DataType>,
    b: Option<DataType>,
) -> Result<Option<DataType>, VerificationErrorKind> {
    match (a, b) {
        (Some(a), Some(b)) if a.is_resolved() && b.is_resolved() => merge_output(&a, &b)
            .map(Some)
            .ok_or_else(|| conflicting_output_types(&a, &b)),
        (Some(_), Some(_)) => Ok(Some(DataType::Unresolved)),
        (a, b) => Ok(a.or(b)),
    }
}

/// Merge resolved output types; `None` when any is unresolved or two
/// conflict.
fn merge_resolved_outputs<'t>(mut types: impl Iterator<Item = &'t DataType>) -> Option<DataType> {
    let first = types.next()?.clone();
    types.try_fold(first, |acc, ty| {
        if acc.is_resolved() && ty.is_resolved() {
            merge_output(&acc, ty)
        } else {
            None
        }
    })
    .filter(DataType::is_resolved)
}

/// Result type of concatenating values of `types`.
///
/// Collections of one shape with compatible element types stay collections,
/// anything else concatenates as strings.
fn concat_type(types: &[DataType]) -> DataType {
    let Some(first) = types.first() else {
        return DataType::String;
    };
    if !first.is_collection() {
        return DataType::String;
    }
    let mut element = first.element_type().cloned();
    for ty in &types[1..] {
        let same_shape = std::mem::discriminant(ty) == std::mem::discriminant(first);
        element = match (element, ty.element_type()) {
            (Some(acc), Some(e)) if same_shape => merge_output(&acc, e),
            _ => None,
        };
    }
    element
        .and_then(|e| first.with_element_type(e))
        .unwrap_or(DataType::String)
}

#[cfg(test)]
mod tests;
