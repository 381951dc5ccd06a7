//! Typed abstract syntax tree for tasklang programs.
//!
//! Constructors here take children that have already been transformed and
//! never validate; shape checks live in [`crate::parser`]. Every node owns
//! its children outright, so a tree never shares or points back into itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::{Value, ValueMap};

/// Reserved operator names recognised at the head of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialForm {
    /// `(def name value)`
    Def,
    /// `(let [name expr ...] body...)`
    Let,
    /// `(if condition then else)`
    If,
    /// `(fn [params...] body...)`
    Fn,
    /// `(do body...)`
    Do,
    /// `(parallel [[id expr] ...])`
    Parallel,
    /// `(join ids...)`
    Join,
    /// `(log-step :id id expr)`
    LogStep,
}

impl SpecialForm {
    /// Every reserved form.
    pub const ALL: [SpecialForm; 8] = [
        SpecialForm::Def,
        SpecialForm::Let,
        SpecialForm::If,
        SpecialForm::Fn,
        SpecialForm::Do,
        SpecialForm::Parallel,
        SpecialForm::Join,
        SpecialForm::LogStep,
    ];

    /// Look up a form by its exact operator name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|form| form.as_str() == name)
    }

    /// Operator name as written in source.
    pub fn as_str(self) -> &'static str {
        match self {
            SpecialForm::Def => "def",
            SpecialForm::Let => "let",
            SpecialForm::If => "if",
            SpecialForm::Fn => "fn",
            SpecialForm::Do => "do",
            SpecialForm::Parallel => "parallel",
            SpecialForm::Join => "join",
            SpecialForm::LogStep => "log-step",
        }
    }

    /// Human-readable description of the accepted shape.
    pub fn expected_shape(self) -> &'static str {
        match self {
            SpecialForm::Def => "def requires a symbol and one value expression",
            SpecialForm::Let => {
                "let requires a vector of symbol/expression pairs followed by a body"
            }
            SpecialForm::If => "if requires exactly three arguments: condition, then and else",
            SpecialForm::Fn => "fn requires a vector of parameter symbols followed by a body",
            SpecialForm::Do => "do accepts any number of expressions",
            SpecialForm::Parallel => "parallel requires a single vector of [id expr] pairs",
            SpecialForm::Join => "join requires symbol arguments",
            SpecialForm::LogStep => "log-step requires :id, a step symbol and one expression",
        }
    }

    fn head(self) -> Value {
        Value::symbol(self.as_str())
    }
}

impl fmt::Display for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol text.
    pub name: String,
}

impl Symbol {
    /// Create a symbol.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Symbol text.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    fn to_value(&self) -> Value {
        Value::symbol(self.name.clone())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Data carried through without structural parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opaque(pub Value);

impl Opaque {
    /// The raw payload.
    pub fn value(&self) -> &Value {
        &self.0
    }
}

/// A node in the tasklang AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AstNode {
    /// Self-evaluating data (never a list or symbol).
    Literal(Value),
    /// Variable or function reference.
    Symbol(Symbol),
    /// Function or tool application; the first element is the callee.
    Call(Vec<AstNode>),
    /// Sequential block.
    Do(Vec<AstNode>),
    /// Top-level definition.
    Def(DefExpr),
    /// Lexical bindings plus body.
    Let(LetExpr),
    /// Three-armed conditional.
    If(IfExpr),
    /// Anonymous function.
    Fn(FnExpr),
    /// Independent concurrent bindings.
    Parallel(ParallelExpr),
    /// Wait on previously started parallel ids.
    Join(JoinExpr),
    /// Traced execution step.
    LogStep(LogStepExpr),
    /// Complete unit of work.
    Task(Box<Task>),
    /// One execution-log record.
    LogEntry(Box<LogEntry>),
}

/// `(def symbol value)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefExpr {
    /// Binding target.
    pub symbol: Symbol,
    /// Value expression.
    pub value: Box<AstNode>,
}

/// One `name expr` pair inside a `let` binding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetBinding {
    /// Bound name.
    pub symbol: Symbol,
    /// Bound expression.
    pub expr: AstNode,
}

impl LetBinding {
    /// Pair a name with its expression.
    pub fn new(symbol: Symbol, expr: AstNode) -> Self {
        Self { symbol, expr }
    }
}

/// `(let [bindings...] body...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetExpr {
    /// Bindings in source order.
    pub bindings: Vec<LetBinding>,
    /// Body expressions.
    pub body: Vec<AstNode>,
}

/// `(if condition then else)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfExpr {
    /// Condition.
    pub condition: Box<AstNode>,
    /// Taken when the condition holds.
    pub then_branch: Box<AstNode>,
    /// Taken otherwise.
    pub else_branch: Box<AstNode>,
}

/// `(fn [params...] body...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnExpr {
    /// Parameter names; duplicates are not rejected here.
    pub params: Vec<Symbol>,
    /// Body expressions.
    pub body: Vec<AstNode>,
}

/// One `[id expr]` pair inside `parallel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelBinding {
    /// Result id.
    pub id: Symbol,
    /// Expression evaluated concurrently.
    pub expr: AstNode,
}

impl ParallelBinding {
    /// Pair an id with its expression.
    pub fn new(id: Symbol, expr: AstNode) -> Self {
        Self { id, expr }
    }
}

/// `(parallel [[id expr] ...])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelExpr {
    /// Independent bindings.
    pub bindings: Vec<ParallelBinding>,
}

/// `(join ids...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinExpr {
    /// Ids to wait on, in source order.
    pub ids: Vec<Symbol>,
}

/// `(log-step :id id expr)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStepExpr {
    /// Step id.
    pub id: Symbol,
    /// Logged expression.
    pub expr: Box<AstNode>,
}

/// A complete unit of work.
///
/// Only `plan` is parsed; `intent` and `execution_log` stay opaque and the
/// descriptive fields are carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier, as written.
    pub id: Option<Value>,
    /// Where the task came from.
    pub source: Option<Value>,
    /// Original natural-language request.
    pub natural_language: Option<Value>,
    /// Unparsed intent description.
    pub intent: Option<Opaque>,
    /// Executable plan.
    pub plan: AstNode,
    /// Unparsed execution log.
    pub execution_log: Option<Opaque>,
}

impl Task {
    /// Create a task around a parsed plan with every other field unset.
    pub fn new(plan: AstNode) -> Self {
        Self {
            id: None,
            source: None,
            natural_language: None,
            intent: None,
            plan,
            execution_log: None,
        }
    }

    /// Set the task id.
    pub fn with_id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the task source.
    pub fn with_source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the natural-language request.
    pub fn with_natural_language(mut self, text: Value) -> Self {
        self.natural_language = Some(text);
        self
    }

    /// Attach an opaque intent.
    pub fn with_intent(mut self, intent: Value) -> Self {
        self.intent = Some(Opaque(intent));
        self
    }

    /// Attach an opaque execution log.
    pub fn with_execution_log(mut self, log: Value) -> Self {
        self.execution_log = Some(Opaque(log));
        self
    }

    fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        put(&mut map, "id", self.id.clone());
        put(&mut map, "source", self.source.clone());
        put(&mut map, "natural-language", self.natural_language.clone());
        put(&mut map, "intent", self.intent.as_ref().map(|o| o.0.clone()));
        map.insert(Value::keyword("plan"), self.plan.to_value());
        put(
            &mut map,
            "execution-log",
            self.execution_log.as_ref().map(|o| o.0.clone()),
        );
        Value::Map(map)
    }
}

/// Sparse execution-log record. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Pipeline stage.
    pub stage: Option<Value>,
    /// Agent that produced the entry.
    pub agent: Option<Value>,
    /// When the entry was recorded.
    pub timestamp: Option<DateTime<Utc>>,
    /// Outcome status.
    pub status: Option<Value>,
    /// Predecessor entry or artifact.
    pub derived_from: Option<Value>,
    /// Plan snapshot, parsed.
    pub plan: Option<AstNode>,
    /// Step result.
    pub result: Option<Value>,
    /// Step error.
    pub error: Option<Value>,
    /// Step in progress.
    pub executing_step: Option<Value>,
    /// Step completed.
    pub executed_step: Option<Value>,
}

impl LogEntry {
    fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        put(&mut map, "stage", self.stage.clone());
        put(&mut map, "agent", self.agent.clone());
        put(
            &mut map,
            "timestamp",
            self.timestamp.map(|ts| Value::string(ts.to_rfc3339())),
        );
        put(&mut map, "status", self.status.clone());
        put(&mut map, "derived-from", self.derived_from.clone());
        put(&mut map, "plan", self.plan.as_ref().map(AstNode::to_value));
        put(&mut map, "result", self.result.clone());
        put(&mut map, "error", self.error.clone());
        put(&mut map, "executing-step", self.executing_step.clone());
        put(&mut map, "executed-step", self.executed_step.clone());
        Value::Map(map)
    }
}

fn put(map: &mut ValueMap, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(Value::keyword(key), value);
    }
}

impl AstNode {
    /// Wrap self-evaluating data.
    pub fn literal(value: Value) -> Self {
        AstNode::Literal(value)
    }

    /// Reference a name.
    pub fn symbol(name: impl Into<String>) -> Self {
        AstNode::Symbol(Symbol::new(name))
    }

    /// Apply `elements[0]` to the remaining elements.
    pub fn call(elements: impl IntoIterator<Item = AstNode>) -> Self {
        AstNode::Call(elements.into_iter().collect())
    }

    /// Sequential block.
    pub fn do_block(body: impl IntoIterator<Item = AstNode>) -> Self {
        AstNode::Do(body.into_iter().collect())
    }

    /// Definition.
    pub fn def(symbol: Symbol, value: AstNode) -> Self {
        AstNode::Def(DefExpr {
            symbol,
            value: Box::new(value),
        })
    }

    /// Lexical bindings plus body.
    pub fn let_expr(
        bindings: impl IntoIterator<Item = LetBinding>,
        body: impl IntoIterator<Item = AstNode>,
    ) -> Self {
        AstNode::Let(LetExpr {
            bindings: bindings.into_iter().collect(),
            body: body.into_iter().collect(),
        })
    }

    /// Conditional.
    pub fn if_expr(condition: AstNode, then_branch: AstNode, else_branch: AstNode) -> Self {
        AstNode::If(IfExpr {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// Anonymous function.
    pub fn fn_expr(
        params: impl IntoIterator<Item = Symbol>,
        body: impl IntoIterator<Item = AstNode>,
    ) -> Self {
        AstNode::Fn(FnExpr {
            params: params.into_iter().collect(),
            body: body.into_iter().collect(),
        })
    }

    /// Concurrent bindings.
    pub fn parallel(bindings: impl IntoIterator<Item = ParallelBinding>) -> Self {
        AstNode::Parallel(ParallelExpr {
            bindings: bindings.into_iter().collect(),
        })
    }

    /// Join on ids.
    pub fn join(ids: impl IntoIterator<Item = Symbol>) -> Self {
        AstNode::Join(JoinExpr {
            ids: ids.into_iter().collect(),
        })
    }

    /// Traced step.
    pub fn log_step(id: Symbol, expr: AstNode) -> Self {
        AstNode::LogStep(LogStepExpr {
            id,
            expr: Box::new(expr),
        })
    }

    /// Complete unit of work.
    pub fn task(task: Task) -> Self {
        AstNode::Task(Box::new(task))
    }

    /// Execution-log record.
    pub fn log_entry(entry: LogEntry) -> Self {
        AstNode::LogEntry(Box::new(entry))
    }

    /// Reconstitute the generic value this node was transformed from.
    ///
    /// Transforming the result yields a node equal to `self`.
    pub fn to_value(&self) -> Value {
        match self {
            AstNode::Literal(value) => value.clone(),
            AstNode::Symbol(symbol) => symbol.to_value(),
            AstNode::Call(elements) => Value::list(elements.iter().map(AstNode::to_value)),
            AstNode::Do(body) => form_value(SpecialForm::Do, body.iter().map(AstNode::to_value)),
            AstNode::Def(def) => form_value(
                SpecialForm::Def,
                [def.symbol.to_value(), def.value.to_value()],
            ),
            AstNode::Let(expr) => {
                let group = Value::vector(
                    expr.bindings
                        .iter()
                        .flat_map(|b| [b.symbol.to_value(), b.expr.to_value()]),
                );
                form_value(
                    SpecialForm::Let,
                    std::iter::once(group).chain(expr.body.iter().map(AstNode::to_value)),
                )
            }
            AstNode::If(expr) => form_value(
                SpecialForm::If,
                [
                    expr.condition.to_value(),
                    expr.then_branch.to_value(),
                    expr.else_branch.to_value(),
                ],
            ),
            AstNode::Fn(expr) => {
                let params = Value::vector(expr.params.iter().map(Symbol::to_value));
                form_value(
                    SpecialForm::Fn,
                    std::iter::once(params).chain(expr.body.iter().map(AstNode::to_value)),
                )
            }
            AstNode::Parallel(expr) => {
                let group = Value::vector(
                    expr.bindings
                        .iter()
                        .map(|b| Value::vector([b.id.to_value(), b.expr.to_value()])),
                );
                form_value(SpecialForm::Parallel, [group])
            }
            AstNode::Join(expr) => {
                form_value(SpecialForm::Join, expr.ids.iter().map(Symbol::to_value))
            }
            AstNode::LogStep(step) => form_value(
                SpecialForm::LogStep,
                [Value::keyword("id"), step.id.to_value(), step.expr.to_value()],
            ),
            AstNode::Task(task) => task.to_value(),
            AstNode::LogEntry(entry) => entry.to_value(),
        }
    }
}

fn form_value(form: SpecialForm, args: impl IntoIterator<Item = Value>) -> Value {
    Value::list(std::iter::once(form.head()).chain(args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_form_names_round_trip() {
        for form in SpecialForm::ALL {
            assert_eq!(SpecialForm::from_name(form.as_str()), Some(form));
        }
        assert_eq!(SpecialForm::from_name("defn"), None);
        assert_eq!(SpecialForm::from_name("IF"), None);
    }

    #[test]
    fn let_reconstitutes_flat_binding_vector() {
        let node = AstNode::let_expr(
            [
                LetBinding::new(Symbol::new("a"), AstNode::literal(Value::Integer(1))),
                LetBinding::new(Symbol::new("b"), AstNode::symbol("a")),
            ],
            [AstNode::symbol("b")],
        );
        assert_eq!(node.to_value().to_string(), "(let [a 1 b a] b)");
    }

    #[test]
    fn task_value_omits_unset_fields() {
        let task = Task::new(AstNode::call([AstNode::symbol("run")]))
            .with_id(Value::string("t-1"))
            .with_intent(Value::keyword("fetch"));
        let Value::Map(map) = AstNode::task(task).to_value() else {
            panic!("task should render as a map");
        };
        assert_eq!(map.len(), 3);
        assert_eq!(map.get_keyword("plan"), Some(&Value::list([Value::symbol("run")])));
        assert!(!map.contains_keyword("source"));
    }

    #[test]
    fn log_entry_value_is_sparse() {
        let entry = LogEntry {
            status: Some(Value::keyword("ok")),
            ..LogEntry::default()
        };
        assert_eq!(AstNode::log_entry(entry).to_value().to_string(), "{:status :ok}");
    }
}
