//! Transformer from generic values to the typed AST.
//!
//! [`transform`] is a single recursive descent over one [`Value`]. Special
//! forms are recognised by an exact match on the raw operator symbol, so a
//! local binding named `if` is still read as the `if` form. Lists with any
//! other head become [`AstNode::Call`]. Recursion depth follows input nesting
//! depth; callers that accept untrusted input should bound nesting before
//! calling in.

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, trace};

use crate::ast::{
    AstNode, LetBinding, LogEntry, Opaque, ParallelBinding, SpecialForm, Symbol, Task,
};
use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::reader;
use crate::value::{Value, ValueMap};

/// Result alias for transform operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Read one form from `input` and transform it.
///
/// Reader and transform failures both come back tagged with `input`.
pub fn parse_str(input: &str) -> Result<AstNode> {
    let value = reader::read_str(input).map_err(|source| {
        debug!(error = %source, "reader rejected input");
        Error::Read {
            input: input.to_string(),
            source,
        }
    })?;
    transform(&value).map_err(|source| {
        debug!(error = %source, "transform rejected input");
        Error::Parse {
            input: input.to_string(),
            source,
        }
    })
}

/// Read and transform every top-level form in `input`.
pub fn parse_all(input: &str) -> Result<Vec<AstNode>> {
    let forms = reader::read_all(input).map_err(|source| Error::Read {
        input: input.to_string(),
        source,
    })?;
    forms
        .iter()
        .map(transform)
        .collect::<ParseResult<Vec<_>>>()
        .map_err(|source| Error::Parse {
            input: input.to_string(),
            source,
        })
}

/// Load a source file and transform every top-level form in it.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<AstNode>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_all(&text)
}

/// Transform one generic value into an AST node.
pub fn transform(value: &Value) -> ParseResult<AstNode> {
    match value {
        Value::Nil
        | Value::Boolean(_)
        | Value::Integer(_)
        | Value::Float(_)
        | Value::String(_)
        | Value::Keyword(_) => Ok(AstNode::literal(value.clone())),
        Value::Symbol(name) if !name.is_empty() => Ok(AstNode::symbol(name.clone())),
        Value::List(items) => transform_list(value, items),
        Value::Vector(_) => Ok(AstNode::literal(value.clone())),
        Value::Map(map) if is_task_map(map) => transform_task(map).map(AstNode::task),
        Value::Map(_) => Ok(AstNode::literal(value.clone())),
        _ => Err(ParseError::new(ParseErrorKind::Unparseable, value)),
    }
}

/// Decide whether a map describes a task.
///
/// A map is a task when it carries both `:id` and `:plan`.
pub fn is_task_map(map: &ValueMap) -> bool {
    map.contains_keyword("id") && map.contains_keyword("plan")
}

fn transform_list(list: &Value, items: &[Value]) -> ParseResult<AstNode> {
    let Some((head, args)) = items.split_first() else {
        return Err(ParseError::new(ParseErrorKind::EmptyList, list));
    };

    if let Some(form) = head.as_symbol().and_then(SpecialForm::from_name) {
        trace!(form = form.as_str(), args = args.len(), "special form");
        return transform_special_form(form, list, args);
    }

    transform_all(items).map(AstNode::call)
}

fn transform_all(values: &[Value]) -> ParseResult<Vec<AstNode>> {
    values.iter().map(transform).collect()
}

fn transform_special_form(
    form: SpecialForm,
    list: &Value,
    args: &[Value],
) -> ParseResult<AstNode> {
    let invalid = || ParseError::invalid_form(form, list);

    match form {
        SpecialForm::Def => {
            let [target, value] = args else {
                return Err(invalid());
            };
            let symbol = expect_symbol(target).ok_or_else(invalid)?;
            Ok(AstNode::def(symbol, transform(value)?))
        }
        SpecialForm::Let => {
            let Some((group, body)) = args.split_first() else {
                return Err(invalid());
            };
            let bindings = let_bindings(form, list, group)?;
            Ok(AstNode::let_expr(bindings, transform_all(body)?))
        }
        SpecialForm::If => {
            let [condition, then_branch, else_branch] = args else {
                return Err(invalid());
            };
            Ok(AstNode::if_expr(
                transform(condition)?,
                transform(then_branch)?,
                transform(else_branch)?,
            ))
        }
        SpecialForm::Fn => {
            let Some((params, body)) = args.split_first() else {
                return Err(invalid());
            };
            let params = fn_params(form, list, params)?;
            Ok(AstNode::fn_expr(params, transform_all(body)?))
        }
        SpecialForm::Do => Ok(AstNode::do_block(transform_all(args)?)),
        SpecialForm::Parallel => {
            let [group] = args else {
                return Err(invalid());
            };
            Ok(AstNode::parallel(parallel_bindings(form, list, group)?))
        }
        SpecialForm::Join => {
            let ids = args
                .iter()
                .map(|arg| expect_symbol(arg).ok_or_else(invalid))
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(AstNode::join(ids))
        }
        SpecialForm::LogStep => {
            let [marker, id, expr] = args else {
                return Err(invalid());
            };
            if !marker.is_keyword("id") {
                return Err(invalid());
            }
            let id = expect_symbol(id).ok_or_else(invalid)?;
            Ok(AstNode::log_step(id, transform(expr)?))
        }
    }
}

fn let_bindings(
    form: SpecialForm,
    list: &Value,
    group: &Value,
) -> ParseResult<Vec<LetBinding>> {
    let items = group
        .as_vector()
        .filter(|items| items.len() % 2 == 0)
        .ok_or_else(|| ParseError::invalid_form(form, list))?;

    items
        .chunks_exact(2)
        .map(|pair| -> ParseResult<LetBinding> {
            let symbol =
                expect_symbol(&pair[0]).ok_or_else(|| ParseError::invalid_form(form, list))?;
            Ok(LetBinding::new(symbol, transform(&pair[1])?))
        })
        .collect()
}

fn fn_params(form: SpecialForm, list: &Value, params: &Value) -> ParseResult<Vec<Symbol>> {
    let items = params
        .as_vector()
        .ok_or_else(|| ParseError::invalid_form(form, list))?;
    items
        .iter()
        .map(|param| expect_symbol(param).ok_or_else(|| ParseError::invalid_form(form, list)))
        .collect()
}

fn parallel_bindings(
    form: SpecialForm,
    list: &Value,
    group: &Value,
) -> ParseResult<Vec<ParallelBinding>> {
    let items = group
        .as_vector()
        .ok_or_else(|| ParseError::invalid_form(form, list))?;

    items
        .iter()
        .map(|binding| -> ParseResult<ParallelBinding> {
            let Some([id, expr]) = binding.as_vector() else {
                return Err(ParseError::invalid_form(form, list));
            };
            let id = expect_symbol(id).ok_or_else(|| ParseError::invalid_form(form, list))?;
            Ok(ParallelBinding::new(id, transform(expr)?))
        })
        .collect()
}

fn transform_task(map: &ValueMap) -> ParseResult<Task> {
    let plan = match map.get_keyword("plan") {
        Some(plan) => transform(plan)?,
        None => {
            let fragment = Value::Map(map.clone());
            return Err(ParseError::new(ParseErrorKind::Unparseable, &fragment));
        }
    };

    let task = Task {
        id: map.get_keyword("id").cloned(),
        source: map.get_keyword("source").cloned(),
        natural_language: map.get_keyword("natural-language").cloned(),
        intent: map.get_keyword("intent").cloned().map(Opaque),
        plan,
        execution_log: map.get_keyword("execution-log").cloned().map(Opaque),
    };
    if let Some(id) = &task.id {
        debug!(id = %id, "transformed task");
    }
    Ok(task)
}

/// Interpret one execution-log map as a [`LogEntry`].
///
/// Unknown keys are ignored. `:plan` is transformed and `:timestamp` must be
/// an RFC 3339 string.
pub fn parse_log_entry(value: &Value) -> ParseResult<LogEntry> {
    let Value::Map(map) = value else {
        return Err(ParseError::new(ParseErrorKind::Unparseable, value));
    };
    let field = |key: &str| map.get_keyword(key).cloned();

    let timestamp = map
        .get_keyword("timestamp")
        .map(|ts| {
            parse_timestamp(ts)
                .ok_or_else(|| invalid_log_entry(":timestamp must be an RFC 3339 string", value))
        })
        .transpose()?;
    let plan = map.get_keyword("plan").map(transform).transpose()?;

    Ok(LogEntry {
        stage: field("stage"),
        agent: field("agent"),
        timestamp,
        status: field("status"),
        derived_from: field("derived-from"),
        plan,
        result: field("result"),
        error: field("error"),
        executing_step: field("executing-step"),
        executed_step: field("executed-step"),
    })
}

/// Interpret every entry of a task's execution log.
///
/// A missing log yields no entries; a log that is not a list or vector is
/// unparseable.
pub fn task_log_entries(task: &Task) -> ParseResult<Vec<LogEntry>> {
    let Some(log) = &task.execution_log else {
        return Ok(Vec::new());
    };
    match log.value() {
        Value::List(items) | Value::Vector(items) => items.iter().map(parse_log_entry).collect(),
        other => Err(ParseError::new(ParseErrorKind::Unparseable, other)),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn invalid_log_entry(message: &'static str, fragment: &Value) -> ParseError {
    ParseError::new(ParseErrorKind::InvalidLogEntry(message), fragment)
}

fn expect_symbol(value: &Value) -> Option<Symbol> {
    match value {
        Value::Symbol(name) if !name.is_empty() => Some(Symbol::new(name.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::reader::read_str;

    fn parse(src: &str) -> AstNode {
        transform(&read_str(src).expect("read")).expect("transform")
    }

    fn parse_err(src: &str) -> ParseError {
        transform(&read_str(src).expect("read")).expect_err("transform should fail")
    }

    fn int(n: i64) -> AstNode {
        AstNode::literal(Value::Integer(n))
    }

    #[test]
    fn atoms_become_literals_and_symbols() {
        assert_eq!(parse("42"), int(42));
        assert_eq!(parse("nil"), AstNode::literal(Value::Nil));
        assert_eq!(parse(":ready"), AstNode::literal(Value::keyword("ready")));
        assert_eq!(parse("x"), AstNode::symbol("x"));
    }

    #[test]
    fn def_requires_symbol_and_value() {
        assert_eq!(parse("(def x 10)"), AstNode::def(Symbol::new("x"), int(10)));

        let err = parse_err("(def x)");
        assert_eq!(err.form(), Some(SpecialForm::Def));
        assert_eq!(err.name(), "def requires a symbol and one value expression");
        assert_eq!(err.fragment, read_str("(def x)").expect("read"));

        assert_eq!(parse_err("(def 1 2)").form(), Some(SpecialForm::Def));
        assert_eq!(parse_err("(def x 1 2)").form(), Some(SpecialForm::Def));
    }

    #[test]
    fn if_requires_three_arms() {
        assert_eq!(
            parse("(if true 1 2)"),
            AstNode::if_expr(AstNode::literal(Value::Boolean(true)), int(1), int(2))
        );
        assert_eq!(parse_err("(if true 1)").form(), Some(SpecialForm::If));
    }

    #[test]
    fn let_pairs_bindings() {
        let AstNode::Let(expr) = parse("(let [a 1 b 2] a)") else {
            panic!("expected let");
        };
        assert_eq!(expr.bindings.len(), 2);
        assert_eq!(expr.bindings[1].symbol, Symbol::new("b"));
        assert_eq!(expr.body, vec![AstNode::symbol("a")]);

        assert!(matches!(parse("(let [] 1)"), AstNode::Let(ref e) if e.bindings.is_empty()));
        assert_eq!(parse_err("(let [a] a)").form(), Some(SpecialForm::Let));
        assert_eq!(parse_err("(let [1 2] a)").form(), Some(SpecialForm::Let));
        assert_eq!(parse_err("(let (a 1) a)").form(), Some(SpecialForm::Let));
        assert_eq!(parse_err("(let)").form(), Some(SpecialForm::Let));
    }

    #[test]
    fn fn_collects_params_and_body() {
        assert_eq!(
            parse("(fn [x y] (add x y))"),
            AstNode::fn_expr(
                [Symbol::new("x"), Symbol::new("y")],
                [AstNode::call([
                    AstNode::symbol("add"),
                    AstNode::symbol("x"),
                    AstNode::symbol("y"),
                ])]
            )
        );
        assert_eq!(parse_err("(fn [x 1] x)").form(), Some(SpecialForm::Fn));
        assert_eq!(parse_err("(fn x x)").form(), Some(SpecialForm::Fn));
    }

    #[test]
    fn do_accepts_any_arity() {
        assert_eq!(parse("(do)"), AstNode::do_block([]));
        assert_eq!(parse("(do 1 2)"), AstNode::do_block([int(1), int(2)]));
    }

    #[test]
    fn parallel_requires_single_binding_vector() {
        let AstNode::Parallel(expr) = parse("(parallel [[a (f 1)] [b (f 2)]])") else {
            panic!("expected parallel");
        };
        assert_eq!(expr.bindings.len(), 2);
        assert_eq!(expr.bindings[0].id, Symbol::new("a"));
        assert!(matches!(expr.bindings[1].expr, AstNode::Call(ref els) if els.len() == 2));

        assert_eq!(parse_err("(parallel [a 1] [b 2])").form(), Some(SpecialForm::Parallel));
        assert_eq!(parse_err("(parallel [[a]])").form(), Some(SpecialForm::Parallel));
        assert_eq!(parse_err("(parallel [[1 2]])").form(), Some(SpecialForm::Parallel));
    }

    #[test]
    fn join_accepts_only_symbols() {
        assert_eq!(
            parse("(join a b)"),
            AstNode::join([Symbol::new("a"), Symbol::new("b")])
        );
        assert_eq!(parse("(join)"), AstNode::join([]));
        assert_eq!(parse_err("(join a 1)").form(), Some(SpecialForm::Join));
    }

    #[test]
    fn log_step_requires_id_marker() {
        assert_eq!(
            parse("(log-step :id s1 (f 1))"),
            AstNode::log_step(
                Symbol::new("s1"),
                AstNode::call([AstNode::symbol("f"), int(1)])
            )
        );
        assert_eq!(parse_err("(log-step s1 (f 1))").form(), Some(SpecialForm::LogStep));
        assert_eq!(
            parse_err("(log-step :name s1 (f 1))").form(),
            Some(SpecialForm::LogStep)
        );
    }

    #[test]
    fn nested_errors_keep_inner_form() {
        let err = parse_err("(do (f 1) (if x 1))");
        assert_eq!(err.form(), Some(SpecialForm::If));
        assert_eq!(err.fragment, read_str("(if x 1)").expect("read"));
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = parse_err("(f ())");
        assert_eq!(err.kind, ParseErrorKind::EmptyList);
        assert_eq!(err.name(), "empty-list");
        assert_eq!(err.fragment, Value::List(Vec::new()));
    }

    #[test]
    fn empty_symbol_is_unparseable() {
        let err = transform(&Value::symbol("")).expect_err("empty symbol");
        assert_eq!(err.kind, ParseErrorKind::Unparseable);
    }

    #[test]
    fn reserved_names_ignore_scope() {
        // A binding named `if` does not stop the head `if` from being a form.
        let err = parse_err("(let [if 1] (if 2))");
        assert_eq!(err.form(), Some(SpecialForm::If));
    }

    #[test]
    fn vectors_and_plain_maps_stay_literal() {
        let vector = read_str("[(f 1) x]").expect("read");
        assert_eq!(transform(&vector).expect("vector"), AstNode::literal(vector));

        let map = read_str("{:id 1 :name \"no plan\"}").expect("read");
        assert_eq!(transform(&map).expect("map"), AstNode::literal(map));
    }

    #[test]
    fn task_map_parses_plan_and_keeps_opaque_fields() {
        let AstNode::Task(task) = parse(
            "{:id \"t-1\" :source :cli :intent {:goal (fetch)} \
             :plan (do (log-step :id s1 (fetch 1))) :execution-log [{:status :ok}]}",
        ) else {
            panic!("expected task");
        };
        assert_eq!(task.id, Some(Value::string("t-1")));
        assert_eq!(task.source, Some(Value::keyword("cli")));
        assert_eq!(task.natural_language, None);
        assert!(matches!(task.plan, AstNode::Do(ref body) if body.len() == 1));
        assert!(matches!(task.intent.as_ref().map(|o| o.value()), Some(Value::Map(_))));
        assert!(task.execution_log.is_some());
    }

    #[test]
    fn task_plan_errors_propagate() {
        let err = parse_err("{:id 1 :plan (def x)}");
        assert_eq!(err.form(), Some(SpecialForm::Def));
    }

    #[test]
    fn log_entries_are_sparse() {
        let task = Task::new(AstNode::do_block([])).with_execution_log(
            read_str(
                "[{:stage :plan :timestamp \"2024-05-01T12:00:00Z\" :plan (f 1)} {:status :done}]",
            )
            .expect("read"),
        );
        let entries = task_log_entries(&task).expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, Some(Value::keyword("plan")));
        assert_eq!(
            entries[0].timestamp.map(|ts| ts.to_rfc3339()),
            Some("2024-05-01T12:00:00+00:00".to_string())
        );
        assert!(matches!(entries[0].plan, Some(AstNode::Call(_))));
        assert_eq!(entries[1].status, Some(Value::keyword("done")));
        assert_eq!(entries[1].agent, None);
    }

    #[test]
    fn log_entry_rejects_bad_input() {
        let err = parse_log_entry(&Value::Integer(3)).expect_err("not a map");
        assert_eq!(err.kind, ParseErrorKind::Unparseable);

        let err = parse_log_entry(&read_str("{:timestamp \"yesterday\"}").expect("read"))
            .expect_err("bad timestamp");
        assert!(matches!(err.kind, ParseErrorKind::InvalidLogEntry(_)));
    }

    #[test]
    fn parse_str_tags_errors_with_input() {
        let err = parse_str("(def x").expect_err("read failure");
        assert!(matches!(err, Error::Read { .. }));
        assert_eq!(err.input(), Some("(def x"));

        let err = parse_str("(def x)").expect_err("parse failure");
        assert_eq!(err.input(), Some("(def x)"));
        assert_eq!(err.parse_error().and_then(ParseError::form), Some(SpecialForm::Def));
    }
}
