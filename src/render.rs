//! Rendering of AST nodes and generic values for display.

use serde::Serialize;
use std::fmt::{Debug, Display};

use crate::ast::AstNode;
use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;
use crate::value::Value;

/// Render an AST node according to `config`.
pub fn render(node: &AstNode, config: &OutputConfig) -> Result<String> {
    render_with(node, || node.to_value(), config)
}

/// Render a generic value according to `config`.
pub fn render_value(value: &Value, config: &OutputConfig) -> Result<String> {
    render_with(value, || value.clone(), config)
}

fn render_with<T, S>(
    item: &T,
    as_sexpr: impl FnOnce() -> S,
    config: &OutputConfig,
) -> Result<String>
where
    T: Serialize + Debug,
    S: Display,
{
    let text = match (config.format, config.pretty) {
        (OutputFormat::Json, true) => serde_json::to_string_pretty(item)?,
        (OutputFormat::Json, false) => serde_json::to_string(item)?,
        (OutputFormat::Debug, true) => format!("{:#?}", item),
        (OutputFormat::Debug, false) => format!("{:?}", item),
        (OutputFormat::Sexpr, _) => as_sexpr().to_string(),
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Symbol;

    fn sample() -> AstNode {
        AstNode::def(Symbol::new("x"), AstNode::literal(Value::Integer(10)))
    }

    #[test]
    fn sexpr_output_reconstitutes_source() {
        let config = OutputConfig {
            format: OutputFormat::Sexpr,
            pretty: false,
        };
        assert_eq!(render(&sample(), &config).expect("render"), "(def x 10)");
    }

    #[test]
    fn compact_json_is_tagged() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            pretty: false,
        };
        let text = render(&sample(), &config).expect("render");
        let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(json["type"], "Def");
        assert_eq!(json["value"]["symbol"]["name"], "x");
        assert_eq!(json["value"]["value"]["value"]["value"], 10);
    }
}
