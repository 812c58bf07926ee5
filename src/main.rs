//! exprscript - parse C#-like source into a typed expression tree
//!
//! Reads the source from the command line or stdin, parses it with the
//! default capabilities and prints the tree together with its type.

use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exprscript::parser::grammar::{type_name, whitespace};
use exprscript::parser::{self, Scope, end_of_input};
use exprscript::types::{Capabilities, DefaultBuilder, DefaultResolver, Type};
use exprscript::{parse_expression, parse_statement};

const SYSTEM: &str = "System";

#[derive(Parser, Debug)]
#[command(name = "exprscript")]
#[command(about = "Parse a C#-like expression or statement into a typed expression tree")]
struct Cli {
    /// Source text; read from stdin when omitted
    source: Option<String>,

    /// Type the expression should have, e.g. "Func<int, int>"
    #[arg(long)]
    expected: Option<String>,

    /// Extra namespace whose types resolve without qualification, on top
    /// of System (repeatable)
    #[arg(long = "namespace")]
    namespaces: Vec<String>,

    /// Variable visible to the source, written as "type name" (repeatable)
    #[arg(long = "var")]
    vars: Vec<String>,

    /// Parse a statement or block instead of an expression
    #[arg(long)]
    statement: bool,
}

fn parse_type(text: &str, scope: &Scope) -> Result<Type> {
    let rule = whitespace() * type_name() - end_of_input();
    parser::parse(&rule, text, scope.clone())
        .map(|parsed| parsed.value)
        .with_context(|| format!("unknown type `{text}`"))
}

fn declare_var(scope: Scope, declaration: &str) -> Result<Scope> {
    let Some((ty, name)) = declaration.trim().rsplit_once(char::is_whitespace) else {
        bail!("expected `type name`, got `{declaration}`");
    };

    let ty = parse_type(ty, &scope)?;
    let symbol = scope
        .builder()
        .variable(name, ty)
        .with_context(|| format!("cannot declare `{declaration}`"))?;
    debug!(name, ty = %symbol.ty, "declared host variable");
    Ok(scope.with_symbol(symbol))
}

fn build_scope(cli: &Cli) -> Result<Scope> {
    let resolver = cli
        .namespaces
        .iter()
        .fold(DefaultResolver::new().with_namespace(SYSTEM), |resolver, namespace| {
            resolver.with_namespace(namespace.clone())
        });
    let mut scope = Scope::new(Capabilities::new(resolver, DefaultBuilder::new()));

    for declaration in &cli.vars {
        scope = declare_var(scope, declaration)?;
    }

    if let Some(expected) = &cli.expected {
        let ty = parse_type(expected, &scope)?;
        scope = scope.with_expected(Some(ty));
    }

    Ok(scope)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exprscript=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let source = match &cli.source {
        Some(source) => source.clone(),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read source from stdin")?;
            source
        }
    };

    let scope = build_scope(&cli)?;
    info!(length = source.len(), statement = cli.statement, "parsing");

    let tree = if cli.statement {
        parse_statement(&source, scope)
    } else {
        parse_expression(&source, scope)
    }
    .context("failed to parse source")?;

    println!("{tree}");
    println!("type: {}", tree.ty());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_for(args: &[&str]) -> Scope {
        let cli = Cli::parse_from(std::iter::once("exprscript").chain(args.iter().copied()));
        build_scope(&cli).unwrap()
    }

    #[test]
    fn test_system_stays_imported_with_extra_namespaces() {
        let scope = scope_for(&["--namespace", "Acme", "Math.PI"]);
        assert_eq!(parse_expression("Math.PI", scope).unwrap().ty(), &Type::Double);
    }

    #[test]
    fn test_declared_vars_and_expected_type() {
        let scope = scope_for(&["--var", "int[] xs", "--expected", "Func<int, int>", "n => xs[n]"]);
        let tree = parse_expression("n => xs[n]", scope).unwrap();
        assert_eq!(tree.ty(), &Type::delegate(vec![Type::Int], Type::Int));
    }
}
