//! Ninja build-file emitter.
//!
//! Serializes a [`BuildGraph`] into Ninja concrete syntax: ordered variable
//! declarations, rule declarations, build statements with implicit outputs
//! and per-statement bindings, phony and default declarations, and the
//! trailing include directive. References are checked at emission time so a
//! malformed graph is rejected instead of producing a file Ninja cannot load.

use crate::graph::{BuildEdge, BuildGraph, Rule};
use crate::stamp;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter, Write};
use thiserror::Error;

/// Errors raised while serializing a graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    /// A variable value or rule command referenced an undeclared name.
    #[error("{context} references undeclared variable '${name}'")]
    UndeclaredVariable {
        /// What contained the dangling reference.
        context: String,
        /// The missing variable name.
        name: String,
    },
}

/// Serialize the graph to Ninja syntax.
///
/// The first comment line carries a generation timestamp and no semantic
/// weight; masking it makes repeated runs byte-identical for identical
/// inputs.
///
/// # Errors
///
/// Returns [`EmitError::UndeclaredVariable`] when a variable value or rule
/// command references a name that is neither a previously declared
/// variable, a builtin (`in`, `out`), nor a per-edge binding.
pub fn emit(graph: &BuildGraph) -> Result<String, EmitError> {
    check_references(graph)?;

    let mut out = String::new();
    let _ = writeln!(out, "# build description generated by fwgen");
    let _ = writeln!(out, "{}", stamp::generated_line());
    let _ = writeln!(out);

    for variable in &graph.variables {
        let _ = writeln!(out, "{} = {}", variable.name, variable.value);
    }
    if !graph.variables.is_empty() {
        let _ = writeln!(out);
    }

    for rule in &graph.rules {
        let _ = write!(out, "{}", DisplayRule { rule });
    }

    for (output, edge) in &graph.edges {
        let _ = write!(out, "{}", DisplayEdge { output, edge });
    }

    if !graph.defaults.is_empty() {
        let _ = writeln!(out, "default {}", graph.defaults.iter().join(" "));
    }

    // The include goes strictly last so its redefinitions win under Ninja's
    // own "last definition wins" rule.
    if let Some(include) = &graph.include {
        let _ = writeln!(out, "include {include}");
    }

    Ok(out)
}

/// Verify that every `$name` reference resolves.
///
/// Variable values must reference only variables declared earlier in the
/// ordered list. Rule commands may additionally reference the builtins and
/// any per-edge binding name, since bindings are in scope wherever the rule
/// is used.
fn check_references(graph: &BuildGraph) -> Result<(), EmitError> {
    let mut declared: HashSet<&str> = HashSet::new();
    for variable in &graph.variables {
        for name in references(&variable.value) {
            if !declared.contains(name.as_str()) {
                return Err(EmitError::UndeclaredVariable {
                    context: format!("variable '{}'", variable.name),
                    name,
                });
            }
        }
        declared.insert(&variable.name);
    }

    let mut in_scope: HashSet<&str> = declared;
    in_scope.insert("in");
    in_scope.insert("out");
    for edge in graph.edges.values() {
        for (name, _) in &edge.bindings {
            in_scope.insert(name);
        }
    }

    for rule in &graph.rules {
        for name in references(&rule.command) {
            if !in_scope.contains(name.as_str()) {
                return Err(EmitError::UndeclaredVariable {
                    context: format!("rule '{}'", rule.name),
                    name,
                });
            }
        }
    }
    Ok(())
}

/// Extract `$name` and `${name}` references from a command or value.
///
/// `$$` is the escape for a literal dollar sign and is skipped.
fn references(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
            }
            Some('{') => {
                chars.next();
                let name: String = chars
                    .by_ref()
                    .take_while(|&inner| inner != '}')
                    .collect();
                if !name.is_empty() {
                    names.push(name);
                }
            }
            _ => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !name.is_empty() {
                    names.push(name);
                }
            }
        }
    }
    names
}

/// Wrapper struct to display a rule declaration.
struct DisplayRule<'a> {
    rule: &'a Rule,
}

impl Display for DisplayRule<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule {}", self.rule.name)?;
        writeln!(f, "  description = {}", self.rule.description)?;
        writeln!(f, "  command = {}", self.rule.command)?;
        writeln!(f)
    }
}

/// Escape a path for a build statement.
///
/// Spaces and colons are separators there and `$` starts a reference, so
/// all three need the `$` escape. Variable values and rule commands are
/// written verbatim.
fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            ' ' => out.push_str("$ "),
            ':' => out.push_str("$:"),
            '$' => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrapper struct to display a build statement.
struct DisplayEdge<'a> {
    output: &'a camino::Utf8PathBuf,
    edge: &'a BuildEdge,
}

impl Display for DisplayEdge<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "build {}", escape_path(self.output.as_str()))?;
        if !self.edge.implicit_outputs.is_empty() {
            write!(
                f,
                " | {}",
                self.edge
                    .implicit_outputs
                    .iter()
                    .map(|path| escape_path(path.as_str()))
                    .join(" ")
            )?;
        }
        let rule = if self.edge.phony {
            "phony"
        } else {
            &self.edge.rule
        };
        write!(f, ": {rule}")?;
        if !self.edge.inputs.is_empty() {
            write!(
                f,
                " {}",
                self.edge
                    .inputs
                    .iter()
                    .map(|path| escape_path(path.as_str()))
                    .join(" ")
            )?;
        }
        writeln!(f)?;
        for (name, value) in &self.edge.bindings {
            writeln!(f, "  {name} = {value}")?;
        }
        writeln!(f)
    }
}

/// Strip the timestamp line so deterministic output can be compared.
#[must_use]
pub fn mask_timestamp(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with(stamp::GENERATED_PREFIX))
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BuildEdge, BuildGraph, Rule, Variable};
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn minimal_graph() -> BuildGraph {
        let mut graph = BuildGraph::default();
        graph.declare(Variable::new("bindir", "/opt/gcc/bin"));
        graph.rule(Rule::new("cc", "Compile C", "$bindir/gcc -c $in -o $out"));
        graph
    }

    #[rstest]
    fn emits_variables_rules_and_edges() {
        let mut graph = minimal_graph();
        graph
            .add(
                "build/main.o".into(),
                BuildEdge {
                    implicit_outputs: vec![Utf8PathBuf::from("build/main.d")],
                    ..BuildEdge::new("cc", vec!["source/main.c".into()])
                },
            )
            .expect("insert edge");
        graph.default_target("build/main.o");

        let text = emit(&graph).expect("emission succeeds");
        let expected = concat!(
            "# build description generated by fwgen\n",
            "\n",
            "bindir = /opt/gcc/bin\n",
            "\n",
            "rule cc\n",
            "  description = Compile C\n",
            "  command = $bindir/gcc -c $in -o $out\n",
            "\n",
            "build build/main.o | build/main.d: cc source/main.c\n",
            "\n",
            "default build/main.o",
        );
        assert_eq!(mask_timestamp(&text), expected);
    }

    #[rstest]
    fn phony_edges_and_bindings_render() {
        let mut graph = minimal_graph();
        graph.rule(Rule::new("objcopy", "Convert image", "$bindir/objcopy -O $format $in $out"));
        graph
            .add(
                "bin/kernel.img".into(),
                BuildEdge {
                    bindings: vec![(String::from("format"), String::from("binary"))],
                    ..BuildEdge::new("objcopy", vec!["build/output.elf".into()])
                },
            )
            .expect("insert edge");
        graph
            .add("all".into(), BuildEdge::phony(vec!["bin/kernel.img".into()]))
            .expect("insert aggregate");

        let text = emit(&graph).expect("emission succeeds");
        assert!(text.contains("build bin/kernel.img: objcopy build/output.elf\n  format = binary\n"));
        assert!(text.contains("build all: phony bin/kernel.img\n"));
    }

    #[rstest]
    fn include_is_emitted_last() {
        let mut graph = minimal_graph();
        graph.include = Some("overrides.ninja".into());
        graph.default_target("all");
        let text = emit(&graph).expect("emission succeeds");
        let last = text.lines().last().expect("output is not empty");
        assert_eq!(last, "include overrides.ninja");
    }

    #[rstest]
    fn dangling_rule_reference_is_rejected() {
        let mut graph = BuildGraph::default();
        graph.rule(Rule::new("cc", "Compile C", "$missing -c $in"));
        let err = emit(&graph).expect_err("dangling reference is rejected");
        assert_eq!(
            err,
            EmitError::UndeclaredVariable {
                context: String::from("rule 'cc'"),
                name: String::from("missing"),
            }
        );
    }

    #[rstest]
    fn dangling_variable_reference_is_rejected() {
        let mut graph = BuildGraph::default();
        graph.declare(Variable::new("cflags", "$baseflags -Wall"));
        let err = emit(&graph).expect_err("forward reference is rejected");
        assert!(matches!(err, EmitError::UndeclaredVariable { .. }));
    }

    #[rstest]
    fn binding_names_satisfy_rule_references() {
        let mut graph = BuildGraph::default();
        graph.rule(Rule::new("objcopy", "Convert image", "objcopy -O $format $in $out"));
        graph
            .add(
                "bin/kernel.img".into(),
                BuildEdge {
                    bindings: vec![(String::from("format"), String::from("binary"))],
                    ..BuildEdge::new("objcopy", vec!["build/output.elf".into()])
                },
            )
            .expect("insert edge");
        assert!(emit(&graph).is_ok());
    }

    #[rstest]
    #[case::plain("$bindir/gcc", vec!["bindir"])]
    #[case::braced("${out}.lst", vec!["out"])]
    #[case::escaped("echo \\$$* > $out", vec!["out"])]
    #[case::several("$a $b ${c}", vec!["a", "b", "c"])]
    #[case::none("no refs here", Vec::<&str>::new())]
    fn reference_extraction(#[case] text: &str, #[case] expected: Vec<&str>) {
        let expected: Vec<String> = expected.into_iter().map(String::from).collect();
        assert_eq!(references(text), expected);
    }

    #[rstest]
    #[case::plain("source/main.c", "source/main.c")]
    #[case::space("source/my file.c", "source/my$ file.c")]
    #[case::colon("C:/src/main.c", "C$:/src/main.c")]
    #[case::dollar("a$b.c", "a$$b.c")]
    fn path_escaping(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_path(input), expected);
    }

    #[rstest]
    fn build_statement_paths_are_escaped() {
        let mut graph = minimal_graph();
        graph
            .add(
                "build/my file.o".into(),
                BuildEdge::new("cc", vec!["source/my file.c".into()]),
            )
            .expect("insert edge");
        let text = emit(&graph).expect("emission succeeds");
        assert!(text.contains("build build/my$ file.o: cc source/my$ file.c\n"));
    }

    #[rstest]
    fn mask_strips_only_the_timestamp_line() {
        let text = "# build description generated by fwgen\n# generated 2026-01-01T00:00:00Z\n\nbindir = x\n";
        let masked = mask_timestamp(text);
        assert!(!masked.contains("# generated "));
        assert!(masked.contains("bindir = x"));
    }
}
