//! Build graph data model.
//!
//! The graph is backend-agnostic: it records variables, rule templates, and
//! build edges keyed by primary output without committing to any concrete
//! build-file syntax. The central invariant is that every output path keys
//! at most one edge; violations surface as [`GraphError::DuplicateOutput`].

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use indexmap::map::Entry;
use thiserror::Error;

/// A named value declared ahead of any rule or build statement.
///
/// Declarations are ordered and later declarations of the same name win,
/// which is what makes the trailing include the sole override mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Literal value; may itself reference earlier variables.
    pub value: String,
    /// Use a caller-supplied value when one is already set, else this default.
    pub overridable: bool,
}

impl Variable {
    /// A plain variable declaration.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            overridable: false,
        }
    }

    /// A declaration that defers to a caller-supplied value.
    pub fn overridable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            overridable: true,
            ..Self::new(name, value)
        }
    }
}

/// A rule: a command template resolved only when the build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Rule name referenced by build edges.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Command template referencing variables by `$name`.
    pub command: String,
}

impl Rule {
    /// Construct a rule.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            command: command.into(),
        }
    }
}

/// One build statement: a primary output produced by a rule from inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEdge {
    /// Name of the rule producing the output; unused for phony edges.
    pub rule: String,
    /// Ordered explicit inputs.
    pub inputs: Vec<Utf8PathBuf>,
    /// Side-effect outputs tracked for invalidation but never requestable.
    pub implicit_outputs: Vec<Utf8PathBuf>,
    /// Per-edge variable bindings, in declaration order.
    pub bindings: Vec<(String, String)>,
    /// Aggregate node with no file output.
    pub phony: bool,
}

impl BuildEdge {
    /// An edge with a rule and inputs and nothing else.
    pub fn new(rule: impl Into<String>, inputs: Vec<Utf8PathBuf>) -> Self {
        Self {
            rule: rule.into(),
            inputs,
            implicit_outputs: Vec::new(),
            bindings: Vec::new(),
            phony: false,
        }
    }

    /// A phony aggregate over the given members.
    #[must_use]
    pub fn phony(members: Vec<Utf8PathBuf>) -> Self {
        Self {
            phony: true,
            ..Self::new(String::new(), members)
        }
    }
}

/// Errors raised while assembling a build graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Two build statements claimed the same primary output.
    #[error("duplicate output '{output}': an earlier build statement already produces it")]
    DuplicateOutput {
        /// The colliding output path.
        output: Utf8PathBuf,
    },

    /// An edge referenced a rule that has not been declared.
    #[error("build statement for '{output}' references undeclared rule '{rule}'")]
    UndeclaredRule {
        /// Output of the offending edge.
        output: Utf8PathBuf,
        /// The missing rule name.
        rule: String,
    },
}

/// The assembled build description, discarded after emission.
#[derive(Debug, Default, Clone)]
pub struct BuildGraph {
    /// Ordered variable declarations.
    pub variables: Vec<Variable>,
    /// Rule library in declaration order.
    pub rules: Vec<Rule>,
    /// Build edges keyed by primary output. Keys are unique.
    pub edges: IndexMap<Utf8PathBuf, BuildEdge>,
    /// Targets built by an unqualified invocation.
    pub defaults: Vec<Utf8PathBuf>,
    /// File spliced after all generated declarations, so its redefinitions win.
    pub include: Option<Utf8PathBuf>,
}

impl BuildGraph {
    /// Append a variable declaration.
    pub fn declare(&mut self, variable: Variable) {
        self.variables.push(variable);
    }

    /// Append a rule declaration.
    pub fn rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Whether a rule with this name has been declared.
    #[must_use]
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }

    /// Insert a build edge keyed by its primary output.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] when the output path already
    /// keys an edge, and [`GraphError::UndeclaredRule`] when a non-phony
    /// edge references a rule that has not been declared yet.
    pub fn add(&mut self, output: Utf8PathBuf, edge: BuildEdge) -> Result<(), GraphError> {
        if !edge.phony && !self.has_rule(&edge.rule) {
            return Err(GraphError::UndeclaredRule {
                output,
                rule: edge.rule,
            });
        }
        match self.edges.entry(output) {
            Entry::Occupied(entry) => Err(GraphError::DuplicateOutput {
                output: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(edge);
                Ok(())
            }
        }
    }

    /// Mark a target as built by default.
    pub fn default_target(&mut self, target: impl Into<Utf8PathBuf>) {
        self.defaults.push(target.into());
    }
}
