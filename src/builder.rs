//! Build graph assembly.
//!
//! This is the algorithmic core: it maps sources to object nodes, wires the
//! link and post-process stages, declares the phony aggregate and the
//! self-regeneration node, and appends caller shortcuts, all against a
//! fixed rule library. Given identical inputs the resulting graph is
//! identical; the only run-dependent output is the emitters' timestamp line.

use camino::{Utf8Path, Utf8PathBuf};

use crate::graph::{BuildEdge, BuildGraph, GraphError, Rule, Variable};
use crate::platform::Platform;
use crate::toolchain::ToolchainInfo;

/// Directory for intermediate objects and the linked binary.
pub const BUILD_DIR: &str = "build";
/// Directory for the post-processed artifacts.
pub const OUTPUT_DIR: &str = "bin";
/// Directory scanned for compilable sources.
pub const SOURCE_DIR: &str = "source";

/// Linker script passed to the link rule as configuration, not a dependency.
const LINKER_SCRIPT: &str = "kernel.ld";
/// Basename of the post-processed artifacts.
const ARTIFACT_STEM: &str = "kernel";

const WARN_FLAGS: &str = "-Wall -Wextra -Wshadow -Wcast-align -Wwrite-strings -Wredundant-decls \
-Winline -Wno-attributes -Wno-deprecated-declarations -Wno-div-by-zero -Wno-endif-labels \
-Wfloat-equal -Wformat=2 -Wno-format-extra-args -Winvalid-pch -Wmissing-format-attribute \
-Wmissing-include-dirs -Wno-multichar -Wredundant-decls -Wshadow -Wno-sign-compare \
-Wsystem-headers -Wundef -Wno-pragmas -Wno-unused-but-set-parameter -Wno-unused-but-set-variable \
-Wno-unused-result -Wno-unused-parameter -Wwrite-strings -Wdisabled-optimization -Wpointer-arith \
-Wno-unused-function -Wno-unused-variable -Winit-self -Wno-undef -Werror";
const INCLUDE_FLAGS: &str = "-I include";
const DEPEND_FLAGS: &str = "-MD -MP";
const FREESTANDING_FLAGS: &str =
    "-pedantic -pedantic-errors -nostdlib -nostartfiles -ffreestanding -nodefaultlibs";
const TARGET_FLAGS: &str =
    "-O2 -mfpu=neon-vfpv4 -march=armv8-a -mtune=cortex-a53 -DPI2 -mfloat-abi=hard";

/// A caller-requested shortcut: a target name wrapping a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    /// Name of the generated stub target.
    pub name: String,
    /// Command plus arguments the stub forwards to.
    pub command: String,
}

/// Everything the builder needs to assemble a graph.
#[derive(Debug)]
pub struct BuildRequest<'a> {
    /// Located toolchain facts.
    pub toolchain: &'a ToolchainInfo,
    /// Host platform capabilities.
    pub platform: &'a Platform,
    /// Source list in stable discovery order, captured before any write.
    pub sources: &'a [Utf8PathBuf],
    /// Root directory the compiler search started from.
    pub root_dir: &'a Utf8Path,
    /// Path the build description will be written to.
    pub out_file: &'a Utf8Path,
    /// Path of the generator binary, for the self-regeneration node.
    pub generator: &'a Utf8Path,
    /// Optional include file spliced after all generated declarations.
    pub include: Option<&'a Utf8Path>,
    /// Shortcut stubs to generate.
    pub shortcuts: &'a [Shortcut],
}

/// Assemble the full build graph for a request.
///
/// # Errors
///
/// Returns [`GraphError::DuplicateOutput`] when two sources collide on the
/// same object path (for example `a/main.c` and `b/main.c`), or when a
/// shortcut name collides with another output.
pub fn assemble(req: &BuildRequest<'_>) -> Result<BuildGraph, GraphError> {
    let mut graph = BuildGraph::default();

    declare_variables(&mut graph, req);
    declare_rules(&mut graph, req);

    let objects = add_objects(&mut graph, req.sources)?;
    let elf = add_link(&mut graph, objects)?;
    let artifacts = add_artifacts(&mut graph, &elf)?;
    add_aggregate(&mut graph, artifacts, elf)?;
    add_regeneration(&mut graph)?;
    add_shortcuts(&mut graph, req)?;

    graph.include = req.include.map(Utf8Path::to_owned);
    Ok(graph)
}

fn declare_variables(graph: &mut BuildGraph, req: &BuildRequest<'_>) {
    graph.declare(Variable::new("ninja_required_version", "1.7"));
    graph.declare(Variable::new("builddir", BUILD_DIR));
    graph.declare(Variable::new("generator", req.generator.as_str()));
    graph.declare(Variable::new("root", req.root_dir.as_str()));
    graph.declare(Variable::new(
        "bindir",
        crate::settings::forward_slashes(req.toolchain.bin_dir.as_str()),
    ));
    graph.declare(Variable::new("warnflags", WARN_FLAGS));
    graph.declare(Variable::new("includes", INCLUDE_FLAGS));
    graph.declare(Variable::new("dependflags", DEPEND_FLAGS));
    graph.declare(Variable::new(
        "baseflags",
        format!("{TARGET_FLAGS} {FREESTANDING_FLAGS}"),
    ));
    graph.declare(Variable::new(
        "cflags",
        "$baseflags $includes $dependflags $warnflags",
    ));
}

/// Execution path for one toolchain binary, e.g. `$bindir/arm-none-eabi-gcc`.
fn tool(req: &BuildRequest<'_>, name: &str) -> String {
    let shell = shell_prefix(req);
    let suffix = if req.toolchain.has_exe_suffix { ".exe" } else { "" };
    format!("{shell}$bindir/{}-{name}{suffix}", req.toolchain.prefix)
}

fn shell_prefix(req: &BuildRequest<'_>) -> &'static str {
    if req.platform.is_posix_shell() {
        ""
    } else {
        "cmd /c "
    }
}

fn declare_rules(graph: &mut BuildGraph, req: &BuildRequest<'_>) {
    graph.rule(Rule::new(
        "cc",
        "Compile C",
        format!(
            "{} $cflags -c $in -o $out -Wa,-adhln > ${{out}}.lst",
            tool(req, "gcc")
        ),
    ));
    graph.rule(Rule::new(
        "as",
        "Assemble",
        format!("{} $in -o $out", tool(req, "as")),
    ));
    graph.rule(Rule::new(
        "ld",
        "Link",
        format!(
            "{} --no-undefined $in -Map $mapfile -o $out -T $linkfile",
            tool(req, "ld")
        ),
    ));
    graph.rule(Rule::new(
        "objcopy",
        "Convert image",
        format!("{} $in -O $format $out", tool(req, "objcopy")),
    ));
    graph.rule(Rule::new(
        "objdump",
        "Disassemble",
        format!("{} -d $in > $out", tool(req, "objdump")),
    ));
    graph.rule(Rule::new(
        "shortcut",
        "Generate shortcut",
        shortcut_command(req),
    ));
    graph.rule(Rule::new(
        "regenerate",
        "Regenerate build script",
        regenerate_command(req),
    ));
}

/// Whether shortcut stubs are plain POSIX scripts on this platform.
///
/// A compat-layer mount means the stubs will be double-clicked or run from
/// a Windows shell, so those hosts get batch wrappers even though build
/// commands go through a POSIX shell.
fn posix_stubs(req: &BuildRequest<'_>) -> bool {
    req.platform.is_posix_shell() && !req.platform.has_compat_layer()
}

/// Stub-writing command for shortcut targets.
///
/// POSIX-like platforms get a script that forwards all arguments and is
/// marked executable; elsewhere a batch-style wrapper is written instead.
fn shortcut_command(req: &BuildRequest<'_>) -> String {
    if posix_stubs(req) {
        // `$$` is the emitter escape for a literal dollar sign.
        String::from("echo $in \\$$* > $out && chmod ug+x $out")
    } else {
        format!("{}echo @ $in %* > ${{out}}.bat", shell_prefix(req))
    }
}

/// Command the regeneration node runs: the generator itself, with the
/// original root directory and output path.
fn regenerate_command(req: &BuildRequest<'_>) -> String {
    let mut command = format!(
        "\"$generator\" generate \"$root\" -o \"{}\"",
        req.out_file
    );
    if let Some(include) = req.include {
        command.push_str(&format!(" -i \"{include}\""));
    }
    command
}

/// Object path for a source: `build/<stem>.o`.
fn object_path(source: &Utf8Path) -> Utf8PathBuf {
    let stem = source.file_stem().unwrap_or_else(|| source.as_str());
    Utf8PathBuf::from(format!("{BUILD_DIR}/{stem}.o"))
}

/// One object node per source, in stable discovery order.
///
/// Assembly sources use the assemble rule with no implicit outputs. C
/// sources additionally produce a listing file and a dependency file,
/// tracked as implicit outputs for invalidation.
fn add_objects(
    graph: &mut BuildGraph,
    sources: &[Utf8PathBuf],
) -> Result<Vec<Utf8PathBuf>, GraphError> {
    let mut objects = Vec::with_capacity(sources.len());
    for source in sources {
        let object = object_path(source);
        let edge = if source.extension() == Some("s") {
            BuildEdge::new("as", vec![source.clone()])
        } else {
            BuildEdge {
                implicit_outputs: vec![
                    Utf8PathBuf::from(format!("{object}.lst")),
                    object.with_extension("d"),
                ],
                ..BuildEdge::new("cc", vec![source.clone()])
            }
        };
        graph.add(object.clone(), edge)?;
        objects.push(object);
    }
    Ok(objects)
}

fn add_link(graph: &mut BuildGraph, objects: Vec<Utf8PathBuf>) -> Result<Utf8PathBuf, GraphError> {
    let elf = Utf8PathBuf::from(format!("{BUILD_DIR}/output.elf"));
    let map = format!("{BUILD_DIR}/output.map");
    let edge = BuildEdge {
        implicit_outputs: vec![Utf8PathBuf::from(map.clone())],
        // Configuration for the link command, not graph dependencies.
        bindings: vec![
            (String::from("linkfile"), String::from(LINKER_SCRIPT)),
            (String::from("mapfile"), map),
        ],
        ..BuildEdge::new("ld", objects)
    };
    graph.add(elf.clone(), edge)?;
    Ok(elf)
}

/// The three single-input post-process nodes consuming the linked binary.
fn add_artifacts(
    graph: &mut BuildGraph,
    elf: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>, GraphError> {
    let listing = Utf8PathBuf::from(format!("{OUTPUT_DIR}/{ARTIFACT_STEM}.lst"));
    graph.add(listing.clone(), BuildEdge::new("objdump", vec![elf.to_owned()]))?;

    let image = Utf8PathBuf::from(format!("{OUTPUT_DIR}/{ARTIFACT_STEM}.img"));
    graph.add(
        image.clone(),
        BuildEdge {
            bindings: vec![(String::from("format"), String::from("binary"))],
            ..BuildEdge::new("objcopy", vec![elf.to_owned()])
        },
    )?;

    let hex = Utf8PathBuf::from(format!("{OUTPUT_DIR}/{ARTIFACT_STEM}.hex"));
    graph.add(
        hex.clone(),
        BuildEdge {
            bindings: vec![(String::from("format"), String::from("ihex"))],
            ..BuildEdge::new("objcopy", vec![elf.to_owned()])
        },
    )?;

    Ok(vec![listing, image, hex])
}

/// Phony aggregate over the artifacts plus the linked binary, and the
/// default target.
fn add_aggregate(
    graph: &mut BuildGraph,
    mut members: Vec<Utf8PathBuf>,
    elf: Utf8PathBuf,
) -> Result<(), GraphError> {
    members.push(elf);
    graph.add(Utf8PathBuf::from("all"), BuildEdge::phony(members))?;
    graph.default_target("all");
    Ok(())
}

/// The regeneration node has no file inputs, so it is always considered
/// stale and re-runs the generator on demand.
fn add_regeneration(graph: &mut BuildGraph) -> Result<(), GraphError> {
    graph.add(
        Utf8PathBuf::from("regen"),
        BuildEdge::new("regenerate", Vec::new()),
    )
}

fn add_shortcuts(graph: &mut BuildGraph, req: &BuildRequest<'_>) -> Result<(), GraphError> {
    for shortcut in req.shortcuts {
        let inputs = shortcut
            .command
            .split_whitespace()
            .map(Utf8PathBuf::from)
            .collect();
        // The wrapper flavour and the tracked outputs must agree: whenever
        // the rule writes a `.bat` file, the graph declares it.
        let implicit_outputs = if posix_stubs(req) {
            Vec::new()
        } else {
            vec![Utf8PathBuf::from(format!("{}.bat", shortcut.name))]
        };
        graph.add(
            Utf8PathBuf::from(shortcut.name.as_str()),
            BuildEdge {
                implicit_outputs,
                ..BuildEdge::new("shortcut", inputs)
            },
        )?;
    }
    Ok(())
}
