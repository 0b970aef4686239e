//! Graph builder — walks Python syntax trees into a `SourceGraph`.
//!
//! The walk is a depth-first descent with an explicit context (current
//! parent, nearest lexical scope, active type-context) passed down each
//! call, so the builder is reentrant and testable per subtree. Constructs
//! outside the recognized set create no node but are descended through
//! transparently, which keeps the walker forward-compatible with grammar
//! extensions.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, warn};
use tree_sitter::Node as TsNode;

use super::language::{parse_python, SourceLocation};
use crate::error::{CartoError, Result};
use crate::graph::{EdgeKind, Node, NodeId, NodeKind, SourceGraph};

/// Options controlling cross-file behavior.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    /// Project boundary for import resolution. Imports resolving to files
    /// outside this root are never followed.
    pub project_root: Option<PathBuf>,
    /// Follow imports to project files that were not in the location list.
    /// When false, only listed locations are ever parsed.
    pub follow_project_imports: bool,
    /// Collect unresolved import targets under a synthetic "external"
    /// bucket module instead of leaving them unlinked.
    pub external_bucket: bool,
}

/// A non-fatal problem recorded while building.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Display name of the affected location.
    pub location: String,
    pub reason: DiagnosticReason,
}

#[derive(Debug, Clone)]
pub enum DiagnosticReason {
    /// The location could not be read.
    Unreadable(String),
    /// The location is not valid Python.
    Grammar(String),
    /// An import target could not be attributed to any analyzed file.
    UnresolvedImport(String),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            DiagnosticReason::Unreadable(msg) => {
                write!(f, "{}: unreadable: {msg}", self.location)
            }
            DiagnosticReason::Grammar(msg) => write!(f, "{}: {msg}", self.location),
            DiagnosticReason::UnresolvedImport(target) => {
                write!(f, "{}: unresolved import '{target}'", self.location)
            }
        }
    }
}

/// Result of a batch build: the graph plus everything that was skipped.
#[derive(Debug)]
pub struct BuildReport {
    pub graph: SourceGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds a [`SourceGraph`] from one or more source locations.
pub struct GraphBuilder {
    options: BuilderOptions,
}

/// Per-walk context. Copied, never shared, so sibling subtrees cannot
/// observe each other's state.
#[derive(Debug, Clone, Copy)]
struct WalkContext {
    /// Structural parent for nodes created next.
    parent: NodeId,
    /// Nearest enclosing module/class/function; name bindings attach here.
    scope: NodeId,
    /// Container/comprehension tag applied to name bindings, if any.
    type_ctx: Option<NodeKind>,
}

impl WalkContext {
    fn nested(self, parent: NodeId) -> Self {
        Self { parent, ..self }
    }

    fn scoped(self, scope: NodeId) -> Self {
        Self {
            parent: scope,
            scope,
            type_ctx: self.type_ctx,
        }
    }

    fn typed(self, type_ctx: NodeKind) -> Self {
        Self {
            type_ctx: Some(type_ctx),
            ..self
        }
    }
}

/// Mutable state scoped to one `build` call. Nothing here outlives the
/// call, so repeated builds are deterministic and free of stale caches.
struct WalkState {
    next_id: u64,
    /// location key -> module root id, for locations fully built.
    parsed: HashMap<String, NodeId>,
    /// location key -> module root id, for locations on the recursion stack.
    in_progress: HashMap<String, NodeId>,
    /// Locations that already produced a diagnostic.
    failed: HashSet<String>,
    /// Listed locations by key, for import resolution and deferral.
    listed: IndexMap<String, SourceLocation>,
    /// Completed graphs of listed locations reached via imports; merged
    /// under the analysis root once the current top-level walk returns.
    deferred: Vec<SourceGraph>,
    /// Call sites awaiting target resolution: (call node, callee name).
    calls: Vec<(NodeId, String)>,
    /// Import nodes whose target was not found: (import node, target).
    unresolved: Vec<(NodeId, String)>,
    diagnostics: Vec<Diagnostic>,
}

impl WalkState {
    fn new(locations: &[SourceLocation]) -> Self {
        Self {
            next_id: 0,
            parsed: HashMap::new(),
            in_progress: HashMap::new(),
            failed: HashSet::new(),
            listed: locations
                .iter()
                .map(|loc| (loc.key(), loc.clone()))
                .collect(),
            deferred: Vec::new(),
            calls: Vec::new(),
            unresolved: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn mint(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            options: BuilderOptions::default(),
        }
    }

    pub fn with_options(options: BuilderOptions) -> Self {
        Self { options }
    }

    /// Build a graph from the given locations.
    ///
    /// With a single location, read and parse failures propagate as hard
    /// errors. With several, failing locations are skipped and recorded in
    /// the report so one malformed file cannot abort a project-wide run.
    pub fn build(&self, locations: &[SourceLocation]) -> Result<BuildReport> {
        let single = locations.len() == 1;
        let mut state = WalkState::new(locations);

        let mut graph = SourceGraph::new();
        let root_id = state.mint();
        graph.insert_node(Node::new(root_id, NodeKind::Module, "root", None))?;

        for location in locations {
            let key = location.key();
            if state.parsed.contains_key(&key) || state.failed.contains(&key) {
                continue;
            }
            match self.build_location(location, &mut state) {
                Ok(sub) => {
                    graph.merge(sub, root_id)?;
                    self.drain_deferred(&mut graph, root_id, &mut state)?;
                }
                Err(err) if single => return Err(err),
                Err(err) => {
                    warn!(location = %location.display_name(), error = %err, "skipping location");
                    state.failed.insert(key);
                    state.diagnostics.push(to_diagnostic(location, &err));
                }
            }
        }
        self.drain_deferred(&mut graph, root_id, &mut state)?;

        if self.options.external_bucket && !state.unresolved.is_empty() {
            self.attach_external_bucket(&mut graph, root_id, &mut state)?;
        }
        self.link_call_targets(&mut graph, &state);

        Ok(BuildReport {
            graph,
            diagnostics: state.diagnostics,
        })
    }

    /// Merge graphs of listed locations that finished during an import
    /// recursion; they belong under the analysis root, not the importer.
    fn drain_deferred(
        &self,
        graph: &mut SourceGraph,
        root_id: NodeId,
        state: &mut WalkState,
    ) -> Result<()> {
        for sub in std::mem::take(&mut state.deferred) {
            graph.merge(sub, root_id)?;
        }
        Ok(())
    }

    /// Create the "external" bucket and link every unresolved import to a
    /// module node for its target, one per distinct name.
    fn attach_external_bucket(
        &self,
        graph: &mut SourceGraph,
        root_id: NodeId,
        state: &mut WalkState,
    ) -> Result<()> {
        let bucket_id = state.mint();
        graph.insert_node(Node::new(
            bucket_id,
            NodeKind::Module,
            "external",
            Some(root_id),
        ))?;
        graph.add_edge(EdgeKind::Structural, root_id, bucket_id);

        let mut targets: IndexMap<String, NodeId> = IndexMap::new();
        let unresolved = state.unresolved.clone();
        for (import_id, target) in &unresolved {
            let module_id = match targets.get(target) {
                Some(&id) => id,
                None => {
                    let id = state.mint();
                    graph.insert_node(Node::new(
                        id,
                        NodeKind::Module,
                        target.clone(),
                        Some(bucket_id),
                    ))?;
                    graph.add_edge(EdgeKind::Structural, bucket_id, id);
                    targets.insert(target.clone(), id);
                    id
                }
            };
            graph.add_edge(EdgeKind::Reference, *import_id, module_id);
        }
        Ok(())
    }

    /// Resolve recorded call sites against function labels, first match in
    /// insertion order.
    fn link_call_targets(&self, graph: &mut SourceGraph, state: &WalkState) {
        let mut functions: HashMap<String, NodeId> = HashMap::new();
        for node in graph.nodes() {
            if node.kind == NodeKind::Function {
                functions.entry(node.label.clone()).or_insert(node.id);
            }
        }
        let links: Vec<(NodeId, NodeId)> = state
            .calls
            .iter()
            .filter_map(|(call_id, callee)| functions.get(callee).map(|&fid| (*call_id, fid)))
            .collect();
        for (call_id, target_id) in links {
            graph.add_edge(EdgeKind::Reference, call_id, target_id);
        }
    }

    // ─── Per-Location Walk ──────────────────────────────────────

    /// Parse one location into its own sub-graph rooted at a Module node.
    ///
    /// The location is held in `in_progress` for the duration of the walk
    /// so circular imports link against the already-minted module id
    /// instead of recursing.
    fn build_location(
        &self,
        location: &SourceLocation,
        state: &mut WalkState,
    ) -> Result<SourceGraph> {
        let text = location.read()?;
        let tree = parse_python(&text, &location.display_name())?;
        debug!(location = %location.display_name(), "parsing");

        let mut graph = SourceGraph::new();
        let module_id = state.mint();
        graph.insert_node(Node::new(
            module_id,
            NodeKind::Module,
            location.display_name(),
            None,
        ))?;

        let key = location.key();
        state.in_progress.insert(key.clone(), module_id);
        let ctx = WalkContext {
            parent: module_id,
            scope: module_id,
            type_ctx: None,
        };
        let result = self.walk_children(tree.root_node(), ctx, &mut graph, state, text.as_bytes());
        state.in_progress.remove(&key);
        result?;
        state.parsed.insert(key, module_id);
        Ok(graph)
    }

    fn walk_children(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, ctx, graph, state, src)?;
        }
        Ok(())
    }

    /// Visit one construct. Node-worthy kinds create a node (and possibly
    /// push a new parent); everything else descends transparently.
    fn walk(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        match node.kind() {
            "class_definition" => {
                let label = field_text(node, "name", src);
                let id = self.create(graph, state, NodeKind::Class, label, ctx.parent)?;
                self.walk_children(node, ctx.scoped(id), graph, state, src)
            }
            "function_definition" => {
                let label = field_text(node, "name", src);
                let id = self.create(graph, state, NodeKind::Function, label, ctx.parent)?;
                self.walk_children(node, ctx.scoped(id), graph, state, src)
            }
            "parameters" | "lambda_parameters" => {
                self.bind_parameters(node, ctx, graph, state, src)
            }
            "lambda" => {
                // No node of its own; its parameters still bind names.
                self.walk_children(node, ctx, graph, state, src)
            }

            "import_statement" => self.walk_import(node, ctx, graph, state, src),
            "import_from_statement" => self.walk_import_from(node, ctx, graph, state, src),

            "assignment" => self.walk_assignment(node, ctx, graph, state, src),

            "for_statement" => {
                let id = self.create(graph, state, NodeKind::For, None, ctx.parent)?;
                let inner = ctx.nested(id);
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_targets(left, inner, graph, state, src)?;
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(right, inner, graph, state, src)?;
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_children(body, inner, graph, state, src)?;
                }
                if let Some(alt) = node.child_by_field_name("alternative") {
                    self.walk(alt, inner, graph, state, src)?;
                }
                Ok(())
            }
            "while_statement" => {
                let id = self.create(graph, state, NodeKind::While, None, ctx.parent)?;
                self.walk_children(node, ctx.nested(id), graph, state, src)
            }
            "if_statement" => {
                let id = self.create(graph, state, NodeKind::If, None, ctx.parent)?;
                self.walk_children(node, ctx.nested(id), graph, state, src)
            }
            "try_statement" => {
                let id = self.create(graph, state, NodeKind::Try, None, ctx.parent)?;
                self.walk_children(node, ctx.nested(id), graph, state, src)
            }
            "except_clause" | "except_group_clause" => {
                let id = self.create(graph, state, NodeKind::ExceptHandler, None, ctx.parent)?;
                self.walk_children(node, ctx.nested(id), graph, state, src)
            }
            "with_statement" => {
                let id = self.create(graph, state, NodeKind::With, None, ctx.parent)?;
                self.walk_children(node, ctx.nested(id), graph, state, src)
            }
            "match_statement" => {
                let id = self.create(graph, state, NodeKind::Match, None, ctx.parent)?;
                self.walk_children(node, ctx.nested(id), graph, state, src)
            }
            "as_pattern" => {
                // `with open(p) as f` / `except E as e`: the alias is a
                // binding in the enclosing scope.
                if let Some(alias) = node.child_by_field_name("alias") {
                    if let Some(name) = innermost_identifier(alias, src) {
                        self.bind_name(&name, ctx, graph, state)?;
                    }
                }
                if let Some(value) = node.named_child(0) {
                    self.walk(value, ctx, graph, state, src)?;
                }
                Ok(())
            }

            // Leaf statements: a node, no descent.
            "return_statement" => self
                .create(graph, state, NodeKind::Return, None, ctx.parent)
                .map(|_| ()),
            "raise_statement" => self
                .create(graph, state, NodeKind::Raise, None, ctx.parent)
                .map(|_| ()),
            "delete_statement" => self
                .create(graph, state, NodeKind::Delete, None, ctx.parent)
                .map(|_| ()),
            "global_statement" => self
                .create(graph, state, NodeKind::Global, None, ctx.parent)
                .map(|_| ()),
            "nonlocal_statement" => self
                .create(graph, state, NodeKind::Nonlocal, None, ctx.parent)
                .map(|_| ()),

            "pass_statement" | "break_statement" | "continue_statement" | "comment" => Ok(()),

            "call" => {
                if let Some(func) = node.child_by_field_name("function") {
                    if func.kind() == "identifier" {
                        let callee = text_of(func, src);
                        let id = self.create(
                            graph,
                            state,
                            NodeKind::Call,
                            Some(callee.clone()),
                            ctx.parent,
                        )?;
                        state.calls.push((id, callee));
                    } else {
                        // Attribute or chained callee: no node, but nested
                        // calls inside it stay visible.
                        self.walk(func, ctx, graph, state, src)?;
                    }
                }
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.walk_children(args, ctx, graph, state, src)?;
                }
                Ok(())
            }

            // Container literals and comprehensions: no node, but any name
            // bound inside carries the container kind.
            "list" => self.walk_children(node, ctx.typed(NodeKind::List), graph, state, src),
            "set" => self.walk_children(node, ctx.typed(NodeKind::Set), graph, state, src),
            "dictionary" => self.walk_children(node, ctx.typed(NodeKind::Dict), graph, state, src),
            "tuple" => self.walk_children(node, ctx.typed(NodeKind::Tuple), graph, state, src),
            "list_comprehension" => {
                self.walk_children(node, ctx.typed(NodeKind::ListComp), graph, state, src)
            }
            "set_comprehension" => {
                self.walk_children(node, ctx.typed(NodeKind::SetComp), graph, state, src)
            }
            "dictionary_comprehension" => {
                self.walk_children(node, ctx.typed(NodeKind::DictComp), graph, state, src)
            }
            "generator_expression" => {
                self.walk_children(node, ctx.typed(NodeKind::GeneratorExp), graph, state, src)
            }
            "for_in_clause" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_targets(left, ctx, graph, state, src)?;
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(right, ctx, graph, state, src)?;
                }
                Ok(())
            }

            // Transparent descent: unrecognized constructs lose their own
            // node but keep their children visible.
            _ => self.walk_children(node, ctx, graph, state, src),
        }
    }

    // ─── Name Binding ───────────────────────────────────────────

    /// `x = ...`: bind the targets to the enclosing scope, tagged with the
    /// value's container kind when the value is a literal/comprehension.
    fn walk_assignment(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        let right = node.child_by_field_name("right");
        let bind_ctx = match right.and_then(container_kind) {
            Some(kind) => ctx.typed(kind),
            None => ctx,
        };
        if let Some(left) = node.child_by_field_name("left") {
            self.bind_targets(left, bind_ctx, graph, state, src)?;
        }
        if let Some(right) = right {
            self.walk(right, ctx, graph, state, src)?;
        }
        Ok(())
    }

    /// Bind every plain name in an assignment/loop target. Attribute and
    /// subscript targets have no simple lexical binding and are skipped.
    fn bind_targets(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        match node.kind() {
            "identifier" => self.bind_name(&text_of(node, src), ctx, graph, state),
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.bind_targets(child, ctx, graph, state, src)?;
                }
                Ok(())
            }
            "list_splat_pattern" => match node.named_child(0) {
                Some(inner) => self.bind_targets(inner, ctx, graph, state, src),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Function and lambda parameters bind to the function scope.
    fn bind_parameters(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        let mut cursor = node.walk();
        for param in node.named_children(&mut cursor) {
            let name = match param.kind() {
                "identifier" => Some(text_of(param, src)),
                "default_parameter" | "typed_default_parameter" => param
                    .child_by_field_name("name")
                    .map(|n| text_of(n, src)),
                "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                    innermost_identifier(param, src)
                }
                _ => None,
            };
            if let Some(name) = name {
                self.bind_name(&name, ctx, graph, state)?;
            }
            // Default values may hold calls or comprehensions of their own.
            if let Some(value) = param.child_by_field_name("value") {
                self.walk(value, ctx, graph, state, src)?;
            }
        }
        Ok(())
    }

    /// Create a Variable (or type-context-tagged) node attached to the
    /// nearest enclosing scope, never to a statement node.
    fn bind_name(
        &self,
        name: &str,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
    ) -> Result<()> {
        let kind = ctx.type_ctx.unwrap_or(NodeKind::Variable);
        let id = state.mint();
        graph.insert_node(Node::new(id, kind, name, Some(ctx.scope)))?;
        graph.add_edge(EdgeKind::Structural, ctx.scope, id);
        Ok(())
    }

    // ─── Imports ────────────────────────────────────────────────

    /// `import a, b.c as d`: one Import node per target.
    fn walk_import(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let target = match child.kind() {
                "dotted_name" => Some(text_of(child, src)),
                "aliased_import" => child
                    .child_by_field_name("name")
                    .map(|n| text_of(n, src)),
                _ => None,
            };
            if let Some(target) = target {
                self.link_import(NodeKind::Import, &target, &target, ctx, graph, state)?;
            }
        }
        Ok(())
    }

    /// `from m import x, y`: one ImportFrom node per imported name, all
    /// resolving against the source module `m`.
    fn walk_import_from(
        &self,
        node: TsNode<'_>,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        src: &[u8],
    ) -> Result<()> {
        let module_node = node.child_by_field_name("module_name");
        let module = module_node.map(|n| text_of(n, src)).unwrap_or_default();
        let module_id = module_node.map(|n| n.id());

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child.id()) == module_id {
                continue;
            }
            let label = match child.kind() {
                "dotted_name" => Some(text_of(child, src)),
                "aliased_import" => child
                    .child_by_field_name("name")
                    .map(|n| text_of(n, src)),
                "wildcard_import" => Some("*".to_string()),
                _ => None,
            };
            if let Some(label) = label {
                self.link_import(NodeKind::ImportFrom, &module, &label, ctx, graph, state)?;
            }
        }
        Ok(())
    }

    /// Create the import node and integrate the target module's graph.
    ///
    /// The parsed/in-progress protocol from the builder state decides the
    /// strategy: in-progress targets (cycles) and parsed targets link
    /// directly against the recorded module root; unseen targets are
    /// recursively built, then merged either under the analysis root
    /// (listed locations, deferred) or under the import node itself.
    fn link_import(
        &self,
        kind: NodeKind,
        target: &str,
        label: &str,
        ctx: WalkContext,
        graph: &mut SourceGraph,
        state: &mut WalkState,
    ) -> Result<()> {
        let import_id = self.create(graph, state, kind, Some(label.to_string()), ctx.parent)?;

        let Some(location) = self.resolve_target(target, state) else {
            warn!(import = target, "import target not in analyzed set");
            state.unresolved.push((import_id, target.to_string()));
            state.diagnostics.push(Diagnostic {
                location: graph
                    .root()
                    .map(|n| n.label.clone())
                    .unwrap_or_default(),
                reason: DiagnosticReason::UnresolvedImport(target.to_string()),
            });
            return Ok(());
        };

        let key = location.key();
        if let Some(&root_id) = state
            .in_progress
            .get(&key)
            .or_else(|| state.parsed.get(&key))
        {
            // Cycle or already built: never re-enter. The edge may dangle
            // until the target's sub-graph merges; that is tolerated.
            graph.add_edge(EdgeKind::Reference, import_id, root_id);
            return Ok(());
        }
        if state.failed.contains(&key) {
            return Ok(());
        }

        match self.build_location(&location, state) {
            Ok(sub) => {
                let sub_root = sub
                    .root()
                    .map(|n| n.id)
                    .expect("sub-build always creates a module root");
                if state.listed.contains_key(&key) {
                    // A listed location belongs under the analysis root;
                    // hold its graph until the current walk unwinds.
                    state.deferred.push(sub);
                    graph.add_edge(EdgeKind::Reference, import_id, sub_root);
                } else {
                    graph.merge(sub, import_id)?;
                }
            }
            Err(err) => {
                // Import-discovered files are never fatal.
                warn!(location = %location.display_name(), error = %err, "skipping imported location");
                state.failed.insert(key);
                state.diagnostics.push(to_diagnostic(&location, &err));
            }
        }
        Ok(())
    }

    /// Find the file a dotted import target refers to: the listed
    /// locations by module stem first, then (when enabled) a probe under
    /// the project root.
    fn resolve_target(&self, target: &str, state: &WalkState) -> Option<SourceLocation> {
        if target.starts_with('.') {
            return None;
        }
        for location in state.listed.values() {
            if location.module_stem() == target {
                return Some(location.clone());
            }
        }
        if self.options.follow_project_imports {
            if let Some(root) = &self.options.project_root {
                let relative: PathBuf = target.split('.').collect();
                let as_file = root.join(&relative).with_extension("py");
                if as_file.is_file() {
                    return Some(SourceLocation::Path(as_file));
                }
                let as_package = root.join(&relative).join("__init__.py");
                if as_package.is_file() {
                    return Some(SourceLocation::Path(as_package));
                }
            }
        }
        None
    }

    // ─── Helpers ────────────────────────────────────────────────

    /// Create a node plus its structural edge under `parent`.
    fn create(
        &self,
        graph: &mut SourceGraph,
        state: &mut WalkState,
        kind: NodeKind,
        label: Option<String>,
        parent: NodeId,
    ) -> Result<NodeId> {
        let label = label.unwrap_or_else(|| Node::fallback_label(kind));
        let id = state.mint();
        graph.insert_node(Node::new(id, kind, label, Some(parent)))?;
        graph.add_edge(EdgeKind::Structural, parent, id);
        Ok(id)
    }
}

/// The container kind an assignment value implies, if any.
fn container_kind(node: TsNode<'_>) -> Option<NodeKind> {
    match node.kind() {
        "list" => Some(NodeKind::List),
        "set" => Some(NodeKind::Set),
        "dictionary" => Some(NodeKind::Dict),
        "tuple" => Some(NodeKind::Tuple),
        "list_comprehension" => Some(NodeKind::ListComp),
        "set_comprehension" => Some(NodeKind::SetComp),
        "dictionary_comprehension" => Some(NodeKind::DictComp),
        "generator_expression" => Some(NodeKind::GeneratorExp),
        _ => None,
    }
}

fn text_of(node: TsNode<'_>, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

fn field_text(node: TsNode<'_>, field: &str, src: &[u8]) -> Option<String> {
    node.child_by_field_name(field).map(|n| text_of(n, src))
}

/// First identifier inside a pattern-ish node, depth-first.
fn innermost_identifier(node: TsNode<'_>, src: &[u8]) -> Option<String> {
    if node.kind() == "identifier" {
        return Some(text_of(node, src));
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        if let Some(found) = innermost_identifier(child, src) {
            return Some(found);
        }
    }
    None
}

fn to_diagnostic(location: &SourceLocation, err: &CartoError) -> Diagnostic {
    let reason = match err {
        CartoError::UnreadableLocation { source, .. } => {
            DiagnosticReason::Unreadable(source.to_string())
        }
        CartoError::Grammar {
            line,
            column,
            detail,
            ..
        } => DiagnosticReason::Grammar(format!(
            "syntax error at line {line}, column {column}: {detail}"
        )),
        other => DiagnosticReason::Grammar(other.to_string()),
    };
    Diagnostic {
        location: location.display_name(),
        reason,
    }
}
