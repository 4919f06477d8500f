//! The compilation graph.
//!
//! A build is expressed as a graph of typed, lazily resolved nodes. Each node
//! implements [`Target`]: it knows its output type and how to compute its value
//! from its upstream nodes and the shared [`CompilationContext`]. Nothing runs
//! until a root target is handed to [`CompilationContext::run`].
//!
//! ```text
//!                ValueLeaf(manifest)
//!                       │
//!          Step(select page format) ──► Exec ──► ParsedPage ─┐
//!                                                            ├─ JoinIf ─► Step(assemble) ─► ... ─► Step(write)
//!          Step(select template) ────► Exec ──► ParsedTemplate┘   (only if the page names a template)
//! ```
//!
//! ## Node kinds
//!
//! | Node | Output | Resolves |
//! |------|--------|----------|
//! | [`ValueLeaf`] | `T` | nothing, returns its value |
//! | [`Step`] | `X::Output` | its upstream, then applies a [`Transform`] |
//! | [`Join`] | `(A, B)` | both upstreams, independently |
//! | [`JoinIf`] | `(A, Option<B>)` | the first upstream; the second only if the predicate accepts the first value |
//! | [`Exec`] | `T` | an upstream whose value is itself a target, then that target |
//! | [`Unreachable`] | `T` | never: resolving it is a wiring error |
//!
//! A root target is any `Target<Output = ()>`.
//!
//! ## Memoisation
//!
//! Every node gets a process-unique [`TargetId`] at construction. The provided
//! [`Target::resolve`] caches successful results in the context under that id,
//! so a node shared by several consumers computes once per context. Failed
//! resolutions are not cached. Contexts never share cached values.
//!
//! Memoised values live until [`CompilationContext::forget_values`]. A build
//! calls it after every page: page graphs share no nodes, and the only state
//! meant to outlive a page is the template cache.

use crate::cache::TemplateCache;
use crate::formats::{FormatError, Formats};
use crate::macros::MacroScope;
use crate::scan::Site;
use crate::types::Diagnostic;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Format { path: PathBuf, source: FormatError },
    #[error("page {page} references unknown template `{template}`")]
    TemplateNotFound { page: PathBuf, template: String },
    #[error("template `{template}` failed to load earlier in this build: {reason}")]
    TemplateUnavailable { template: String, reason: String },
    #[error("pipeline wiring error: resolved an unreachable target ({what})")]
    Unreachable { what: &'static str },
    #[error("pipeline wiring error: {0}")]
    Wiring(String),
}

impl CompileError {
    /// Whether the error comes from a malformed graph rather than from site data.
    pub fn is_structural(&self) -> bool {
        matches!(self, CompileError::Unreachable { .. } | CompileError::Wiring(_))
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> CompileError + '_ {
        move |source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Identity of a node, used as the memoisation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TargetId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub trait Target {
    type Output: Clone + 'static;

    fn id(&self) -> TargetId;

    /// Compute the value from scratch. Called at most once per context for
    /// a successful result.
    fn compute(&self, ctx: &mut CompilationContext<'_>) -> Result<Self::Output, CompileError>;

    fn resolve(&self, ctx: &mut CompilationContext<'_>) -> Result<Self::Output, CompileError> {
        ctx.memoize(self.id(), |ctx| self.compute(ctx))
    }
}

pub type TargetRef<T> = Rc<dyn Target<Output = T>>;

/// A root of the graph: a target resolved for its side effects.
pub type RootRef = TargetRef<()>;

/// Shared state for one build.
pub struct CompilationContext<'a> {
    pub site: &'a Site,
    pub formats: &'a Formats,
    pub templates: TemplateCache,
    diagnostics: Vec<Diagnostic>,
    artifacts: Vec<PathBuf>,
    memo: HashMap<TargetId, Box<dyn Any>>,
    computed: usize,
}

impl<'a> CompilationContext<'a> {
    pub fn new(site: &'a Site, formats: &'a Formats) -> Self {
        Self {
            site,
            formats,
            templates: TemplateCache::new(),
            diagnostics: Vec::new(),
            artifacts: Vec::new(),
            memo: HashMap::new(),
            computed: 0,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.site.manifest.output_dir()
    }

    /// The outermost macro scope: the site's `[macros]` table.
    pub fn site_scope(&self) -> MacroScope {
        MacroScope::new().push(self.site.manifest.macros.values.clone())
    }

    pub fn run(&mut self, root: &RootRef) -> Result<(), CompileError> {
        root.resolve(self)
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn record_artifact(&mut self, path: PathBuf) {
        self.artifacts.push(path);
    }

    /// Artifacts written so far, in write order.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Number of node computations performed so far (cache misses).
    pub fn computed(&self) -> usize {
        self.computed
    }

    /// Number of node values currently memoised.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// Drop every memoised node value. Templates, diagnostics and artifacts
    /// are kept.
    pub fn forget_values(&mut self) {
        self.memo.clear();
    }

    pub fn memoize<T: Clone + 'static>(
        &mut self,
        id: TargetId,
        compute: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if let Some(value) = self.memo.get(&id).and_then(|v| v.downcast_ref::<T>()) {
            return Ok(value.clone());
        }
        self.computed += 1;
        let value = compute(self)?;
        self.memo.insert(id, Box::new(value.clone()));
        Ok(value)
    }
}

// ============================================================================
// Node kinds
// ============================================================================

pub struct ValueLeaf<T> {
    id: TargetId,
    value: T,
}

impl<T: Clone + 'static> ValueLeaf<T> {
    pub fn new(value: T) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::fresh(),
            value,
        })
    }
}

impl<T: Clone + 'static> Target for ValueLeaf<T> {
    type Output = T;

    fn id(&self) -> TargetId {
        self.id
    }

    fn compute(&self, _ctx: &mut CompilationContext<'_>) -> Result<T, CompileError> {
        Ok(self.value.clone())
    }
}

/// One typed transformation applied by a [`Step`].
pub trait Transform: 'static {
    type Input: Clone + 'static;
    type Output: Clone + 'static;

    fn apply(
        &self,
        input: Self::Input,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<Self::Output, CompileError>;
}

pub struct Step<X: Transform> {
    id: TargetId,
    upstream: TargetRef<X::Input>,
    transform: X,
}

impl<X: Transform> Step<X> {
    pub fn new(upstream: TargetRef<X::Input>, transform: X) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::fresh(),
            upstream,
            transform,
        })
    }
}

impl<X: Transform> Target for Step<X> {
    type Output = X::Output;

    fn id(&self) -> TargetId {
        self.id
    }

    fn compute(&self, ctx: &mut CompilationContext<'_>) -> Result<X::Output, CompileError> {
        let input = self.upstream.resolve(ctx)?;
        self.transform.apply(input, ctx)
    }
}

pub struct Join<A, B> {
    id: TargetId,
    first: TargetRef<A>,
    second: TargetRef<B>,
}

impl<A: Clone + 'static, B: Clone + 'static> Join<A, B> {
    pub fn new(first: TargetRef<A>, second: TargetRef<B>) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::fresh(),
            first,
            second,
        })
    }
}

impl<A: Clone + 'static, B: Clone + 'static> Target for Join<A, B> {
    type Output = (A, B);

    fn id(&self) -> TargetId {
        self.id
    }

    fn compute(&self, ctx: &mut CompilationContext<'_>) -> Result<(A, B), CompileError> {
        let a = self.first.resolve(ctx)?;
        let b = self.second.resolve(ctx)?;
        Ok((a, b))
    }
}

pub struct JoinIf<A, B> {
    id: TargetId,
    first: TargetRef<A>,
    second: TargetRef<B>,
    predicate: Box<dyn Fn(&A) -> bool>,
}

impl<A: Clone + 'static, B: Clone + 'static> JoinIf<A, B> {
    pub fn new(
        first: TargetRef<A>,
        second: TargetRef<B>,
        predicate: impl Fn(&A) -> bool + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::fresh(),
            first,
            second,
            predicate: Box::new(predicate),
        })
    }
}

impl<A: Clone + 'static, B: Clone + 'static> Target for JoinIf<A, B> {
    type Output = (A, Option<B>);

    fn id(&self) -> TargetId {
        self.id
    }

    fn compute(&self, ctx: &mut CompilationContext<'_>) -> Result<(A, Option<B>), CompileError> {
        let a = self.first.resolve(ctx)?;
        let b = if (self.predicate)(&a) {
            Some(self.second.resolve(ctx)?)
        } else {
            None
        };
        Ok((a, b))
    }
}

/// Resolves its upstream to a target, then resolves that target.
pub struct Exec<T> {
    id: TargetId,
    upstream: TargetRef<TargetRef<T>>,
}

impl<T: Clone + 'static> Exec<T> {
    pub fn new(upstream: TargetRef<TargetRef<T>>) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::fresh(),
            upstream,
        })
    }
}

impl<T: Clone + 'static> Target for Exec<T> {
    type Output = T;

    fn id(&self) -> TargetId {
        self.id
    }

    fn compute(&self, ctx: &mut CompilationContext<'_>) -> Result<T, CompileError> {
        let inner = self.upstream.resolve(ctx)?;
        inner.resolve(ctx)
    }
}

/// Stand-in for an input that must never be read.
pub struct Unreachable<T> {
    id: TargetId,
    what: &'static str,
    _output: std::marker::PhantomData<fn() -> T>,
}

impl<T: Clone + 'static> Unreachable<T> {
    pub fn new(what: &'static str) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::fresh(),
            what,
            _output: std::marker::PhantomData,
        })
    }
}

impl<T: Clone + 'static> Target for Unreachable<T> {
    type Output = T;

    fn id(&self) -> TargetId {
        self.id
    }

    fn compute(&self, _ctx: &mut CompilationContext<'_>) -> Result<T, CompileError> {
        Err(CompileError::Unreachable { what: self.what })
    }
}
