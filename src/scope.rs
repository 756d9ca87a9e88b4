//! Lexical scopes used to resolve sequence lengths and variant tags.
//!
//! Scopes form an arena of frames linked to their parent by index. A frame is
//! either *open* (a struct being decoded, accumulating its fields in order) or
//! *sealed* (an already decoded struct such as the packet context). Lookups
//! start at a frame and walk outward through the parents.

use std::{fmt, sync::Arc};

use crate::{
    config::DecodeConfig,
    types::{Definition, StructDefinition, resolve},
};

/// Dotted location of a definition, e.g. `fields.var.a`.
///
/// The last component is the field name; names created with [ScopePath::new]
/// keep the whole path as their name so lexical roots such as
/// `stream.packet.context` stay addressable as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopePath {
    path: Arc<str>,
    name_start: usize,
}

impl Default for ScopePath {
    fn default() -> Self {
        Self::new("")
    }
}

impl ScopePath {
    pub fn new(path: &str) -> Self {
        Self {
            path: Arc::from(path),
            name_start: 0,
        }
    }

    pub fn child(&self, name: &str) -> Self {
        if self.path.is_empty() {
            return Self::new(name);
        }

        Self {
            path: Arc::from(format!("{}.{}", self.path, name)),
            name_start: self.path.len() + 1,
        }
    }

    /// Path of the `index`-th element of an array or sequence.
    pub fn element(&self, index: usize) -> Self {
        Self {
            path: Arc::from(format!("{}[{}]", self.path, index)),
            name_start: self.name_start,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.path[self.name_start..]
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns what follows `self.` in `name`, if `name` is spelled relative to this path.
    fn strip_from<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.path.is_empty() {
            return None;
        }

        name.strip_prefix(&*self.path)?.strip_prefix('.')
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Well-known roots of a CTF record, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexicalScope {
    TracePacketHeader,
    StreamPacketContext,
    StreamEventHeader,
    StreamEventContext,
    EventContext,
    Fields,
}

impl LexicalScope {
    pub fn path(&self) -> &'static str {
        match self {
            LexicalScope::TracePacketHeader => "trace.packet.header",
            LexicalScope::StreamPacketContext => "stream.packet.context",
            LexicalScope::StreamEventHeader => "stream.event.header",
            LexicalScope::StreamEventContext => "stream.event.context",
            LexicalScope::EventContext => "event.context",
            LexicalScope::Fields => "fields",
        }
    }

    pub fn scope_path(&self) -> ScopePath {
        ScopePath::new(self.path())
    }
}

impl fmt::Display for LexicalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Index of a frame in a [Scopes] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The root frame every [Scopes] starts with.
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug)]
enum Bindings {
    Open(Vec<Definition>),
    Sealed(Arc<StructDefinition>),
}

#[derive(Debug)]
struct Frame {
    path: ScopePath,
    parent: Option<ScopeId>,
    bindings: Bindings,
}

impl Frame {
    fn fields(&self) -> &[Definition] {
        match &self.bindings {
            Bindings::Open(fields) => fields,
            Bindings::Sealed(definition) => definition.fields(),
        }
    }

    fn resolve(&self, name: &str) -> Option<&Definition> {
        let relative = self.path.strip_from(name).unwrap_or(name);
        resolve(self.fields(), relative)
    }
}

/// Arena of lexical frames for one record decode.
///
/// Frames are pushed and popped in strict nesting order by the struct
/// decoder; sealed frames are pushed by the caller to expose definitions
/// decoded earlier (e.g. the packet context shared by every event of a packet).
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<Frame>,
    config: DecodeConfig,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self::with_config(DecodeConfig::default())
    }

    pub fn with_config(config: DecodeConfig) -> Self {
        Self {
            frames: vec![Frame {
                path: ScopePath::default(),
                parent: None,
                bindings: Bindings::Open(Vec::new()),
            }],
            config,
        }
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// `None` once `id` has been closed.
    pub fn path(&self, id: ScopeId) -> Option<&ScopePath> {
        self.frames.get(id.0).map(|frame| &frame.path)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.frames.get(id.0)?.parent
    }

    /// Definitions visible directly in `id`, in binding order.
    pub fn bindings(&self, id: ScopeId) -> &[Definition] {
        self.frames.get(id.0).map(Frame::fields).unwrap_or_default()
    }

    /// Pushes a frame exposing the fields of an already decoded struct.
    pub fn seal(&mut self, parent: ScopeId, definition: Arc<StructDefinition>) -> ScopeId {
        let id = ScopeId(self.frames.len());
        self.frames.push(Frame {
            path: definition.path().clone(),
            parent: Some(parent),
            bindings: Bindings::Sealed(definition),
        });
        id
    }

    /// Pushes an empty frame that accumulates definitions through [Scopes::bind].
    pub fn open(&mut self, parent: ScopeId, path: ScopePath) -> ScopeId {
        let id = ScopeId(self.frames.len());
        self.frames.push(Frame {
            path,
            parent: Some(parent),
            bindings: Bindings::Open(Vec::new()),
        });
        id
    }

    /// Appends a decoded definition to an open frame. Sealed frames are left untouched.
    pub fn bind(&mut self, id: ScopeId, definition: Definition) {
        if let Some(Frame {
            bindings: Bindings::Open(fields),
            ..
        }) = self.frames.get_mut(id.0)
        {
            fields.push(definition);
        }
    }

    /// Pops `id` and every frame pushed after it, returning the definitions
    /// bound to `id` if it was open. The root frame and already closed ids
    /// are left alone.
    pub fn close(&mut self, id: ScopeId) -> Vec<Definition> {
        if id == ScopeId::ROOT || id.0 >= self.frames.len() {
            return Vec::new();
        }

        let mut popped = self.frames.split_off(id.0);
        match popped.swap_remove(0).bindings {
            Bindings::Open(fields) => fields,
            Bindings::Sealed(_) => Vec::new(),
        }
    }

    /// Resolves `name` starting at `from` and walking out through the parents.
    ///
    /// Names may be dotted to reach into struct members (`header.id`) and may
    /// be spelled from a frame's lexical root (`stream.event.context.cpu`).
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<&Definition> {
        let mut current = Some(from);
        while let Some(frame) = current.and_then(|id| self.frames.get(id.0)) {
            if let Some(found) = frame.resolve(name) {
                return Some(found);
            }
            current = frame.parent;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntegerDeclaration, IntegerDefinition, StructBuilder};

    fn int(path: &ScopePath, name: &str, value: i64) -> Definition {
        Definition::Integer(IntegerDefinition::new(
            Arc::new(IntegerDeclaration::uint_8()),
            path.child(name),
            value,
        ))
    }

    #[test]
    fn test_path_child_and_name() {
        let root = ScopePath::default();
        let fields = root.child("fields");
        let var = fields.child("var");
        assert_eq!(var.as_str(), "fields.var");
        assert_eq!(var.name(), "var");
        assert_eq!(var.element(2).as_str(), "fields.var[2]");
        assert_eq!(var.element(2).name(), "var[2]");
    }

    #[test]
    fn test_lexical_path_is_its_own_name() {
        let path = LexicalScope::StreamPacketContext.scope_path();
        assert_eq!(path.name(), "stream.packet.context");
        assert_eq!(path.child("cpu_id").name(), "cpu_id");
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut scopes = Scopes::new();
        let outer = scopes.open(ScopeId::ROOT, ScopePath::new("outer"));
        scopes.bind(outer, int(&ScopePath::new("outer"), "len", 4));
        let inner = scopes.open(outer, ScopePath::new("outer.inner"));
        scopes.bind(inner, int(&ScopePath::new("outer.inner"), "x", 1));

        assert_eq!(
            scopes.lookup(inner, "len").and_then(|d| d.as_integer()).map(|i| i.value()),
            Some(4)
        );
        assert!(scopes.lookup(outer, "x").is_none());
        assert!(scopes.lookup(inner, "missing").is_none());
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let mut scopes = Scopes::new();
        let outer = scopes.open(ScopeId::ROOT, ScopePath::new("a"));
        scopes.bind(outer, int(&ScopePath::new("a"), "n", 1));
        let inner = scopes.open(outer, ScopePath::new("a.b"));
        scopes.bind(inner, int(&ScopePath::new("a.b"), "n", 2));

        let found = scopes.lookup(inner, "n").and_then(|d| d.as_integer());
        assert_eq!(found.map(|i| i.value()), Some(2));
    }

    #[test]
    fn test_close_pops_nested_frames() {
        let mut scopes = Scopes::new();
        let outer = scopes.open(ScopeId::ROOT, ScopePath::new("a"));
        scopes.bind(outer, int(&ScopePath::new("a"), "n", 1));
        let _inner = scopes.open(outer, ScopePath::new("a.b"));

        let fields = scopes.close(outer);
        assert_eq!(fields.len(), 1);
        assert!(scopes.lookup(ScopeId::ROOT, "n").is_none());
    }

    #[test]
    fn test_closed_id_is_inert() {
        let mut scopes = Scopes::new();
        let frame = scopes.open(ScopeId::ROOT, ScopePath::new("a"));
        scopes.bind(frame, int(&ScopePath::new("a"), "x", 1));
        assert_eq!(scopes.close(frame).len(), 1);

        assert!(scopes.lookup(frame, "x").is_none());
        assert!(scopes.path(frame).is_none());
        assert!(scopes.parent(frame).is_none());
        assert!(scopes.bindings(frame).is_empty());
        assert!(scopes.close(frame).is_empty());

        scopes.bind(frame, int(&ScopePath::new("a"), "x", 2));
        assert!(scopes.bindings(ScopeId::ROOT).is_empty());
    }

    #[test]
    fn test_close_root_is_noop() {
        let mut scopes = Scopes::new();
        scopes.bind(ScopeId::ROOT, int(&ScopePath::default(), "n", 7));

        assert!(scopes.close(ScopeId::ROOT).is_empty());
        assert_eq!(scopes.path(ScopeId::ROOT), Some(&ScopePath::default()));
        assert_eq!(
            scopes.lookup(ScopeId::ROOT, "n").and_then(|d| d.as_integer()).map(|i| i.value()),
            Some(7)
        );
    }

    #[test]
    fn test_sealed_frame_resolves_by_lexical_prefix() {
        let mut builder = StructBuilder::new(8);
        builder
            .field("cpu_id", IntegerDeclaration::uint_8().into())
            .unwrap();
        let declaration = Arc::new(builder.build());

        let path = LexicalScope::StreamPacketContext.scope_path();
        let context =
            StructDefinition::new(declaration, path.clone(), vec![int(&path, "cpu_id", 3)]);

        let mut scopes = Scopes::new();
        let sealed = scopes.seal(ScopeId::ROOT, Arc::new(context));
        let open = scopes.open(sealed, ScopePath::new("fields"));

        let by_name = scopes.lookup(open, "cpu_id").and_then(|d| d.as_integer());
        assert_eq!(by_name.map(|i| i.value()), Some(3));

        let by_path = scopes
            .lookup(open, "stream.packet.context.cpu_id")
            .and_then(|d| d.as_integer());
        assert_eq!(by_path.map(|i| i.value()), Some(3));
    }
}
