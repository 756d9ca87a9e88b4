//! Record boundary: an event is a header, two optional contexts and a
//! payload, decoded in that order so that each part sees the ones before it.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    bit_cursor::BitCursor,
    config::DecodeConfig,
    errors::DecodeError,
    scope::{LexicalScope, ScopeId, Scopes},
    types::{Definition, StructDeclaration, StructDefinition},
};

/// Name of the header field holding the event timestamp.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Layout of one event type. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventDeclaration {
    name: Option<String>,
    id: Option<u64>,
    header: Option<Arc<StructDeclaration>>,
    stream_context: Option<Arc<StructDeclaration>>,
    context: Option<Arc<StructDeclaration>>,
    fields: Option<Arc<StructDeclaration>>,
}

impl EventDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_header(mut self, header: impl Into<Arc<StructDeclaration>>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_stream_context(mut self, context: impl Into<Arc<StructDeclaration>>) -> Self {
        self.stream_context = Some(context.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<Arc<StructDeclaration>>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_fields(mut self, fields: impl Into<Arc<StructDeclaration>>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn header(&self) -> Option<&Arc<StructDeclaration>> {
        self.header.as_ref()
    }

    pub fn stream_context(&self) -> Option<&Arc<StructDeclaration>> {
        self.stream_context.as_ref()
    }

    pub fn context(&self) -> Option<&Arc<StructDeclaration>> {
        self.context.as_ref()
    }

    pub fn fields(&self) -> Option<&Arc<StructDeclaration>> {
        self.fields.as_ref()
    }

    /// Decodes one record with the default [DecodeConfig].
    ///
    /// `packet_context` is the already decoded context of the enclosing
    /// packet; it is the outermost scope for length and tag references.
    pub fn decode<B: AsRef<[u8]>>(
        self: &Arc<Self>,
        cursor: &mut BitCursor<B>,
        packet_context: Option<&Arc<StructDefinition>>,
        cpu: Option<u32>,
    ) -> Result<EventDefinition, DecodeError> {
        self.decode_with_config(cursor, packet_context, cpu, DecodeConfig::default())
    }

    pub fn decode_with_config<B: AsRef<[u8]>>(
        self: &Arc<Self>,
        cursor: &mut BitCursor<B>,
        packet_context: Option<&Arc<StructDefinition>>,
        cpu: Option<u32>,
        config: DecodeConfig,
    ) -> Result<EventDefinition, DecodeError> {
        let decoded = self.decode_parts(cursor, packet_context, cpu, config);
        if let Err(err) = &decoded {
            debug!(
                event = self.name().unwrap_or("null"),
                position = cursor.position(),
                %err,
                "failed to decode event"
            );
        }
        decoded
    }

    fn decode_parts<B: AsRef<[u8]>>(
        self: &Arc<Self>,
        cursor: &mut BitCursor<B>,
        packet_context: Option<&Arc<StructDefinition>>,
        cpu: Option<u32>,
        config: DecodeConfig,
    ) -> Result<EventDefinition, DecodeError> {
        let mut scopes = Scopes::with_config(config);
        let mut scope = ScopeId::ROOT;
        if let Some(packet_context) = packet_context {
            scope = scopes.seal(scope, packet_context.clone());
        }

        let mut part = |declaration: Option<&Arc<StructDeclaration>>,
                        root: LexicalScope,
                        cursor: &mut BitCursor<B>|
         -> Result<Option<Arc<StructDefinition>>, DecodeError> {
            let Some(declaration) = declaration else {
                return Ok(None);
            };
            let definition = Arc::new(StructDefinition::decode(
                declaration,
                cursor,
                &mut scopes,
                scope,
                root.scope_path(),
            )?);
            scope = scopes.seal(scope, definition.clone());
            Ok(Some(definition))
        };

        let header = part(self.header(), LexicalScope::StreamEventHeader, cursor)?;
        let stream_context = part(self.stream_context(), LexicalScope::StreamEventContext, cursor)?;
        let event_context = part(self.context(), LexicalScope::EventContext, cursor)?;
        let fields = part(self.fields(), LexicalScope::Fields, cursor)?;

        let timestamp = header
            .as_ref()
            .and_then(|header| header.lookup_integer(TIMESTAMP_FIELD))
            .map_or(0, |timestamp| timestamp.value());

        Ok(EventDefinition::new(
            self.clone(),
            cpu,
            timestamp,
            header,
            stream_context,
            event_context,
            packet_context.cloned(),
            fields,
        ))
    }
}

impl fmt::Display for EventDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[declaration] event[name={}", self.name().unwrap_or("null"))?;
        if let Some(id) = self.id {
            write!(f, ", id={id}")?;
        }
        f.write_str("]")
    }
}

/// Decodes a struct that is the root of a lexical scope, e.g. the packet
/// context shared by every event of a packet.
pub fn decode_scope<B: AsRef<[u8]>>(
    declaration: &Arc<StructDeclaration>,
    root: LexicalScope,
    cursor: &mut BitCursor<B>,
    config: DecodeConfig,
) -> Result<Arc<StructDefinition>, DecodeError> {
    let mut scopes = Scopes::with_config(config);
    let definition =
        StructDefinition::decode(
            declaration,
            cursor,
            &mut scopes,
            ScopeId::ROOT,
            root.scope_path(),
        )?;
    Ok(Arc::new(definition))
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    declaration: Arc<EventDeclaration>,
    cpu: Option<u32>,
    timestamp: i64,
    header: Option<Arc<StructDefinition>>,
    stream_context: Option<Arc<StructDefinition>>,
    event_context: Option<Arc<StructDefinition>>,
    packet_context: Option<Arc<StructDefinition>>,
    fields: Option<Arc<StructDefinition>>,
}

impl EventDefinition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        declaration: Arc<EventDeclaration>,
        cpu: Option<u32>,
        timestamp: i64,
        header: Option<Arc<StructDefinition>>,
        stream_context: Option<Arc<StructDefinition>>,
        event_context: Option<Arc<StructDefinition>>,
        packet_context: Option<Arc<StructDefinition>>,
        fields: Option<Arc<StructDefinition>>,
    ) -> Self {
        Self {
            declaration,
            cpu,
            timestamp,
            header,
            stream_context,
            event_context,
            packet_context,
            fields,
        }
    }

    pub fn declaration(&self) -> &Arc<EventDeclaration> {
        &self.declaration
    }

    /// `None` when the CPU is unknown.
    pub fn cpu(&self) -> Option<u32> {
        self.cpu
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn header(&self) -> Option<&StructDefinition> {
        self.header.as_deref()
    }

    pub fn packet_context(&self) -> Option<&StructDefinition> {
        self.packet_context.as_deref()
    }

    pub fn stream_context(&self) -> Option<&StructDefinition> {
        self.stream_context.as_deref()
    }

    pub fn event_context(&self) -> Option<&StructDefinition> {
        self.event_context.as_deref()
    }

    pub fn fields(&self) -> Option<&StructDefinition> {
        self.fields.as_deref()
    }

    /// Stream and event contexts seen as one composite, or `None` if the
    /// record has neither.
    pub fn context(&self) -> Option<MergedContext<'_>> {
        if self.stream_context.is_none() && self.event_context.is_none() {
            return None;
        }

        Some(MergedContext {
            stream: self.stream_context(),
            event: self.event_context(),
        })
    }

    /// Payload field called `name`.
    pub fn lookup_field(&self, name: &str) -> Option<&Definition> {
        self.fields()?.lookup_definition(name)
    }
}

impl fmt::Display for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Event type: {}", self.declaration.name().unwrap_or("null"))?;
        write!(f, "Timestamp: {}", self.timestamp)?;

        let parts = [
            ("Header", &self.header),
            ("Packet context", &self.packet_context),
            ("Stream context", &self.stream_context),
            ("Event context", &self.event_context),
            ("Fields", &self.fields),
        ];
        for (title, part) in parts {
            if let Some(part) = part {
                write!(f, "\n{title}: {part}")?;
            }
        }
        Ok(())
    }
}

/// Read-only union of the stream event context and the event context.
/// Names bound in both resolve to the event context.
#[derive(Debug, Clone, Copy)]
pub struct MergedContext<'a> {
    stream: Option<&'a StructDefinition>,
    event: Option<&'a StructDefinition>,
}

impl<'a> MergedContext<'a> {
    /// Stream context names first, then event context names not seen yet.
    pub fn field_names(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = Vec::new();
        for part in [self.stream, self.event].into_iter().flatten() {
            for name in part.field_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn lookup_definition(&self, name: &str) -> Option<&'a Definition> {
        self.event
            .and_then(|event| event.lookup_definition(name))
            .or_else(|| self.stream.and_then(|stream| stream.lookup_definition(name)))
    }
}
