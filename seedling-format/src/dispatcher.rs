use seedling_core::{Erased, MetadataKind, ScalarCodec, ScalarValue, TypeRef};

use crate::seed::{CompositeKind, Seed, Slot, lift, open_child};
use crate::{
    ConversionError, DeserializeOptions, EventKind, EventSink, Found, LocatedError, ParseEvent,
    Path, PathStep, SeedError, Span,
};

/// One open composite.
struct Frame {
    seed: Box<dyn Seed>,
    /// Where the finished value goes in the parent frame; `None` for the root.
    slot: Option<Slot>,
    /// Key whose value comes next (object frames).
    pending_key: Option<String>,
    /// Position of the next element (array frames).
    next_index: usize,
}

enum Finished {
    Seed(Box<dyn Seed>),
    Value(Erased),
}

/// Routes parse events to the seed of the innermost open composite.
///
/// Nesting is tracked with an explicit stack of frames, never with
/// recursion, so input depth only costs heap memory (and can be bounded
/// with [`DeserializeOptions::max_depth`]).
pub struct Dispatcher {
    root: TypeRef,
    options: DeserializeOptions,
    stack: Vec<Frame>,
    path: Path,
    /// Nesting depth inside a value that is being skipped.
    skip_depth: usize,
    /// An ignored key was seen; its value is skipped.
    pending_skip: bool,
    finished: Option<Finished>,
    last_span: Option<Span>,
}

impl Dispatcher {
    /// A dispatcher that builds a value of `root`.
    pub fn new(root: TypeRef, options: DeserializeOptions) -> Self {
        Dispatcher {
            root,
            options,
            stack: Vec::new(),
            path: Path::new(),
            skip_depth: 0,
            pending_skip: false,
            finished: None,
            last_span: None,
        }
    }

    /// Number of open composites.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether the root value is complete.
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Handle one event.
    pub fn handle_event(&mut self, event: ParseEvent) -> Result<(), LocatedError> {
        trace!(event = ?event.kind, depth = self.stack.len(), "dispatch");
        // synthetic events carry empty spans
        self.last_span = (!event.span.is_empty()).then_some(event.span);
        self.dispatch(event.kind).map_err(|error| self.locate(error))
    }

    /// The root value, once the input has ended.
    pub fn finish(mut self) -> Result<Erased, LocatedError> {
        match self.finished.take() {
            Some(Finished::Value(value)) => Ok(value),
            Some(Finished::Seed(seed)) => {
                debug!(type_name = seed.type_name(), "root complete");
                seed.into_value()
                    .and_then(|value| lift(self.root, value))
                    .map_err(|error| self.locate(error))
            }
            None => Err(self.locate(SeedError::UnexpectedEof)),
        }
    }

    fn locate(&self, error: SeedError) -> LocatedError {
        LocatedError {
            error,
            path: self.path.clone(),
            span: self.last_span,
        }
    }

    fn dispatch(&mut self, kind: EventKind) -> Result<(), SeedError> {
        if self.skip_depth > 0 {
            return self.skip(kind);
        }
        if self.finished.is_some() {
            return Err(SeedError::unexpected("end of input", kind.describe()));
        }
        match kind {
            EventKind::Key(key) => self.key(key),
            EventKind::Scalar(raw) => self.scalar(raw),
            EventKind::ObjectStart => self.open(CompositeKind::Object),
            EventKind::ArrayStart => self.open(CompositeKind::Array),
            EventKind::ObjectEnd => self.close(CompositeKind::Object),
            EventKind::ArrayEnd => self.close(CompositeKind::Array),
        }
    }

    /// Inside an ignored value: only track nesting until it ends.
    fn skip(&mut self, kind: EventKind) -> Result<(), SeedError> {
        match kind {
            EventKind::ObjectStart | EventKind::ArrayStart => self.skip_depth += 1,
            EventKind::ObjectEnd | EventKind::ArrayEnd => {
                self.skip_depth -= 1;
                if self.skip_depth == 0 {
                    trace!(path = %self.path, "skipped value");
                    self.value_done();
                }
            }
            EventKind::Key(_) | EventKind::Scalar(_) => {}
        }
        Ok(())
    }

    fn key(&mut self, key: String) -> Result<(), SeedError> {
        let got = || format!("key {key:?}");
        let Some(frame) = self.stack.last_mut() else {
            return Err(SeedError::unexpected("a value", got()));
        };
        if frame.seed.kind() != CompositeKind::Object {
            return Err(SeedError::unexpected("an array element", got()));
        }
        if frame.pending_key.is_some() || self.pending_skip {
            return Err(SeedError::unexpected("a value", got()));
        }

        self.path.push(PathStep::Field(key.clone()));
        let accepted = frame.seed.accepts_key(&key)?;
        if !accepted {
            self.pending_skip = true;
        }
        frame.pending_key = Some(key);
        Ok(())
    }

    fn scalar(&mut self, raw: ScalarValue) -> Result<(), SeedError> {
        if self.pending_skip {
            self.pending_skip = false;
            self.value_done();
            return Ok(());
        }
        if self.stack.is_empty() {
            let value = self.root_scalar(raw)?;
            self.finished = Some(Finished::Value(value));
            return Ok(());
        }

        let key = self.begin_value(|| raw.to_string())?;
        if let Some(frame) = self.stack.last_mut() {
            frame.seed.set_scalar(key.as_deref(), raw)?;
        }
        self.value_done();
        Ok(())
    }

    fn root_scalar(&self, raw: ScalarValue) -> Result<Erased, SeedError> {
        let meta = self.root.metadata()?;
        let codec = ScalarCodec::Default(self.root);
        let reason = match codec.decode(&raw) {
            Ok(value) => return Ok(value),
            Err(reason) => reason,
        };
        let reason = match &meta.kind {
            MetadataKind::Struct(_) => "expected an object".to_owned(),
            MetadataKind::Sequence(_) => "expected an array".to_owned(),
            _ => reason.to_string(),
        };
        Err(SeedError::Conversion(ConversionError {
            field: meta.type_name.to_owned(),
            declared: meta.type_name,
            found: Found::Scalar(raw),
            reason,
        }))
    }

    fn open(&mut self, kind: CompositeKind) -> Result<(), SeedError> {
        if self.pending_skip {
            self.pending_skip = false;
            self.skip_depth = 1;
            return Ok(());
        }
        if let Some(max) = self.options.max_depth
            && self.stack.len() >= max
        {
            return Err(SeedError::DepthLimitExceeded { max });
        }

        let policy = self.options.unknown_fields;
        if self.stack.is_empty() {
            let label = match self.root.metadata() {
                Ok(meta) => meta.type_name,
                Err(_) => self.root.name(),
            };
            let seed = open_child(self.root, kind, policy, label)?;
            self.push(seed, None);
            return Ok(());
        }

        let got = match kind {
            CompositeKind::Object => "object start",
            CompositeKind::Array => "array start",
        };
        let key = self.begin_value(|| got.to_owned())?;
        let Some(frame) = self.stack.last_mut() else {
            return Err(SeedError::UnexpectedEof);
        };
        match frame.seed.begin_composite(key.as_deref(), kind)? {
            Some((slot, child)) => self.push(child, Some(slot)),
            None => self.skip_depth = 1,
        }
        Ok(())
    }

    fn push(&mut self, seed: Box<dyn Seed>, slot: Option<Slot>) {
        trace!(type_name = seed.type_name(), depth = self.stack.len() + 1, "push frame");
        self.stack.push(Frame {
            seed,
            slot,
            pending_key: None,
            next_index: 0,
        });
    }

    fn close(&mut self, kind: CompositeKind) -> Result<(), SeedError> {
        let got = match kind {
            CompositeKind::Object => "object end",
            CompositeKind::Array => "array end",
        };
        let Some(frame) = self.stack.last() else {
            return Err(SeedError::unexpected("a value", got));
        };
        if frame.seed.kind() != kind {
            let expected = match frame.seed.kind() {
                CompositeKind::Object => "a key or object end",
                CompositeKind::Array => "a value or array end",
            };
            return Err(SeedError::unexpected(expected, got));
        }
        if frame.pending_key.is_some() || self.pending_skip {
            return Err(SeedError::unexpected("a value", got));
        }

        let Some(mut frame) = self.stack.pop() else {
            return Err(SeedError::unexpected("a value", got));
        };
        frame.seed.close()?;
        // Built now, while the path still points at it, so that errors from
        // this composite are reported where it sits in the document.
        frame.seed.spawn()?;
        trace!(type_name = frame.seed.type_name(), depth = self.stack.len(), "pop frame");

        let Frame { seed, slot, .. } = frame;
        match slot {
            Some(slot) => {
                let Some(parent) = self.stack.last_mut() else {
                    return Err(SeedError::unexpected("a parent frame", got));
                };
                parent.seed.attach(slot, seed)?;
                self.value_done();
            }
            None => self.finished = Some(Finished::Seed(seed)),
        }
        Ok(())
    }

    /// Check that a value may start in the top frame, push its path step
    /// and return the key it belongs to (object frames).
    fn begin_value(&mut self, got: impl FnOnce() -> String) -> Result<Option<String>, SeedError> {
        let Some(frame) = self.stack.last_mut() else {
            return Ok(None);
        };
        match frame.seed.kind() {
            CompositeKind::Object => match &frame.pending_key {
                Some(key) => Ok(Some(key.clone())),
                None => Err(SeedError::unexpected("a key or object end", got())),
            },
            CompositeKind::Array => {
                self.path.push(PathStep::Index(frame.next_index));
                Ok(None)
            }
        }
    }

    /// The value in the top frame is complete: pop its path step.
    fn value_done(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            match frame.seed.kind() {
                CompositeKind::Object => frame.pending_key = None,
                CompositeKind::Array => frame.next_index += 1,
            }
            self.path.pop();
        }
    }
}

impl EventSink for Dispatcher {
    type Error = LocatedError;

    fn event(&mut self, event: ParseEvent) -> Result<(), Self::Error> {
        self.handle_event(event)
    }
}
