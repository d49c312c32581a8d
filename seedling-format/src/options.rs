/// What to do with an input key that fills no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Fail with [`crate::SeedError::UnknownField`].
    #[default]
    Deny,
    /// Skip the key's value, including whole nested objects and arrays.
    Ignore,
}

/// Per-call deserialization settings.
#[derive(Debug, Clone, Default)]
pub struct DeserializeOptions {
    /// Policy for unknown (and skipped) keys.
    pub unknown_fields: UnknownFields,
    /// Deepest allowed object/array nesting; unlimited if `None`.
    pub max_depth: Option<usize>,
}

impl DeserializeOptions {
    /// Strict defaults: unknown keys are errors, nesting is unlimited.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-key policy.
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Skip unknown keys instead of failing.
    pub fn ignore_unknown_fields(self) -> Self {
        self.unknown_fields(UnknownFields::Ignore)
    }

    /// Bound the nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}
