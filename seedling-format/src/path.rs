use core::fmt;

/// A single step from a value to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Object key (the input key, not the declared field name).
    Field(String),
    /// Array position.
    Index(usize),
}

/// Where in the document something happened, e.g. `$.company.tags[1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The document root, `$`.
    pub const fn new() -> Self {
        Path { steps: Vec::new() }
    }

    /// Push a step onto the path.
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Pop the last step.
    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Steps from the root, outermost first.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<PathStep> for Path {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Path {
            steps: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for step in &self.steps {
            match step {
                PathStep::Field(key) => write!(f, ".{key}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_json_path() {
        let mut path = Path::new();
        assert_eq!(path.to_string(), "$");
        path.push(PathStep::Field("company".into()));
        path.push(PathStep::Field("tags".into()));
        path.push(PathStep::Index(1));
        assert_eq!(path.to_string(), "$.company.tags[1]");
        assert_eq!(path.pop(), Some(PathStep::Index(1)));
        assert_eq!(path.to_string(), "$.company.tags");
    }
}
