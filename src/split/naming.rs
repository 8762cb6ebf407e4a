//! Naming of output bags produced by plan execution.

use crate::error::Result;
use crate::model::validate_bag_name;

/// Produces the names of a plan's output bags, in manifest order (head
/// bag last).
pub trait BagNamer {
    /// The name for the next output bag
    fn next_name(&mut self) -> Result<String>;
}

/// Names output bags `{base}_1`, `{base}_2`, ...
#[derive(Debug, Clone)]
pub struct SequentialNamer {
    base: String,
    serial: usize,
}

impl SequentialNamer {
    /// A namer rooted at the given base name
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            serial: 0,
        }
    }
}

impl BagNamer for SequentialNamer {
    fn next_name(&mut self) -> Result<String> {
        self.serial += 1;
        let name = format!("{}_{}", self.base, self.serial);
        validate_bag_name(&name)?;
        Ok(name)
    }
}
