use super::VolumeDriver;

/// Driver that declines every capability group
///
/// Useful as a registration placeholder and for probing how callers handle
/// `NotSupported`.
#[derive(Debug, Clone)]
pub struct NullDriver {
    name: String,
}

impl NullDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl VolumeDriver for NullDriver {
    fn name(&self) -> &str {
        &self.name
    }
}
