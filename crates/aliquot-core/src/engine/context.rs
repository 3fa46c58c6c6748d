use super::config::TransferConfig;
use super::progress::ProgressReporter;
use crate::core::liquid::TransferProperties;

/// The read-only inputs shared by every well visit of one transfer run.
#[derive(Clone, Copy)]
pub struct TransferContext<'a> {
    pub properties: &'a TransferProperties,
    pub config: &'a TransferConfig,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> TransferContext<'a> {
    pub fn new(
        properties: &'a TransferProperties,
        config: &'a TransferConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            properties,
            config,
            reporter,
        }
    }
}
