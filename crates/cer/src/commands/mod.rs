//! CLI command implementations.

pub(crate) mod export;
pub(crate) mod generate;
pub(crate) mod preview;

pub(crate) use export::ExportArgs;
pub(crate) use generate::GenerateArgs;
pub(crate) use preview::PreviewArgs;
