//! Adapter traits for the external collaborators

mod directory;
mod runtime;

pub use directory::Directory;
pub use runtime::{
    ExecAttachment, ExecId, ExecSpec, InputSink, LogChunk, LogOptions, LogStream, OutputChannel,
    OutputStream, Runtime,
};
