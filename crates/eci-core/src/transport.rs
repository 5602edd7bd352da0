//! The transport boundary the session layer runs over (spec §6), grounded in
//! `original_source/elitecloud_alarm/types.py::EciTransport` and in the
//! teacher's `spark-transport-tcp` channel abstraction.

use async_trait::async_trait;

use crate::error::EciError;

/// A byte-stream transport to the panel. Implementations own their own
/// connection state; `Session` treats this purely as an I/O boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<(), EciError>;
    async fn disconnect(&self) -> Result<(), EciError>;
    async fn write(&self, data: &str) -> Result<(), EciError>;

    /// Reads one chunk of decoded text. Returns `Connection` on EOF or a
    /// transport-level failure.
    async fn read(&self) -> Result<String, EciError>;
}
