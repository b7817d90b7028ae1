use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("interface {0} not found")]
    InterfaceNotFound(String),

    #[error("capture error: {0}")]
    Capture(#[from] pcap::Error),

    #[error("unsupported link type {0}")]
    UnsupportedLinkType(String),

    #[error("no local MAC or IP known, outbound traffic cannot be recognised (use --local-mac/--local-ip or --inbound)")]
    NoLocalIdentity,

    #[error("capture source ended")]
    CaptureEnded,

    #[error("geo database: {0}")]
    Geo(#[from] maxminddb::MaxMindDBError),

    #[error("connection probe: {0}")]
    Probe(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
