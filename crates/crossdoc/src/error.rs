#[derive(thiserror::Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error("Cannot ingest {0}")]
    Ingest(String),

    #[error("No loaded document matches '{0}'")]
    DocumentNotFound(String),
}
