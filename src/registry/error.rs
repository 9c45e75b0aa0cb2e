/// Errors that can occur while building the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("backend already exists: {0}")]
    DuplicateBackend(String),

    #[error("fallback chain '{chain}' lists unknown backend '{member}'")]
    UnknownChainMember { chain: String, member: String },
}
