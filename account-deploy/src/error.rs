use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Failed to read topology: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed topology: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid topology: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("Failed to encode template as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to encode template as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
