//! Declarative deployment topology of the account service and its rendering
//! into an AWS CloudFormation template.

pub mod error;
pub mod render;
pub mod topology;

pub use error::DeployError;
pub use render::{TemplateFormat, render, render_cloudformation};
pub use topology::Topology;
