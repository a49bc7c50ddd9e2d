//! Kubernetes/OpenShift backends for the KIE testing framework: project
//! (namespace) management, service-name resolution, deployment handles, and
//! the standard external-dependency registry.

pub mod backend;
pub mod dependencies;
pub mod deployment;
pub mod listener;
mod manifests;
pub mod project;
pub mod resolver;
