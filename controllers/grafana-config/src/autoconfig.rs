//! Grafana credential discovery for the sidecar deployment.
//!
//! When the operator runs in the Grafana pod it can read the admin
//! credentials from the secret the `grafana` container gets them from.

use crate::config::GrafanaSettings;
use crate::error::ControllerError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::{Api, Client};
use tracing::{debug, info};

const NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
const GRAFANA_CONTAINER: &str = "grafana";
const ADMIN_USER_ENV: &str = "GF_SECURITY_ADMIN_USER";
const ADMIN_USER_KEY: &str = "admin-user";
const ADMIN_PASSWORD_KEY: &str = "admin-password";

/// Endpoint of the Grafana container next to this one
pub const LOCAL_GRAFANA_ENDPOINT: &str = "http://localhost:3000";

/// Name of the secret holding the admin user of the `grafana` container
pub fn credential_secret_name(pod: &Pod) -> Option<&str> {
    pod.spec
        .as_ref()?
        .containers
        .iter()
        .find(|container| container.name == GRAFANA_CONTAINER)?
        .env
        .as_ref()?
        .iter()
        .find(|env| env.name == ADMIN_USER_ENV)?
        .value_from
        .as_ref()?
        .secret_key_ref
        .as_ref()
        .map(|selector| selector.name.as_str())
        .filter(|name| !name.is_empty())
}

fn secret_value<'a>(secret: &'a Secret, key: &str) -> Result<&'a [u8], ControllerError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| value.0.as_slice())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ControllerError::Autoconfigure(format!("{key} is empty")))
}

/// `user:password` auth string from the credential secret
///
/// The password is stored base64 encoded inside the secret data.
pub fn credentials_from_secret(secret: &Secret) -> Result<String, ControllerError> {
    let user = String::from_utf8_lossy(secret_value(secret, ADMIN_USER_KEY)?)
        .trim()
        .to_string();
    let encoded = secret_value(secret, ADMIN_PASSWORD_KEY)?;
    let password = STANDARD
        .decode(encoded.trim_ascii())
        .map_err(|e| {
            ControllerError::Autoconfigure(format!("{ADMIN_PASSWORD_KEY} is not base64: {e}"))
        })?;
    let password = String::from_utf8(password)
        .map_err(|e| {
            ControllerError::Autoconfigure(format!("{ADMIN_PASSWORD_KEY} is not UTF-8: {e}"))
        })?;
    Ok(format!("{user}:{password}"))
}

/// Discover Grafana endpoint and credentials from the pod this process runs in
pub async fn autoconfigure(client: Client) -> Result<GrafanaSettings, ControllerError> {
    let namespace = tokio::fs::read_to_string(NAMESPACE_FILE)
        .await
        .map_err(|e| {
            ControllerError::Autoconfigure(format!("failed to read {NAMESPACE_FILE}: {e}"))
        })?;
    let namespace = namespace.trim();
    debug!("Pod namespace is {}", namespace);

    let pod_name = hostname::get()
        .map_err(|e| ControllerError::Autoconfigure(format!("failed to read host name: {e}")))?
        .to_string_lossy()
        .into_owned();
    debug!("Pod name is {}", pod_name);

    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pod = pods.get(&pod_name).await?;
    let secret_name = credential_secret_name(&pod).ok_or_else(|| {
        ControllerError::Autoconfigure(format!(
            "no {ADMIN_USER_ENV} secret reference in container '{GRAFANA_CONTAINER}' of pod {namespace}/{pod_name}"
        ))
    })?;
    debug!("Credential secret is {}", secret_name);

    let secrets: Api<Secret> = Api::namespaced(client, namespace);
    let secret = secrets.get(secret_name).await?;
    let auth = credentials_from_secret(&secret)?;

    info!(
        "Successfully autoconfigured Grafana credentials from secret {}/{}",
        namespace, secret_name
    );
    Ok(GrafanaSettings {
        endpoint: Some(LOCAL_GRAFANA_ENDPOINT.to_string()),
        auth: Some(auth),
    })
}
