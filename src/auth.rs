use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;

use crate::config::AuthSettings;
use crate::error::{DelinquencyError, Result};

/// Role lookup against the hospital's access-control API
pub struct RoleCheck<'a> {
    settings: &'a AuthSettings,
    agent: Agent,
}

impl<'a> RoleCheck<'a> {
    pub fn new(settings: &'a AuthSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();
        Self { settings, agent }
    }

    /// Succeeds only when `user` holds the configured role in the configured
    /// system.
    pub fn verify(&self, user: Option<&str>, token: Option<&str>) -> Result<()> {
        let (Some(user), Some(token)) = (user, token) else {
            return Err(DelinquencyError::MissingCredentials);
        };

        let url = format!("{}/{}", self.settings.url.trim_end_matches('/'), user);
        debug!(%url, "checking user role");

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", format!("Bearer {token}"))
            .call()
            .map_err(|e| DelinquencyError::AuthRequest(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 403 {
            return Err(DelinquencyError::AccessDenied {
                portal: self.settings.portal_url.clone(),
            });
        }
        if !(200..300).contains(&status) {
            return Err(DelinquencyError::AuthRequest(format!("HTTP {status}")));
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| DelinquencyError::AuthRequest(e.to_string()))?;
        let roles: Vec<Value> = serde_json::from_str(&body)?;

        if has_role(&roles, self.settings.role, self.settings.system) {
            info!(user, "role check passed");
            Ok(())
        } else {
            Err(DelinquencyError::RoleMissing(user.to_string()))
        }
    }
}

/// Whether any entry carries `CD_PAPEL == role` and `CD_SISTEMA == system`.
/// The API sends these as numbers or numeric strings.
pub fn has_role(entries: &[Value], role: i64, system: i64) -> bool {
    entries
        .iter()
        .any(|entry| as_int(&entry["CD_PAPEL"]) == Some(role) && as_int(&entry["CD_SISTEMA"]) == Some(system))
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
