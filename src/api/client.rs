//! Discord REST client: credential check, guild enumeration, guild leave.
//!
//! Every operation takes the account's token, parsed proxy, and user-agent
//! explicitly; the client itself holds only the base URL and the retry
//! policy. Failure handling is local: operations log what happened and
//! return a value the pipeline can act on, nothing propagates as an error.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::api::retry::RetryPolicy;
use crate::catalog::LeaveTarget;
use crate::error::LeaveError;
use crate::proxy::{log_route, ProxySpec};

/// Discord REST API base path.
pub const DISCORD_API: &str = "https://discord.com/api/v9";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// One guild membership as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

/// REST client for the guild operations of one run.
#[derive(Debug, Clone)]
pub struct GuildClient {
    base_url: String,
    policy: RetryPolicy,
}

impl GuildClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_base_url(DISCORD_API, policy)
    }

    /// Client against an alternate base URL. Tests point this at a local
    /// mock server.
    pub fn with_base_url(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            base_url: base_url.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Single authenticated "who am I" request. 200 means the token is
    /// valid; 401, any other status, and any transport error mean invalid.
    /// Never retried.
    pub async fn check_credentials(
        &self,
        token: &str,
        proxy: &ProxySpec,
        user_agent: &str,
        identifier: &str,
    ) -> bool {
        let client = match self.http_client(proxy) {
            Ok(client) => client,
            Err(e) => {
                error!("{identifier}: Error checking token: {e}");
                return false;
            }
        };
        log_route(proxy, identifier);

        let request = client
            .get(format!("{}/users/@me", self.base_url))
            .header(AUTHORIZATION, token)
            .header(USER_AGENT, effective_user_agent(user_agent));

        match request.send().await {
            Ok(resp) if resp.status() == StatusCode::OK => {
                info!("{identifier}: Token is VALID");
                true
            }
            Ok(resp) if resp.status() == StatusCode::UNAUTHORIZED => {
                error!("{identifier}: Token is INVALID (401 Unauthorized)");
                false
            }
            Ok(resp) => {
                error!("{identifier}: Token check error. Status: {}", resp.status());
                false
            }
            Err(e) => {
                error!("{identifier}: Error checking token: {e}");
                false
            }
        }
    }

    /// Enumerate the account's guild memberships. Returns an empty list on
    /// any terminal failure; 429 waits out the server-supplied delay, 500
    /// and 503 back off with jitter, network errors back off until the
    /// attempt cap.
    pub async fn fetch_guilds(
        &self,
        token: &str,
        proxy: &ProxySpec,
        user_agent: &str,
        identifier: &str,
    ) -> Vec<Guild> {
        let client = match self.http_client(proxy) {
            Ok(client) => client,
            Err(e) => {
                error!("{identifier}: Unknown error getting guilds: {e}");
                return Vec::new();
            }
        };
        log_route(proxy, identifier);

        for attempt in 1..=self.policy.attempts {
            info!("{identifier}: Getting guilds... (attempt #{attempt})");
            let request = client
                .get(format!("{}/users/@me/guilds", self.base_url))
                .header(AUTHORIZATION, token)
                .header(USER_AGENT, effective_user_agent(user_agent));

            match request.send().await {
                Ok(resp) => match resp.status() {
                    StatusCode::OK => match resp.json::<Vec<Guild>>().await {
                        Ok(guilds) => {
                            info!("{identifier}: Received {} guilds", guilds.len());
                            return guilds;
                        }
                        Err(e) => {
                            error!("{identifier}: JSON parsing error: {e}");
                            return Vec::new();
                        }
                    },
                    StatusCode::UNAUTHORIZED => {
                        error!("{identifier}: Invalid token (401 Unauthorized)");
                        return Vec::new();
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        self.wait_rate_limit(&resp, identifier, attempt).await;
                    }
                    StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
                        warn!(
                            "{identifier}: Discord server error ({}). Retry #{attempt}",
                            resp.status().as_u16()
                        );
                        self.policy.backoff_server_error().await;
                    }
                    status => {
                        error!("{identifier}: Failed to get guilds. Status: {}", status.as_u16());
                        return Vec::new();
                    }
                },
                Err(e) if e.is_timeout() || e.is_connect() => {
                    error!("{identifier}: Network error getting guilds: {e}. Attempt #{attempt}");
                    if attempt == self.policy.attempts {
                        return Vec::new();
                    }
                    self.policy.backoff_network().await;
                }
                Err(e) => {
                    error!("{identifier}: Unknown error getting guilds: {e}");
                    return Vec::new();
                }
            }
        }

        error!(
            "{identifier}: Failed to get guilds after {} attempts",
            self.policy.attempts
        );
        Vec::new()
    }

    /// Remove the account from one guild. A pacing delay is slept before
    /// every attempt, including the first. 404 counts as success so the
    /// operation can be re-run safely; 401 and 403 are terminal.
    pub async fn leave_guild(
        &self,
        token: &str,
        target: &LeaveTarget,
        proxy: &ProxySpec,
        user_agent: &str,
        identifier: &str,
    ) -> (bool, Option<LeaveError>) {
        let client = match self.http_client(proxy) {
            Ok(client) => client,
            Err(e) => {
                error!("{identifier}: Unknown error leaving guild: {e}");
                return (false, Some(LeaveError::Unexpected(e.to_string())));
            }
        };
        log_route(proxy, identifier);

        let url = format!("{}/users/@me/guilds/{}", self.base_url, target.id);
        for attempt in 1..=self.policy.attempts {
            self.policy.pace().await;
            let request = client
                .delete(&url)
                .header(AUTHORIZATION, token)
                .header(USER_AGENT, effective_user_agent(user_agent));

            match request.send().await {
                Ok(resp) => match resp.status() {
                    StatusCode::NO_CONTENT => {
                        info!(
                            "{identifier}: Left guild '{}' (ID: {})",
                            target.name, target.id
                        );
                        return (true, None);
                    }
                    StatusCode::UNAUTHORIZED => {
                        error!("{identifier}: Invalid token (401 Unauthorized)");
                        return (false, Some(LeaveError::Unauthorized));
                    }
                    StatusCode::FORBIDDEN => {
                        error!(
                            "{identifier}: No permission to leave guild '{}' (403 Forbidden)",
                            target.name
                        );
                        return (false, Some(LeaveError::Forbidden));
                    }
                    StatusCode::NOT_FOUND => {
                        warn!(
                            "{identifier}: Guild '{}' not found (404). Already left?",
                            target.name
                        );
                        return (true, None);
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        self.wait_rate_limit(&resp, identifier, attempt).await;
                    }
                    status => {
                        error!(
                            "{identifier}: Failed to leave guild. Status: {}",
                            status.as_u16()
                        );
                        if attempt == self.policy.attempts {
                            return (false, Some(LeaveError::Status(status.as_u16())));
                        }
                        self.policy.backoff_network().await;
                    }
                },
                Err(e) if e.is_timeout() => {
                    error!("{identifier}: Request timeout: {e}. Attempt #{attempt}");
                    if attempt == self.policy.attempts {
                        return (false, Some(LeaveError::Timeout(e.to_string())));
                    }
                    self.policy.backoff_network().await;
                }
                Err(e) if e.is_connect() => {
                    error!("{identifier}: Unknown error leaving guild: {e}");
                    return (false, Some(LeaveError::Unexpected(e.to_string())));
                }
                Err(e) => {
                    error!("{identifier}: Server response error: {e}. Attempt #{attempt}");
                    if attempt == self.policy.attempts {
                        return (false, Some(LeaveError::Response(e.to_string())));
                    }
                    self.policy.backoff_network().await;
                }
            }
        }

        error!(
            "{identifier}: Failed to leave guild '{}' after {} attempts",
            target.name, self.policy.attempts
        );
        (false, Some(LeaveError::Exhausted(self.policy.attempts)))
    }

    /// Sleep out a 429, honoring the Retry-After header.
    async fn wait_rate_limit(&self, resp: &Response, identifier: &str, attempt: u32) {
        let header = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        let delay = self.policy.retry_after_seconds(header);
        warn!("{identifier}: Rate limited (429). Waiting {delay} sec before retry #{attempt}");
        sleep(Duration::from_secs_f64(delay)).await;
    }

    fn http_client(&self, proxy: &ProxySpec) -> anyhow::Result<Client> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(url) = proxy.url() {
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        Ok(builder.build()?)
    }
}

fn effective_user_agent(user_agent: &str) -> &str {
    if user_agent.trim().is_empty() {
        DEFAULT_USER_AGENT
    } else {
        user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_falls_back_when_blank() {
        assert_eq!(effective_user_agent(""), "Mozilla/5.0");
        assert_eq!(effective_user_agent("  "), "Mozilla/5.0");
        assert_eq!(effective_user_agent("custom/1.0"), "custom/1.0");
    }

    #[test]
    fn guild_deserializes_from_api_shape() {
        let raw = r#"[{"id":"1002684842196086876","name":"Caldera","icon":null}]"#;
        let guilds: Vec<Guild> = serde_json::from_str(raw).unwrap();
        assert_eq!(guilds.len(), 1);
        assert_eq!(guilds[0].id, "1002684842196086876");
        assert_eq!(guilds[0].name, "Caldera");
    }
}
