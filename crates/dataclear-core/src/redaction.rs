use serde::{Deserialize, Serialize};

const SENSITIVE_PARAMS: &[&str] = &["password", "pass", "passfile", "token", "sslpassword"];

/// Connection metadata with secrets redacted, safe to log and persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Redact the password and sensitive query parameters of a connection URL.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let mut result = RedactedConnection {
        engine: None,
        user: None,
        host: None,
        port: None,
        database: None,
        redacted: String::new(),
    };

    let (head, query) = match conn.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (conn, None),
    };

    let Some((scheme, rest)) = head.split_once("://") else {
        result.redacted = redact_query(head, query);
        return result;
    };
    result.engine = Some(scheme.to_string());

    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (credentials, host_port) = match authority.rsplit_once('@') {
        Some((credentials, host_port)) => (Some(credentials), host_port),
        None => (None, authority),
    };

    let mut rebuilt = format!("{scheme}://");
    if let Some(credentials) = credentials {
        match credentials.split_once(':') {
            Some((user, _)) => {
                result.user = Some(user.to_string());
                rebuilt.push_str(&format!("{user}:***@"));
            }
            None => {
                result.user = Some(credentials.to_string());
                rebuilt.push_str(&format!("{credentials}@"));
            }
        }
    }
    rebuilt.push_str(host_port);
    if !path.is_empty() || rest.contains('/') {
        rebuilt.push('/');
        rebuilt.push_str(path);
    }

    if !host_port.is_empty() {
        match host_port.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => {
                result.host = Some(host.to_string());
                result.port = port.parse().ok();
            }
            _ => result.host = Some(host_port.to_string()),
        }
    }
    if !path.is_empty() {
        result.database = Some(path.to_string());
    }

    result.redacted = redact_query(&rebuilt, query);
    result
}

fn redact_query(base: &str, query: Option<&str>) -> String {
    let Some(query) = query else {
        return base.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect();

    format!("{base}?{}", params.join("&"))
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_PARAMS.contains(&key.as_str())
}
