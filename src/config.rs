//! Store connection configuration. Resolved once at process start (env
//! overrides over defaults) and injected into whatever store client the
//! deployment uses; nothing in this crate reads the environment after that.

use std::env;

fn env_str(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

fn env_port(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "meli".into(),
            user: "gym".into(),
            password: None,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by GYM_DB_HOST / GYM_DB_PORT / GYM_DB_NAME /
    /// GYM_DB_USER / GYM_DB_PASSWORD.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: env_str("GYM_DB_HOST").unwrap_or(d.host),
            port: env_port("GYM_DB_PORT").unwrap_or(d.port),
            dbname: env_str("GYM_DB_NAME").unwrap_or(d.dbname),
            user: env_str("GYM_DB_USER").unwrap_or(d.user),
            password: env_str("GYM_DB_PASSWORD"),
        }
    }

    /// Key/value connection string for tokio-postgres.
    pub fn conn_string(&self) -> String {
        let mut s = format!(
            "host={} port={} dbname={} user={}",
            self.host, self.port, self.dbname, self.user
        );
        if let Some(pw) = &self.password {
            s.push_str(" password=");
            s.push_str(pw);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_string_omits_missing_password() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.conn_string(), "host=localhost port=5432 dbname=meli user=gym");
    }

    #[test]
    fn conn_string_appends_password() {
        let cfg = StoreConfig { password: Some("s3cr3t".into()), ..StoreConfig::default() };
        assert!(cfg.conn_string().ends_with("password=s3cr3t"));
    }
}
