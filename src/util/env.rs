//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! `init_env()` runs once; every getter calls it.
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_err() {
            // Fallback to the crate root so `cargo run` from a subdirectory still works.
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Destination (catalogue + product metadata) database URL.
///
/// Order: `CATALOGUE_DATABASE_URL`, `DATABASE_URL`, then a DSN composed from
/// the `DB_*` component variables.
pub fn catalogue_db_url() -> anyhow::Result<String> {
    init_env();
    for k in ["CATALOGUE_DATABASE_URL", "DATABASE_URL"] {
        if let Some(v) = env_opt(k) {
            info!(target = "env", source = k, "catalogue database URL resolved");
            return Ok(v);
        }
    }
    if let Some(dsn) = build_dsn_from_components("DB")? {
        info!(target = "env", "catalogue database URL composed from DB_* variables");
        return Ok(dsn);
    }
    Err(anyhow::anyhow!(
        "no catalogue database configured; set CATALOGUE_DATABASE_URL, DATABASE_URL or DB_HOST/DB_USERNAME"
    ))
}

/// Pricing (ERP) database URL: `ERP_DATABASE_URL`, then `ERP_DB_*` components.
pub fn erp_db_url() -> anyhow::Result<String> {
    init_env();
    if let Some(v) = env_opt("ERP_DATABASE_URL") {
        info!(target = "env", source = "ERP_DATABASE_URL", "erp database URL resolved");
        return Ok(v);
    }
    if let Some(dsn) = build_dsn_from_components("ERP_DB")? {
        info!(target = "env", "erp database URL composed from ERP_DB_* variables");
        return Ok(dsn);
    }
    Err(anyhow::anyhow!(
        "no erp database configured; set ERP_DATABASE_URL or ERP_DB_HOST/ERP_DB_USERNAME"
    ))
}

/// Compose a postgres DSN from `{prefix}_HOST`, `{prefix}_PORT`, `{prefix}_DATABASE`,
/// `{prefix}_USERNAME`, `{prefix}_PASSWORD` and `{prefix}_SSLMODE`.
fn build_dsn_from_components(prefix: &str) -> anyhow::Result<Option<String>> {
    dsn_from_components(prefix, env_opt)
}

/// `Ok(None)` when host or username is unset; an unparseable port is an error.
fn dsn_from_components(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Option<String>> {
    let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}"));
    let (Some(host), Some(user)) = (var("HOST"), var("USERNAME")) else {
        return Ok(None);
    };
    let password = var("PASSWORD");
    let database = var("DATABASE").unwrap_or_else(|| "postgres".into());
    let port = match var("PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("{prefix}_PORT={raw:?}: {e}"))?,
        None => 5432,
    };
    let ssl_mode = var("SSLMODE").unwrap_or_else(|| "prefer".into());
    compose_dsn(&host, port, &database, &user, password.as_deref(), &ssl_mode)
        .map(Some)
        .ok_or_else(|| anyhow::anyhow!("{prefix}_* variables do not form a valid postgres URL"))
}

// Passwords may contain reserved URL characters; build via `url::Url` so they are
// percent-encoded.
fn compose_dsn(
    host: &str,
    port: u16,
    database: &str,
    user: &str,
    password: Option<&str>,
    ssl_mode: &str,
) -> Option<String> {
    let mut out = url::Url::parse("postgresql://localhost").ok()?;
    out.set_username(user).ok()?;
    if let Some(pass) = password {
        out.set_password(Some(pass)).ok()?;
    }

    let host_trimmed = host.trim().trim_matches(|c| c == '[' || c == ']');
    if host_trimmed.contains(':') {
        out.set_host(Some(&format!("[{host_trimmed}]"))).ok()?;
    } else {
        out.set_host(Some(host_trimmed)).ok()?;
    }

    out.set_port(Some(port)).ok()?;
    out.set_path(&format!("/{database}"));
    if ssl_mode != "disable" {
        out.query_pairs_mut().append_pair("sslmode", ssl_mode);
    }
    Some(out.to_string())
}

/// Mask credentials in a value before it reaches a log line.
pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("TOKEN") {
        return "***".to_string();
    }

    let val_trim = val.trim();
    if let Ok(mut u) = url::Url::parse(val_trim) {
        let scheme = u.scheme().to_ascii_lowercase();
        if scheme == "postgres" || scheme == "postgresql" {
            if !u.username().is_empty() {
                let _ = u.set_username("***");
            }
            if u.password().is_some() {
                let _ = u.set_password(Some("***"));
            }
            return u.to_string();
        }
    }
    val_trim.to_string()
}
