/// System name reported by `/` and `/status`
pub const SYSTEM_NAME: &str = "Nova";

/// Default API schema version when none is configured
pub const DEFAULT_API_SCHEMA_VERSION: &str = "v1";

/// Placeholder for version fields that have not been configured
pub const UNKNOWN: &str = "unknown";

/// High-level domains advertised by the Actions handshake
pub const SUPPORTED_DOMAINS: [&str; 6] = [
    "finance",
    "health",
    "training",
    "protocols",
    "automation",
    "system",
];

/// Connection string environment variables, in lookup order
pub const ENV_NOVA_DATABASE_URL: &str = "NOVA_DATABASE_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Runtime environment (`dev` or `prod`)
pub const ENV_NOVA_ENV: &str = "NOVA_ENV";

/// Log level used when `RUST_LOG` is unset
pub const ENV_NOVA_LOG_LEVEL: &str = "NOVA_LOG_LEVEL";

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Log directory used when `NOVA_ENV=prod`
pub const PROD_LOG_DIR: &str = "/var/log/nova";

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "nova.log";
