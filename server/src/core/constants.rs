// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "sda";

// =============================================================================
// Configuration
// =============================================================================

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SDA_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SDA_LOG";

// =============================================================================
// Environment Variables - API
// =============================================================================

pub const ENV_API_HOST: &str = "API_HOST";
pub const ENV_API_PORT: &str = "API_PORT";
pub const ENV_API_ADMINS: &str = "API_ADMINS";
pub const ENV_API_JWT_PUBKEY_PATH: &str = "API_JWT_PUBKEY_PATH";
pub const ENV_API_JWT_SECRET: &str = "API_JWT_SECRET";

// =============================================================================
// Environment Variables - Broker
// =============================================================================

pub const ENV_BROKER_HOST: &str = "BROKER_HOST";
pub const ENV_BROKER_PORT: &str = "BROKER_PORT";
pub const ENV_BROKER_USER: &str = "BROKER_USER";
pub const ENV_BROKER_PASSWORD: &str = "BROKER_PASSWORD";
pub const ENV_BROKER_VHOST: &str = "BROKER_VHOST";
pub const ENV_BROKER_EXCHANGE: &str = "BROKER_EXCHANGE";
pub const ENV_BROKER_PREFETCH: &str = "BROKER_PREFETCH";
pub const ENV_BROKER_SCHEMAS_PATH: &str = "BROKER_SCHEMAS_PATH";

// =============================================================================
// Environment Variables - Database
// =============================================================================

pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_DATABASE: &str = "DB_DATABASE";
pub const ENV_DB_SSLMODE: &str = "DB_SSLMODE";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default API bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// Broker Defaults
// =============================================================================

/// Default AMQP port
pub const DEFAULT_BROKER_PORT: u16 = 5672;

/// Per-consumer unacknowledged delivery limit
pub const DEFAULT_PREFETCH_COUNT: u16 = 2;

/// Default schemas directory (single-site profile)
pub const DEFAULT_SCHEMAS_PATH: &str = "schemas/isolated";

// Routing keys on the configured exchange. Queues are declared by the
// broker's own definitions, never by this process.
pub const ROUTING_KEY_INGEST: &str = "ingest";
pub const ROUTING_KEY_ACCESSION: &str = "accession";
pub const ROUTING_KEY_MAPPINGS: &str = "mappings";
pub const ROUTING_KEY_COMPLETED: &str = "completed";

// =============================================================================
// Database Defaults
// =============================================================================

pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DB_DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DB_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Ping timeout used by readiness checks and reconnect probes
pub const DB_PING_TIMEOUT_SECS: u64 = 1;

// =============================================================================
// Retry / Shutdown
// =============================================================================

/// Attempts for mutating store operations (delays of 2, 4, 8, 16, 32 seconds)
pub const RETRY_TIMES: u32 = 5;

/// Base delay for the exponential backoff schedule
pub const RETRY_BASE_DELAY_SECS: u64 = 1;

/// Pause before a transient worker failure is returned to the queue.
/// Bounded well below the five minute ceiling the pipeline tolerates.
pub const WORKER_REQUEUE_PAUSE_SECS: u64 = 30;

/// How long shutdown waits for in-flight consumer tasks to drain
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
