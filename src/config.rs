//! Runtime configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default and an environment override:
//! - `HTTP_PORT` — dispatcher HTTP port (default 8081)
//! - `CHAT_PORT` — chat bus WebSocket port (default 8082)
//! - `DISPATCHER_SLA_MS` — synchronous wait deadline for `/api/process`
//! - `ROOM_BUFFER_SIZE` — per-subscriber room fan-out buffer
//! - `SESSION_BUFFER_SIZE` — per-session outbound queue capacity
//! - `SHUTDOWN_GRACE_MS` — how long shutdown waits for in-flight tasks

const DEFAULT_HTTP_PORT: u16 = 8081;
const DEFAULT_CHAT_PORT: u16 = 8082;
const DEFAULT_SLA_MS: u64 = 30_000;
const DEFAULT_ROOM_BUFFER_SIZE: usize = 256;
const DEFAULT_SESSION_BUFFER_SIZE: usize = 64;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 10_000;

/// Service configuration shared by both listeners.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dispatcher HTTP port.
    pub http_port: u16,
    /// Chat bus WebSocket port.
    pub chat_port: u16,
    /// SLA deadline for `/api/process` in milliseconds.
    pub sla_ms: u64,
    /// Bounded capacity of each room's fan-out channel.
    pub room_buffer_size: usize,
    /// Bounded capacity of each session's outbound queue.
    pub session_buffer_size: usize,
    /// Grace period for in-flight processing tasks during shutdown.
    pub shutdown_grace_ms: u64,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            http_port: env_parse("HTTP_PORT", DEFAULT_HTTP_PORT),
            chat_port: env_parse("CHAT_PORT", DEFAULT_CHAT_PORT),
            sla_ms: env_parse("DISPATCHER_SLA_MS", DEFAULT_SLA_MS),
            room_buffer_size: env_parse("ROOM_BUFFER_SIZE", DEFAULT_ROOM_BUFFER_SIZE),
            session_buffer_size: env_parse("SESSION_BUFFER_SIZE", DEFAULT_SESSION_BUFFER_SIZE),
            shutdown_grace_ms: env_parse("SHUTDOWN_GRACE_MS", DEFAULT_SHUTDOWN_GRACE_MS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            chat_port: DEFAULT_CHAT_PORT,
            sla_ms: DEFAULT_SLA_MS,
            room_buffer_size: DEFAULT_ROOM_BUFFER_SIZE,
            session_buffer_size: DEFAULT_SESSION_BUFFER_SIZE,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_ports() {
        let config = Config::default();
        assert_eq!(config.http_port, 8081);
        assert_eq!(config.chat_port, 8082);
        assert_eq!(config.sla_ms, 30_000);
        assert_eq!(config.room_buffer_size, 256);
        assert_eq!(config.session_buffer_size, 64);
    }

    #[test]
    fn env_parse_ignores_garbage() {
        // Unique var name to avoid cross-test env races.
        std::env::set_var("TASKBUS_TEST_GARBAGE_PORT", "not-a-number");
        let value: u16 = env_parse("TASKBUS_TEST_GARBAGE_PORT", 4242);
        assert_eq!(value, 4242);
    }

    #[test]
    fn env_parse_reads_override() {
        std::env::set_var("TASKBUS_TEST_SLA_OVERRIDE", "1500");
        let value: u64 = env_parse("TASKBUS_TEST_SLA_OVERRIDE", 30_000);
        assert_eq!(value, 1500);
    }
}
