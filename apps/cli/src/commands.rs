//! Subcommand implementations.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use esplink_board::{ConnectionManager, Session};
use esplink_http::{ActionDispatcher, ActionResult, HttpClient, Payload};
use esplink_protocol::{Endpoint, ResolvedAddress, is_local_hostname};
use esplink_resolver::{Lookup, Resolver};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Command;
use crate::config::Settings;
use crate::firmata::{self, LED_PIN, PinMode};

const BLINK_PERIOD: Duration = Duration::from_millis(500);
const BLINK_DURATION: Duration = Duration::from_secs(10);
const DISCOVER_HOLD: Duration = Duration::from_secs(2);
const LED_FLUSH: Duration = Duration::from_secs(1);
const PROBE_INTERVAL_MS: u16 = 1000;

pub async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, shutting down");
            watcher.cancel();
        }
    });

    // Resolve once up front; retries of a link-local host refresh it.
    let resolver = Resolver::new();
    let resolved = resolver
        .resolve(&settings.host)
        .await
        .with_context(|| format!("resolving {}", settings.host))?;

    let ctx = Invocation {
        settings,
        resolver,
        resolved,
        cancel,
    };

    match command {
        Command::Discover => ctx.discover().await,
        Command::Blink => ctx.blink().await,
        Command::Led { action } => ctx.led(action.parse()?).await,
        Command::Health => ctx.health().await,
        Command::Run { payload } => ctx.run_payload(&payload).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedAction {
    On,
    Off,
    Toggle,
}

impl FromStr for LedAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "toggle" => Ok(Self::Toggle),
            _ => bail!("Unknown LED action: {s} (expected on, off or toggle)"),
        }
    }
}

/// Reads `arg` as a file when it names one, then checks it parses as JSON.
pub fn load_payload(arg: &str) -> anyhow::Result<serde_json::Value> {
    let path = Path::new(arg);
    let text = if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading payload {}", path.display()))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).context("payload is not valid JSON")
}

/// Where connection attempt `attempt` dials.
///
/// The first attempt uses `first`. Later attempts at a link-local host drop
/// the cached address and look the name up again, since a device that
/// stopped answering may have picked up a new lease. A failed lookup falls
/// back to `first`.
pub async fn attempt_endpoint<L: Lookup>(
    resolver: &Resolver<L>,
    first: &ResolvedAddress,
    port: u16,
    attempt: u32,
) -> Endpoint {
    if attempt > 1 && is_local_hostname(&first.hostname) {
        resolver.invalidate(&first.hostname);
        match resolver.resolve(&first.hostname).await {
            Ok(fresh) => return fresh.endpoint(port),
            Err(e) => warn!(host = %first.hostname, error = %e, "re-resolve failed, keeping last address"),
        }
    }
    first.endpoint(port)
}

/// HTTP actions bounded by the configured `--timeout`.
pub fn dispatcher(settings: &Settings) -> anyhow::Result<ActionDispatcher> {
    let client = HttpClient::new().context("building HTTP client")?;
    Ok(ActionDispatcher::new(client)
        .with_token_query(settings.token_query)
        .with_timeout(settings.connect_timeout))
}

struct Invocation {
    settings: Settings,
    resolver: Resolver,
    resolved: ResolvedAddress,
    cancel: CancellationToken,
}

impl Invocation {
    async fn connect(&self) -> anyhow::Result<Session> {
        let port = self.settings.port;
        println!("Connecting to ESP32 at {}...", self.resolved.endpoint(port));
        let manager = ConnectionManager::new().with_cancel(self.cancel.clone());
        let session = manager
            .connect_with_retry_to(
                |attempt| attempt_endpoint(&self.resolver, &self.resolved, port, attempt),
                self.settings.connect_timeout,
                &self.settings.retry,
            )
            .await?;
        println!("Board connected!");
        Ok(session)
    }

    /// Sleeps unless interrupted first.
    async fn pause(&self, d: Duration) -> anyhow::Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => bail!("interrupted"),
            _ = tokio::time::sleep(d) => Ok(()),
        }
    }

    async fn discover(&self) -> anyhow::Result<()> {
        println!(
            "ESP32 host: {} → {}:{}",
            self.settings.host, self.resolved.address, self.settings.port
        );
        let session = self.connect().await?;
        println!("ESP32 discovered and connected");

        session
            .send(firmata::sampling_interval(PROBE_INTERVAL_MS))
            .await?;
        self.pause(DISCOVER_HOLD).await?;

        session.close().await;
        println!("Connection test complete");
        Ok(())
    }

    async fn blink(&self) -> anyhow::Result<()> {
        let session = self.connect().await?;
        session
            .send(firmata::set_pin_mode(LED_PIN, PinMode::Output))
            .await?;

        println!("Starting blink sequence...");
        let mut lit = false;
        let ticks = (BLINK_DURATION.as_millis() / BLINK_PERIOD.as_millis()) as u32;
        for _ in 0..ticks {
            lit = !lit;
            session.send(firmata::digital_write(LED_PIN, lit)).await?;
            self.pause(BLINK_PERIOD).await?;
        }
        session.send(firmata::digital_write(LED_PIN, false)).await?;

        session.close().await;
        println!("Blink sequence complete");
        Ok(())
    }

    async fn led(&self, action: LedAction) -> anyhow::Result<()> {
        let session = self.connect().await?;
        session
            .send(firmata::set_pin_mode(LED_PIN, PinMode::Output))
            .await?;

        // A fresh session starts with the pin low, so toggle lights it.
        let (level, message) = match action {
            LedAction::On => (true, "LED turned on"),
            LedAction::Off => (false, "LED turned off"),
            LedAction::Toggle => (true, "LED toggled"),
        };
        session.send(firmata::digital_write(LED_PIN, level)).await?;
        println!("{message}");

        self.pause(LED_FLUSH).await?;
        session.close().await;
        Ok(())
    }

    async fn health(&self) -> anyhow::Result<()> {
        let actions = dispatcher(&self.settings)?;
        let result = tokio::select! {
            _ = self.cancel.cancelled() => bail!("interrupted"),
            r = actions.health(&self.resolved) => r?,
        };
        report(&result)
    }

    async fn run_payload(&self, arg: &str) -> anyhow::Result<()> {
        let payload = Payload::Json(load_payload(arg)?);
        let actions = dispatcher(&self.settings)?;
        let result = tokio::select! {
            _ = self.cancel.cancelled() => bail!("interrupted"),
            r = actions.run_action(&self.resolved, &self.settings.token, &payload) => r?,
        };
        report(&result)
    }
}

/// Prints the response verbatim; non-2xx becomes the exit error.
fn report(result: &ActionResult) -> anyhow::Result<()> {
    println!("HTTP {}", result.status);
    println!("{}", result.body);
    if !result.is_success() {
        bail!("device answered HTTP {}", result.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    use esplink_board::RetryPolicy;
    use esplink_resolver::{ResolveError, SystemClock};

    use super::*;

    /// Hands out 192.0.2.1, 192.0.2.2, ... and fails once past `fail_after`.
    struct SequenceLookup {
        calls: Arc<AtomicU32>,
        fail_after: Option<u32>,
    }

    impl Lookup for SequenceLookup {
        async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolveError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_after.is_some_and(|k| n > k) {
                return Err(ResolveError::NoAddress(host.to_string()));
            }
            Ok(Ipv4Addr::new(192, 0, 2, n as u8))
        }
    }

    fn resolver(fail_after: Option<u32>) -> (Resolver<SequenceLookup>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let lookup = SequenceLookup {
            calls: calls.clone(),
            fail_after,
        };
        let resolver =
            Resolver::with_lookup(lookup, Duration::from_secs(300), Arc::new(SystemClock));
        (resolver, calls)
    }

    #[tokio::test]
    async fn retries_re_resolve_local_host() {
        let (resolver, calls) = resolver(None);
        let first = resolver.resolve("esp32.local").await.unwrap();

        let e1 = attempt_endpoint(&resolver, &first, 3030, 1).await;
        assert_eq!(e1, Endpoint::new("192.0.2.1", 3030));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let e2 = attempt_endpoint(&resolver, &first, 3030, 2).await;
        assert_eq!(e2, Endpoint::new("192.0.2.2", 3030));
        let e3 = attempt_endpoint(&resolver, &first, 3030, 3).await;
        assert_eq!(e3, Endpoint::new("192.0.2.3", 3030));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolver.cached_len(), 1);
    }

    #[tokio::test]
    async fn literal_host_is_never_re_resolved() {
        let (resolver, calls) = resolver(None);
        let first = resolver.resolve("192.0.2.9").await.unwrap();

        let e = attempt_endpoint(&resolver, &first, 4000, 2).await;
        assert_eq!(e, Endpoint::new("192.0.2.9", 4000));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_re_resolve_keeps_first_address() {
        let (resolver, calls) = resolver(Some(1));
        let first = resolver.resolve("esp32.local").await.unwrap();

        let e = attempt_endpoint(&resolver, &first, 3030, 2).await;
        assert_eq!(e, Endpoint::new("192.0.2.1", 3030));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatcher_uses_configured_timeout() {
        let settings = Settings {
            host: "192.0.2.5".into(),
            port: 3030,
            connect_timeout: Duration::from_millis(1500),
            token: String::new(),
            token_query: true,
            retry: RetryPolicy::default(),
        };
        let target = ResolvedAddress::passthrough("192.0.2.5", Instant::now());

        let d = dispatcher(&settings).unwrap();
        assert_eq!(d.build_health(&target).timeout, Some(Duration::from_millis(1500)));
        let run = d.build_run(&target, "t", &Payload::from("{}")).unwrap();
        assert_eq!(run.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(run.url, "http://192.0.2.5/run?token=t");
    }

    #[test]
    fn led_action_parsing() {
        assert_eq!("on".parse::<LedAction>().unwrap(), LedAction::On);
        assert_eq!("OFF".parse::<LedAction>().unwrap(), LedAction::Off);
        assert_eq!("Toggle".parse::<LedAction>().unwrap(), LedAction::Toggle);

        let err = "blink".parse::<LedAction>().unwrap_err();
        assert!(err.to_string().contains("Unknown LED action: blink"));
    }

    #[test]
    fn payload_inline_json() {
        let v = load_payload(r#"{"job":"blink"}"#).unwrap();
        assert_eq!(v["job"], "blink");
    }

    #[test]
    fn payload_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("job.json");
        std::fs::write(&path, r#"{"job":"scan","pins":[2,4]}"#).unwrap();

        let v = load_payload(path.to_str().unwrap()).unwrap();
        assert_eq!(v["job"], "scan");
        assert_eq!(v["pins"][1], 4);
    }

    #[test]
    fn payload_rejects_invalid_json() {
        let err = load_payload("{job: blink").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_payload(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn report_fails_on_error_status() {
        let ok = ActionResult {
            status: 200,
            body: "ok".into(),
        };
        assert!(report(&ok).is_ok());

        let bad = ActionResult {
            status: 503,
            body: "busy".into(),
        };
        assert!(report(&bad).unwrap_err().to_string().contains("503"));
    }
}
