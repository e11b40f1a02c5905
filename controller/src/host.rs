use std::{io::ErrorKind, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};
use panel_common::{
    parse_request, Actuator, ChannelConfig, ChannelState, PanelConfig, RequestHandler,
    ResponseMode, ServerConfig,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpSocket},
};
use tracing::{debug, info, warn};

use crate::pwm::SimulatedPwm;

/// Only one client may wait while another is being served.
const LISTEN_BACKLOG: u32 = 1;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionOutcome {
    Responded(&'static str),
    ClosedEarly,
    TimedOut,
}

struct ConfigStore {
    config_path: PathBuf,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new();
    let mut config = store.load_config().await.unwrap_or_else(|err| {
        warn!("failed to load panel config from store: {err:#}");
        PanelConfig::default()
    });
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.sanitize();

    let mut state = ChannelState::new(config.channel_ids());
    let handler = RequestHandler::new(config.server.response_mode);

    let listener = bind_listener(&config.server).await?;
    let addr = listener.local_addr()?;

    let mut actuator = SimulatedPwm::default();
    let running = start_outputs(&mut actuator, &config.channels);
    info!(
        "panel listening on http://{addr} ({running}/{} channels driven, {} mode)",
        state.len(),
        handler.mode().as_str()
    );
    if config.server.read_timeout_ms.is_none() {
        debug!("no read deadline configured; a stalled client blocks the accept loop");
    }

    let result = tokio::select! {
        result = serve(&listener, &config.server, &handler, &mut state, &mut actuator) => result,
        signal = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            signal.context("failed to listen for ctrl-c")
        }
    };

    for channel in config.channel_ids() {
        if let Some(duty) = actuator.duty(&channel) {
            debug!("LED {channel} last duty {duty}%");
        }
    }
    stop_outputs(&mut actuator, &config.channels);
    result
}

/// Initializes every configured channel and returns how many came up. A
/// channel that fails stays dark; the panel keeps serving it.
pub(crate) fn start_outputs(actuator: &mut dyn Actuator, channels: &[ChannelConfig]) -> usize {
    let mut running = 0;
    for channel in channels {
        match actuator.initialize(channel) {
            Ok(()) => running += 1,
            Err(err) => warn!(
                "failed to initialize LED {}, running without output: {err}",
                channel.id
            ),
        }
    }
    running
}

pub(crate) fn stop_outputs(actuator: &mut dyn Actuator, channels: &[ChannelConfig]) {
    for channel in channels {
        actuator.shutdown(&channel.id);
    }
}

pub(crate) async fn bind_listener(server: &ServerConfig) -> anyhow::Result<TcpListener> {
    let bind_addr = server.bind_addr();
    let addr: SocketAddr = tokio::net::lookup_host(&bind_addr)
        .await
        .with_context(|| format!("failed to resolve panel bind address {bind_addr}"))?
        .next()
        .ok_or_else(|| anyhow!("panel bind address {bind_addr} resolved to nothing"))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("failed to create panel socket")?;
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind panel server at {addr}"))?;
    socket
        .listen(LISTEN_BACKLOG)
        .with_context(|| format!("failed to listen on {addr}"))
}

async fn serve(
    listener: &TcpListener,
    server: &ServerConfig,
    handler: &RequestHandler,
    state: &mut ChannelState,
    actuator: &mut dyn Actuator,
) -> anyhow::Result<()> {
    loop {
        if let Err(err) = accept_once(listener, server, handler, state, actuator).await {
            warn!("accept failed: {err:#}");
            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
        }
    }
}

/// Accepts one client and serves it to completion. Per-connection failures
/// are logged here; only accept errors surface to the caller.
pub(crate) async fn accept_once(
    listener: &TcpListener,
    server: &ServerConfig,
    handler: &RequestHandler,
    state: &mut ChannelState,
    actuator: &mut dyn Actuator,
) -> anyhow::Result<Option<ConnectionOutcome>> {
    let (mut stream, peer) = listener.accept().await.context("accept")?;

    let outcome = match serve_connection(&mut stream, server, handler, state, actuator).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("connection from {peer} failed: {err:#}");
            return Ok(None);
        }
    };

    match outcome {
        ConnectionOutcome::Responded(status) => debug!("{peer}: {status}"),
        ConnectionOutcome::ClosedEarly => debug!("{peer} closed before sending a request"),
        ConnectionOutcome::TimedOut => warn!("{peer} did not send a request in time"),
    }
    Ok(Some(outcome))
}

pub(crate) async fn serve_connection<S>(
    stream: &mut S,
    server: &ServerConfig,
    handler: &RequestHandler,
    state: &mut ChannelState,
    actuator: &mut dyn Actuator,
) -> anyhow::Result<ConnectionOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; server.read_buffer_bytes];
    let read = match server.read_timeout_ms {
        Some(timeout_ms) => {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), stream.read(&mut buf))
                .await
            {
                Ok(read) => read.context("failed to read request")?,
                Err(_) => return Ok(ConnectionOutcome::TimedOut),
            }
        }
        None => stream.read(&mut buf).await.context("failed to read request")?,
    };

    let Some(request) = parse_request(&buf[..read]) else {
        return Ok(ConnectionOutcome::ClosedEarly);
    };
    debug!("{} request, {read} bytes", request.method());

    let response = handler.handle(&request, state, actuator);
    stream
        .write_all(&response.to_bytes())
        .await
        .context("failed to write response")?;
    stream.flush().await.context("failed to flush response")?;

    Ok(ConnectionOutcome::Responded(response.status_line()))
}

fn apply_env_overrides(config: &mut PanelConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("PANEL_HTTP_HOST") {
        config.server.host = host;
    }

    if let Some(raw) = lookup("PANEL_HTTP_PORT") {
        match raw.parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(err) => warn!("ignoring PANEL_HTTP_PORT `{raw}`: {err}"),
        }
    }

    if let Some(raw) = lookup("PANEL_RESPONSE_MODE") {
        match raw.parse::<ResponseMode>() {
            Ok(mode) => config.server.response_mode = mode,
            Err(err) => warn!("ignoring PANEL_RESPONSE_MODE: {err}"),
        }
    }
}

impl ConfigStore {
    fn new() -> Self {
        let config_path = std::env::var("PANEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.panel/config.json"));

        Self { config_path }
    }

    async fn load_config(&self) -> anyhow::Result<PanelConfig> {
        match tokio::fs::read(&self.config_path).await {
            Ok(raw) => serde_json::from_slice::<PanelConfig>(&raw)
                .with_context(|| format!("invalid config at {}", self.config_path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(PanelConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use panel_common::{ActuatorCall, Brightness, ChannelId, RecordingActuator};
    use tokio::{net::TcpStream, task::JoinHandle};

    use super::*;

    fn loopback(mode: ResponseMode) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            response_mode: mode,
            ..ServerConfig::default()
        }
    }

    fn three_channels() -> ChannelState {
        ChannelState::new(["1", "2", "3"].map(ChannelId::from))
    }

    fn send(addr: SocketAddr, request: &'static str) -> JoinHandle<String> {
        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            if request.is_empty() {
                stream.shutdown().await.unwrap();
            } else {
                stream.write_all(request.as_bytes()).await.unwrap();
            }
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            String::from_utf8(response).unwrap()
        })
    }

    async fn exchange(
        listener: &TcpListener,
        server: &ServerConfig,
        handler: &RequestHandler,
        state: &mut ChannelState,
        actuator: &mut RecordingActuator,
        request: &'static str,
    ) -> (Option<ConnectionOutcome>, String) {
        let client = send(listener.local_addr().unwrap(), request);
        let outcome = accept_once(listener, server, handler, state, actuator)
            .await
            .unwrap();
        (outcome, client.await.unwrap())
    }

    #[tokio::test]
    async fn sequential_posts_are_visible_to_later_get() {
        let server = loopback(ResponseMode::FullPage);
        let listener = bind_listener(&server).await.unwrap();
        let handler = RequestHandler::new(server.response_mode);
        let mut state = three_channels();
        let mut actuator = RecordingActuator::default();

        for request in [
            "POST / HTTP/1.1\r\nHost: panel\r\n\r\nled=1&brightness=20",
            "POST / HTTP/1.1\r\nHost: panel\r\n\r\nled=2&brightness=80",
        ] {
            let (outcome, response) = exchange(
                &listener,
                &server,
                &handler,
                &mut state,
                &mut actuator,
                request,
            )
            .await;
            assert_eq!(outcome, Some(ConnectionOutcome::Responded("HTTP/1.1 200 OK")));
            assert!(response.starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n"));
        }

        let (_, page) = exchange(
            &listener,
            &server,
            &handler,
            &mut state,
            &mut actuator,
            "GET / HTTP/1.1\r\nHost: panel\r\n\r\n",
        )
        .await;

        assert!(page.contains("LED 1 (20%)"));
        assert!(page.contains("LED 2 (80%)"));
        assert!(page.contains("LED 3 (0%)"));
        assert_eq!(state.get(&ChannelId::from("2")), Some(Brightness::clamped(80)));
    }

    #[tokio::test]
    async fn no_content_mode_acknowledges_post_without_body() {
        let server = loopback(ResponseMode::NoContent);
        let listener = bind_listener(&server).await.unwrap();
        let handler = RequestHandler::new(server.response_mode);
        let mut state = three_channels();
        let mut actuator = RecordingActuator::default();

        let (outcome, response) = exchange(
            &listener,
            &server,
            &handler,
            &mut state,
            &mut actuator,
            "POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nled=3&brightness=150",
        )
        .await;

        assert_eq!(outcome, Some(ConnectionOutcome::Responded("HTTP/1.1 204 No Content")));
        assert_eq!(response, "HTTP/1.1 204 No Content\r\n\r\n");
        assert_eq!(state.get(&ChannelId::from("3")), Some(Brightness::FULL));
        assert_eq!(
            actuator.duty_calls(),
            vec![(ChannelId::from("3"), Brightness::FULL)]
        );
    }

    #[tokio::test]
    async fn empty_read_gets_no_response() {
        let server = loopback(ResponseMode::FullPage);
        let listener = bind_listener(&server).await.unwrap();
        let handler = RequestHandler::new(server.response_mode);
        let mut state = three_channels();
        let mut actuator = RecordingActuator::default();

        let (outcome, response) = exchange(
            &listener,
            &server,
            &handler,
            &mut state,
            &mut actuator,
            "",
        )
        .await;

        assert_eq!(outcome, Some(ConnectionOutcome::ClosedEarly));
        assert!(response.is_empty());
        assert!(actuator.calls.is_empty());
    }

    #[tokio::test]
    async fn read_deadline_drops_silent_client() {
        let server = ServerConfig {
            read_timeout_ms: Some(50),
            ..loopback(ResponseMode::FullPage)
        };
        let listener = bind_listener(&server).await.unwrap();
        let handler = RequestHandler::new(server.response_mode);
        let mut state = three_channels();
        let mut actuator = RecordingActuator::default();

        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            response
        });

        let outcome = accept_once(&listener, &server, &handler, &mut state, &mut actuator)
            .await
            .unwrap();

        assert_eq!(outcome, Some(ConnectionOutcome::TimedOut));
        assert!(client.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_form_still_answers_with_current_state() {
        let server = loopback(ResponseMode::FullPage);
        let listener = bind_listener(&server).await.unwrap();
        let handler = RequestHandler::new(server.response_mode);
        let mut state = three_channels();
        let mut actuator = RecordingActuator::default();

        let (_, response) = exchange(
            &listener,
            &server,
            &handler,
            &mut state,
            &mut actuator,
            "POST / HTTP/1.1\r\n\r\nledbrightness",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("LED 1 (0%)"));
        assert_eq!(state, three_channels());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken = first.local_addr().unwrap();
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: taken.port(),
            ..ServerConfig::default()
        };

        let err = bind_listener(&server).await.unwrap_err();

        assert!(format!("{err:#}").contains("failed to bind panel server"));
    }

    #[test]
    fn outputs_start_and_stop_once_per_channel() {
        let config = PanelConfig::default();
        let mut actuator = RecordingActuator::default();

        assert_eq!(start_outputs(&mut actuator, &config.channels), 3);
        stop_outputs(&mut actuator, &config.channels);

        let ids = ["1", "2", "3"].map(ChannelId::from);
        let expected: Vec<ActuatorCall> = ids
            .iter()
            .cloned()
            .map(ActuatorCall::Initialize)
            .chain(ids.iter().cloned().map(ActuatorCall::Shutdown))
            .collect();
        assert_eq!(actuator.calls, expected);
    }

    #[test]
    fn failed_channel_init_leaves_the_rest_running() {
        let channels = vec![
            ChannelConfig::new("1", 2),
            ChannelConfig::new("2", 2),
            ChannelConfig::new("3", 4),
        ];
        let mut pwm = SimulatedPwm::default();

        assert_eq!(start_outputs(&mut pwm, &channels), 2);
        assert_eq!(pwm.duty(&ChannelId::from("2")), None);

        stop_outputs(&mut pwm, &channels);
        assert_eq!(pwm.duty(&ChannelId::from("1")), None);
        assert_eq!(pwm.duty(&ChannelId::from("3")), None);
    }

    #[tokio::test]
    async fn config_store_falls_back_only_when_file_is_missing() {
        let dir = std::env::temp_dir().join(format!("panel-config-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let missing = ConfigStore {
            config_path: dir.join("missing.json"),
        };
        assert_eq!(missing.load_config().await.unwrap(), PanelConfig::default());

        let valid = ConfigStore {
            config_path: dir.join("valid.json"),
        };
        tokio::fs::write(
            &valid.config_path,
            r#"{"channels":[{"id":"red","pin":17},{"id":"green","pin":27}]}"#,
        )
        .await
        .unwrap();
        let config = valid.load_config().await.unwrap();
        assert_eq!(
            config.channel_ids(),
            vec![ChannelId::from("red"), ChannelId::from("green")]
        );
        assert_eq!(config.channels[1].pwm_frequency_hz, 1_000);

        let broken = ConfigStore {
            config_path: dir.join("broken.json"),
        };
        tokio::fs::write(&broken.config_path, b"{not json").await.unwrap();
        assert!(broken.load_config().await.is_err());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn env_overrides_replace_server_settings() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PANEL_HTTP_HOST", "127.0.0.1"),
            ("PANEL_HTTP_PORT", "9000"),
            ("PANEL_RESPONSE_MODE", "no-content"),
        ]);
        let mut config = PanelConfig::default();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.server.response_mode, ResponseMode::NoContent);
    }

    #[test]
    fn bad_env_values_keep_defaults() {
        let mut config = PanelConfig::default();

        apply_env_overrides(&mut config, |key| match key {
            "PANEL_HTTP_PORT" => Some("eighty".to_string()),
            "PANEL_RESPONSE_MODE" => Some("sometimes".to_string()),
            _ => None,
        });

        assert_eq!(config.server, ServerConfig::default());
    }
}
