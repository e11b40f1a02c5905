use std::num::IntErrorKind;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    actuator::Actuator,
    render::{renderer_for, PageRenderer},
    request::ParsedRequest,
    response::Response,
    state::ChannelState,
    types::{Brightness, ChannelId, ResponseMode},
};

pub const CHANNEL_KEY: &str = "led";
pub const BRIGHTNESS_KEY: &str = "brightness";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing `led` parameter")]
    MissingChannel,
    #[error("unknown channel `{0}`")]
    UnknownChannel(String),
    #[error("missing `brightness` parameter")]
    MissingBrightness,
    #[error("brightness `{0}` is not an integer")]
    InvalidBrightness(String),
}

/// Maps one parsed request onto the channel store and picks the reply.
pub struct RequestHandler {
    mode: ResponseMode,
    renderer: Box<dyn PageRenderer + Send + Sync>,
}

impl RequestHandler {
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            renderer: renderer_for(mode),
        }
    }

    pub fn with_renderer(
        mode: ResponseMode,
        renderer: Box<dyn PageRenderer + Send + Sync>,
    ) -> Self {
        Self { mode, renderer }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn handle(
        &self,
        request: &ParsedRequest,
        state: &mut ChannelState,
        actuator: &mut dyn Actuator,
    ) -> Response {
        match request {
            ParsedRequest::Get => self.render(state, None),
            ParsedRequest::Post(_) => {
                let applied = match validate_update(request, state) {
                    Ok((channel, brightness)) => {
                        apply_update(state, actuator, &channel, brightness);
                        Some(channel)
                    }
                    Err(err) => {
                        debug!("skipping update: {err}");
                        None
                    }
                };

                match self.mode {
                    ResponseMode::FullPage => self.render(state, applied.as_ref()),
                    ResponseMode::NoContent => Response::NoContent,
                }
            }
        }
    }

    fn render(&self, state: &ChannelState, selected: Option<&ChannelId>) -> Response {
        let fallback = ChannelId::new("");
        let selected = selected
            .or_else(|| state.first_channel())
            .unwrap_or(&fallback);
        Response::Page(self.renderer.render_page(state, selected))
    }
}

/// Pulls a known channel and a clamped brightness out of a POST.
///
/// Unknown or absent `led` values are rejected rather than defaulted.
pub fn validate_update(
    request: &ParsedRequest,
    state: &ChannelState,
) -> Result<(ChannelId, Brightness), ValidationError> {
    let raw_channel = request
        .param(CHANNEL_KEY)
        .ok_or(ValidationError::MissingChannel)?;
    let channel = ChannelId::new(raw_channel);
    if !state.contains(&channel) {
        return Err(ValidationError::UnknownChannel(raw_channel.to_string()));
    }

    let raw_brightness = request
        .param(BRIGHTNESS_KEY)
        .ok_or(ValidationError::MissingBrightness)?;
    let value = parse_integer(raw_brightness)
        .ok_or_else(|| ValidationError::InvalidBrightness(raw_brightness.to_string()))?;

    Ok((channel, Brightness::clamped(value)))
}

fn apply_update(
    state: &mut ChannelState,
    actuator: &mut dyn Actuator,
    channel: &ChannelId,
    brightness: Brightness,
) {
    state.set(channel, brightness);
    match actuator.set_duty(channel, brightness) {
        Ok(()) => info!("LED {channel} set to {brightness}% brightness"),
        Err(err) => warn!("failed to drive LED {channel}: {err}"),
    }
}

/// Decimal integer with optional sign. Out-of-range magnitudes saturate so
/// that the later clamp still lands on 0 or 100.
fn parse_integer(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(value) => Some(value),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}
