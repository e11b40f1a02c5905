pub mod actuator;
pub mod config;
pub mod form;
pub mod handler;
pub mod render;
pub mod request;
pub mod response;
pub mod state;
pub mod types;

pub use actuator::{Actuator, ActuatorCall, ActuatorError, RecordingActuator};
pub use config::{ChannelConfig, PanelConfig, ServerConfig};
pub use form::{decode_form, decode_form_or_empty, FormDecodeError, FormParams};
pub use handler::{validate_update, RequestHandler, ValidationError};
pub use render::{renderer_for, FormPage, LivePage, PageRenderer};
pub use request::{parse_request, parse_request_text, ParsedRequest};
pub use response::Response;
pub use state::ChannelState;
pub use types::{Brightness, ChannelId, ResponseMode};
