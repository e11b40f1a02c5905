use thiserror::Error;

use crate::{
    config::ChannelConfig,
    types::{Brightness, ChannelId},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("channel {0} is not initialized")]
    NotInitialized(ChannelId),
    #[error("channel {channel} driver failure: {reason}")]
    Driver { channel: ChannelId, reason: String },
}

/// Hardware side of a channel: turns a brightness into an output duty cycle.
pub trait Actuator {
    fn initialize(&mut self, channel: &ChannelConfig) -> Result<(), ActuatorError>;

    fn set_duty(&mut self, channel: &ChannelId, brightness: Brightness)
        -> Result<(), ActuatorError>;

    fn shutdown(&mut self, channel: &ChannelId);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCall {
    Initialize(ChannelId),
    SetDuty(ChannelId, Brightness),
    Shutdown(ChannelId),
}

/// Stub that remembers every call; `set_duty` can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub calls: Vec<ActuatorCall>,
    pub fail_set_duty: bool,
}

impl RecordingActuator {
    pub fn failing() -> Self {
        Self {
            calls: Vec::new(),
            fail_set_duty: true,
        }
    }

    pub fn duty_calls(&self) -> Vec<(ChannelId, Brightness)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ActuatorCall::SetDuty(id, brightness) => Some((id.clone(), *brightness)),
                _ => None,
            })
            .collect()
    }
}

impl Actuator for RecordingActuator {
    fn initialize(&mut self, channel: &ChannelConfig) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::Initialize(channel.id.clone()));
        Ok(())
    }

    fn set_duty(
        &mut self,
        channel: &ChannelId,
        brightness: Brightness,
    ) -> Result<(), ActuatorError> {
        self.calls
            .push(ActuatorCall::SetDuty(channel.clone(), brightness));
        if self.fail_set_duty {
            return Err(ActuatorError::Driver {
                channel: channel.clone(),
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn shutdown(&mut self, channel: &ChannelId) {
        self.calls.push(ActuatorCall::Shutdown(channel.clone()));
    }
}
