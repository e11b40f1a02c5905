use std::collections::HashMap;

use panel_common::{Actuator, ActuatorError, Brightness, ChannelConfig, ChannelId};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct PwmChannel {
    pin: u8,
    frequency_hz: u32,
    duty: Brightness,
}

/// Host stand-in for the PWM outputs: tracks each channel's duty cycle and
/// logs what a real driver would have written.
#[derive(Debug, Default)]
pub struct SimulatedPwm {
    channels: HashMap<ChannelId, PwmChannel>,
}

impl SimulatedPwm {
    pub fn duty(&self, channel: &ChannelId) -> Option<Brightness> {
        self.channels.get(channel).map(|pwm| pwm.duty)
    }
}

impl Actuator for SimulatedPwm {
    fn initialize(&mut self, channel: &ChannelConfig) -> Result<(), ActuatorError> {
        if let Some(existing) = self.channels.values().find(|pwm| pwm.pin == channel.pin) {
            return Err(ActuatorError::Driver {
                channel: channel.id.clone(),
                reason: format!(
                    "GPIO{} already driven at {}Hz",
                    channel.pin, existing.frequency_hz
                ),
            });
        }

        self.channels.insert(
            channel.id.clone(),
            PwmChannel {
                pin: channel.pin,
                frequency_hz: channel.pwm_frequency_hz,
                duty: Brightness::OFF,
            },
        );
        info!(
            "LED {} PWM started on GPIO{} @ {}Hz",
            channel.id, channel.pin, channel.pwm_frequency_hz
        );
        Ok(())
    }

    fn set_duty(
        &mut self,
        channel: &ChannelId,
        brightness: Brightness,
    ) -> Result<(), ActuatorError> {
        let pwm = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| ActuatorError::NotInitialized(channel.clone()))?;
        pwm.duty = brightness;
        debug!("GPIO{} duty cycle -> {}%", pwm.pin, brightness);
        Ok(())
    }

    fn shutdown(&mut self, channel: &ChannelId) {
        if let Some(pwm) = self.channels.remove(channel) {
            info!("LED {channel} PWM stopped on GPIO{}", pwm.pin);
        }
    }
}
