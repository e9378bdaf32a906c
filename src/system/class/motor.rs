//! Tacho motors, motors with a quadrature encoder.
//!
//! See the [tacho-motor class docs][1] for details
//!
//! [1]: https://docs.ev3dev.org/projects/lego-linux-drivers/en/ev3dev-stretch/motors.html#tacho-motor-subsystem
use std::{
    convert::TryFrom,
    fmt,
    fs::File,
    io,
    ops,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use bitflags::bitflags;
use log::warn;

use super::Device;
use crate::{
    error::{text::BAD_INT, DeviceError},
    util::{
        attr_name,
        open_attr_read,
        open_attr_write,
        read_attr_int,
        read_attr_words,
        read_file_int,
        write_attr,
        write_attr_int,
        Result,
    },
};

/// A position value from a tacho motor, in tacho counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TachoPosition(pub i32);

/// A difference between two [`TachoPosition`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TachoDelta(pub i32);

/// Speed of a tacho motor, in tacho counts per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TachoSpeed(pub i32);

impl ops::Add<TachoDelta> for TachoPosition {
    type Output = TachoPosition;

    fn add(self, rhs: TachoDelta) -> TachoPosition {
        TachoPosition(self.0.wrapping_add(rhs.0))
    }
}

impl ops::Sub for TachoPosition {
    type Output = TachoDelta;

    fn sub(self, rhs: TachoPosition) -> TachoDelta {
        TachoDelta(self.0.wrapping_sub(rhs.0))
    }
}

impl ops::Mul<Duration> for TachoSpeed {
    type Output = TachoDelta;

    /// Distance travelled in `rhs` at this speed, truncated.
    fn mul(self, rhs: Duration) -> TachoDelta {
        TachoDelta((f64::from(self.0) * rhs.as_secs_f64()) as i32)
    }
}

/// What a motor does when it stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopAction {
    /// Remove power from the motor.
    Coast,

    /// Remove power from the motor and create a passive load.
    Brake,

    /// Actively try to hold position.
    Hold,
}

impl StopAction {
    /// Name used by the kernel
    pub fn as_str(self) -> &'static str {
        match self {
            StopAction::Coast => "coast",
            StopAction::Brake => "brake",
            StopAction::Hold => "hold",
        }
    }

    fn flag(self) -> StopActions {
        match self {
            StopAction::Coast => StopActions::COAST,
            StopAction::Brake => StopActions::BRAKE,
            StopAction::Hold => StopActions::HOLD,
        }
    }
}

impl Default for StopAction {
    fn default() -> Self {
        StopAction::Coast
    }
}

impl fmt::Display for StopAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StopAction {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "coast" => Ok(StopAction::Coast),
            "brake" => Ok(StopAction::Brake),
            "hold" => Ok(StopAction::Hold),
            _ => Err(DeviceError::InvalidArgument(format!(
                "unknown stop action `{}`",
                s
            ))),
        }
    }
}

bitflags! {
    /// Set of [`StopAction`]s, corresponding to the `stop_actions`
    /// attribute.
    pub struct StopActions: u8 {
        /// [`StopAction::Coast`]
        const COAST = 1;

        /// [`StopAction::Brake`]
        const BRAKE = 2;

        /// [`StopAction::Hold`]
        const HOLD = 4;
    }
}

impl StopActions {
    /// Whether `action` is in the set
    pub fn supports(self, action: StopAction) -> bool {
        self.contains(action.flag())
    }
}

/// Optional parameters for motor commands
#[derive(Debug, Clone, Copy, Default)]
pub struct TachoMotorParams {
    /// Speed of the motor. If zero, the speed from the last command is kept.
    pub speed: TachoSpeed,

    /// What to do once the motor stops.
    pub stop_action: StopAction,
}

/// A motor with a quadrature encoder
///
/// Dropping a [`TachoMotor`] stops it and resets all of its options. Use
/// [`TachoMotor::close`] to find out whether that worked.
#[derive(Debug)]
pub struct TachoMotor {
    path: PathBuf,

    command: File,
    position: File,
    position_sp: File,
    speed: File,
    speed_sp: File,
    stop_action: File,
    time_sp: File,

    count_per_rot: TachoDelta,
    max_speed: TachoSpeed,
    stop_actions: StopActions,

    closed: bool,
}

// Public
impl TachoMotor {
    /// Stop the motor and reset all options.
    pub fn reset(&self) -> Result<()> {
        self.command("reset").map_err(DeviceError::motor("reset"))
    }

    /// Stop the motor and reset all options, reporting any error.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.reset()
    }

    /// Run at `speed` until another command is given.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::InvalidArgument`] if `speed` is beyond
    ///   [`TachoMotor::max_speed`] in either direction.
    pub fn run(&self, speed: TachoSpeed) -> Result<()> {
        self.set_speed(speed)
            .and_then(|_| self.command("run-forever"))
            .map_err(DeviceError::motor("run"))
    }

    /// Run to the absolute position `pos`, then stop.
    pub fn run_to_position(
        &self,
        pos: TachoPosition,
        params: Option<&TachoMotorParams>,
    ) -> Result<()> {
        self.set_position(pos.0)
            .and_then(|_| self.set_params(params))
            .and_then(|_| self.command("run-to-abs-pos"))
            .map_err(DeviceError::motor("run to position"))
    }

    /// Run by `delta` relative to the current position, then stop.
    pub fn run_to_delta(&self, delta: TachoDelta, params: Option<&TachoMotorParams>) -> Result<()> {
        self.set_position(delta.0)
            .and_then(|_| self.set_params(params))
            .and_then(|_| self.command("run-to-rel-pos"))
            .map_err(DeviceError::motor("run to delta"))
    }

    /// Run for `time`, then stop.
    pub fn run_timed(&self, time: Duration, params: Option<&TachoMotorParams>) -> Result<()> {
        self.set_time(time)
            .and_then(|_| self.set_params(params))
            .and_then(|_| self.command("run-timed"))
            .map_err(DeviceError::motor("run timed"))
    }

    /// Stop the motor using `action`.
    pub fn stop(&self, action: StopAction) -> Result<()> {
        self.set_stop_action(action)
            .and_then(|_| self.command("stop"))
            .map_err(DeviceError::motor("stop"))
    }

    /// Highest speed accepted by the run commands.
    pub fn max_speed(&self) -> TachoSpeed {
        self.max_speed
    }

    /// Tacho counts in one full rotation.
    pub fn count_per_rotation(&self) -> TachoDelta {
        self.count_per_rot
    }

    /// Stop actions this motor supports.
    pub fn stop_actions(&self) -> StopActions {
        self.stop_actions
    }

    /// Current encoder position
    pub fn position(&self) -> Result<TachoPosition> {
        self.read_i32(&self.position, "position")
            .map(TachoPosition)
            .map_err(DeviceError::motor("read position"))
    }

    /// Current measured speed
    pub fn speed(&self) -> Result<TachoSpeed> {
        self.read_i32(&self.speed, "speed")
            .map(TachoSpeed)
            .map_err(DeviceError::motor("read speed"))
    }
}

// Private
impl TachoMotor {
    /// Open the tacho motor device at `path`
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let count_per_rot = read_attr_int(&path.join("count_per_rot"))?;
        let max_speed = read_attr_int(&path.join("max_speed"))?;
        let max_speed = match i32::try_from(max_speed) {
            Ok(max) if max >= 0 => TachoSpeed(max),
            _ => return Err(bad_int(&attr_name(&path.join("max_speed")))),
        };
        let mut stop_actions = StopActions::empty();
        for word in read_attr_words(&path.join("stop_actions"))? {
            // Newer kernels may know more than we do.
            if let Ok(action) = word.parse::<StopAction>() {
                stop_actions |= action.flag();
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            command: open_attr_write(&path.join("command"))?,
            position: open_attr_read(&path.join("position"))?,
            position_sp: open_attr_write(&path.join("position_sp"))?,
            speed: open_attr_read(&path.join("speed"))?,
            speed_sp: open_attr_write(&path.join("speed_sp"))?,
            stop_action: open_attr_write(&path.join("stop_action"))?,
            time_sp: open_attr_write(&path.join("time_sp"))?,
            count_per_rot: TachoDelta(to_i32(count_per_rot, "count_per_rot")?),
            max_speed,
            stop_actions,
            closed: false,
        })
    }

    fn attr(&self, name: &str) -> String {
        format!("{}/{}", self.kernel_name(), name)
    }

    fn command(&self, command: &str) -> Result<()> {
        write_attr(&self.command, &self.attr("command"), command.as_bytes())
    }

    fn read_i32(&self, f: &File, name: &str) -> Result<i32> {
        let name = self.attr(name);
        to_i32(read_file_int(f, &name)?, &name)
    }

    fn set_speed(&self, speed: TachoSpeed) -> Result<()> {
        let max = self.max_speed.0;
        if speed.0 > max || speed.0 < -max {
            return Err(DeviceError::InvalidArgument(format!(
                "speed {} beyond max speed {}",
                speed.0, max
            )));
        }
        write_attr_int(&self.speed_sp, &self.attr("speed_sp"), speed.0.into())
    }

    fn set_position(&self, pos: i32) -> Result<()> {
        write_attr_int(&self.position_sp, &self.attr("position_sp"), pos.into())
    }

    fn set_time(&self, time: Duration) -> Result<()> {
        let ms = i64::try_from(time.as_millis()).unwrap_or(i64::MAX);
        write_attr_int(&self.time_sp, &self.attr("time_sp"), ms)
    }

    fn set_stop_action(&self, action: StopAction) -> Result<()> {
        if !self.stop_actions.supports(action) {
            return Err(DeviceError::InvalidArgument(format!(
                "stop action `{}` not supported by {}",
                action,
                self.kernel_name()
            )));
        }
        write_attr(
            &self.stop_action,
            &self.attr("stop_action"),
            action.as_str().as_bytes(),
        )
    }

    fn set_params(&self, params: Option<&TachoMotorParams>) -> Result<()> {
        let params = params.copied().unwrap_or_default();
        if params.speed.0 != 0 {
            self.set_speed(params.speed)?;
        }
        self.set_stop_action(params.stop_action)
    }
}

impl Device for TachoMotor {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TachoMotor {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.reset() {
            warn!("{}: {}", self.kernel_name(), e);
        }
    }
}

fn to_i32(i: i64, name: &str) -> Result<i32> {
    i32::try_from(i).map_err(|_| bad_int(name))
}

fn bad_int(name: &str) -> DeviceError {
    DeviceError::attr(name, io::Error::new(io::ErrorKind::InvalidData, BAD_INT))
}
