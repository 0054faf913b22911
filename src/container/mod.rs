use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use file_metrics::container::{ContainerID, Error};
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// Returns an error if the raw id is empty or its length exceeds
    /// [`CONTAINER_ID_MAX_LEN`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or longer
    /// than [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContainerID::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a container as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerState {
    Running,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl ContainerState {
    /// Maps the runtime's state string onto the known states.
    ///
    /// The runtime reports more granular states (`created`, `restarting`,
    /// `removing`, `exited`, `dead`); everything that is not running or
    /// paused counts as stopped, unrecognized strings as unknown.
    pub fn parse(state: &str) -> Self {
        match state {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "created" | "restarting" | "removing" | "exited" | "dead" | "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A container known to the runtime at enumeration time.
///
/// Identity is the [`ContainerID`]; refs are recreated on every enumeration
/// and dropped when the runtime no longer reports the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    id: ContainerID,
    name: String,
    state: ContainerState,
}

impl ContainerRef {
    pub fn new(id: ContainerID, name: impl Into<String>, state: ContainerState) -> Self {
        Self {
            id,
            name: name.into(),
            state,
        }
    }

    pub fn id(&self) -> &ContainerID {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }
}
