//! Opcode table
//!
//! Every packet starts with a one-byte opcode. Replies carry the opcode of the
//! request they answer, or [`RETRY_SENTINEL`] when the device asks for the
//! request to be sent again.

use std::fmt;
use std::num::NonZeroU8;

use crate::error::CodecError;

/// Reply opcode meaning "resend your request now"
pub const RETRY_SENTINEL: u8 = 0;

/// Command identifier, also used as the coalescing key of the request queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(NonZeroU8);

impl Opcode {
    /// Current date/time of the clock
    pub const TIME_GET: Opcode = Opcode::from_const(2);
    pub const TIME_SET: Opcode = Opcode::from_const(3);
    /// Starts or polls an NTP synchronization
    pub const TIME_SYNC_START: Opcode = Opcode::from_const(4);
    pub const TIME_SETTINGS_GET: Opcode = Opcode::from_const(5);
    pub const TIME_SETTINGS_SET: Opcode = Opcode::from_const(6);

    pub const WIFI_IP_REPORT: Opcode = Opcode::from_const(7);
    pub const WIFI_SETTINGS_GET: Opcode = Opcode::from_const(8);
    pub const WIFI_SETTINGS_SET: Opcode = Opcode::from_const(9);

    /// Live tube/LED/neon state for the display mirror
    pub const SCREEN_STATE_GET: Opcode = Opcode::from_const(10);

    pub const DISPLAY_TIME_GET: Opcode = Opcode::from_const(11);
    pub const DISPLAY_TIME_SET: Opcode = Opcode::from_const(12);

    pub const LIGHT_STATE_GET: Opcode = Opcode::from_const(13);
    pub const LIGHT_SETTINGS_GET: Opcode = Opcode::from_const(14);
    pub const LIGHT_SETTINGS_SET: Opcode = Opcode::from_const(15);

    pub const HEAT_LAUNCH_NOW: Opcode = Opcode::from_const(16);
    pub const HEAT_SETTINGS_GET: Opcode = Opcode::from_const(17);
    pub const HEAT_SETTINGS_SET: Opcode = Opcode::from_const(18);

    pub const DISPLAY_DATE_GET: Opcode = Opcode::from_const(19);
    pub const DISPLAY_DATE_SET: Opcode = Opcode::from_const(20);

    /// "Own network" scene settings
    pub const ONET_SETTINGS_GET: Opcode = Opcode::from_const(21);
    pub const ONET_SETTINGS_SET: Opcode = Opcode::from_const(22);

    /// "Connected network" scene settings
    pub const CNET_SETTINGS_GET: Opcode = Opcode::from_const(23);
    pub const CNET_SETTINGS_SET: Opcode = Opcode::from_const(24);

    pub const WIFI_INFO_GET: Opcode = Opcode::from_const(26);
    pub const WIFI_SEARCH_POLL: Opcode = Opcode::from_const(27);
    pub const WIFI_SETTINGS_CHANGED: Opcode = Opcode::from_const(28);

    pub const TIME_SYNC: Opcode = Opcode::from_const(29);
    pub const TIME_HOSTLIST_SET: Opcode = Opcode::from_const(30);

    const fn from_const(value: u8) -> Self {
        match NonZeroU8::new(value) {
            Some(v) => Opcode(v),
            None => panic!("opcode 0 is reserved"),
        }
    }

    /// Creates an opcode, rejecting the reserved value 0
    pub fn new(value: u8) -> Result<Self, CodecError> {
        NonZeroU8::new(value)
            .map(Opcode)
            .ok_or(CodecError::ReservedOpcode)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0.get()
    }
}

impl TryFrom<u8> for Opcode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::new(value)
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode.get()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}
