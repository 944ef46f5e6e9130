//! Typed device messages
//!
//! Each request type knows its opcode, its diagnostic name and how to write
//! its payload; its associated response type knows how to read the reply
//! payload (the opcode byte is already consumed by the session).
//!
//! | opcode | request | response |
//! |---|---|---|
//! | 2  | [`TimeGet`] | [`DeviceTime`] |
//! | 3  | [`TimeSet`] | [`Ack`] |
//! | 4  | [`TimeSyncStart`] | [`SyncStatus`] |
//! | 5  | [`TimeSettingsGet`] | [`TimeSettings`] |
//! | 6  | [`TimeSettingsSet`] | [`Ack`] |
//! | 8  | [`WifiSettingsGet`] | [`WifiSettings`] |
//! | 9  | [`WifiSettingsSet`] | [`Ack`] |
//! | 10 | [`ScreenStateGet`] | [`ScreenState`] |
//! | 11 | [`TimeSceneGet`] | [`DisplaySettings`] |
//! | 12 | [`TimeSceneSet`] | [`Ack`] |
//! | 13 | [`LightStateGet`] | [`LightState`] |
//! | 14 | [`LightSettingsGet`] | [`LightSettings`] |
//! | 15 | [`LightSettingsSet`] | [`Ack`] |
//! | 16 | [`HeatLaunchNow`] | [`Ack`] |
//! | 17 | [`HeatSettingsGet`] | [`HeatSettings`] |
//! | 18 | [`HeatSettingsSet`] | [`Ack`] |
//! | 19 | [`DateSceneGet`] | [`SceneSettings`] |
//! | 20 | [`DateSceneSet`] | [`Ack`] |
//! | 21 | [`OwnNetSceneGet`] | [`SceneSettings`] |
//! | 22 | [`OwnNetSceneSet`] | [`Ack`] |
//! | 23 | [`ConnectedNetSceneGet`] | [`SceneSettings`] |
//! | 24 | [`ConnectedNetSceneSet`] | [`Ack`] |
//! | 26 | [`WifiInfoGet`] | [`WifiInfo`] |
//! | 27 | [`WifiSearchPoll`] | [`SearchStatus`] |

use std::net::Ipv4Addr;

use crate::codec::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::opcode::Opcode;
use crate::packet::Packet;

/// Size of the SNTP host list text field
pub const HOST_LIST_SIZE: usize = 260;
/// Size of an SSID text field
pub const SSID_SIZE: usize = 33;
/// Size of a WiFi password text field
pub const PASSWORD_SIZE: usize = 13;

/// Number of nixie tubes on the clock face
pub const NIXIE_COUNT: usize = 6;
/// Number of neon separator lamps
pub const NEON_COUNT: usize = 4;

/// Writes a value's fields into a packet payload
pub trait Encode {
    fn encode(&self, writer: &mut Writer) -> Result<()>;
}

/// Reads a value's fields from a reply payload
pub trait Decode: Sized {
    fn decode(reader: &mut Reader) -> Result<Self>;
}

/// A request with a known opcode and reply layout
pub trait Request: Encode {
    const OPCODE: Opcode;

    /// Human readable action, shown when the request fails
    const NAME: &'static str;

    type Response: Decode;

    /// Builds the outbound packet for this request
    fn to_packet(&self) -> Result<Packet> {
        let mut packet = Packet::new(Self::OPCODE, Self::NAME);
        self.encode(packet.writer_mut())?;
        Ok(packet)
    }
}

fn read_array<T, const N: usize>(
    reader: &mut Reader,
    mut read: impl FnMut(&mut Reader) -> Result<T>,
) -> Result<[T; N]>
where
    T: Default + Copy,
{
    let mut items = [T::default(); N];
    for item in items.iter_mut() {
        *item = read(reader)?;
    }
    Ok(items)
}

/// Reply without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack;

impl Decode for Ack {
    fn decode(_reader: &mut Reader) -> Result<Self> {
        Ok(Ack)
    }
}

macro_rules! empty_request {
    ($(#[$meta:meta])* $name:ident, $opcode:expr, $label:expr, $response:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl Encode for $name {
            fn encode(&self, _writer: &mut Writer) -> Result<()> {
                Ok(())
            }
        }

        impl Request for $name {
            const OPCODE: Opcode = $opcode;
            const NAME: &'static str = $label;
            type Response = $response;
        }
    };
}

empty_request!(
    /// Reads the clock's current and last synchronized date/time
    TimeGet,
    Opcode::TIME_GET,
    "date/time request",
    DeviceTime
);
empty_request!(
    TimeSettingsGet,
    Opcode::TIME_SETTINGS_GET,
    "time sync settings request",
    TimeSettings
);
empty_request!(
    WifiSettingsGet,
    Opcode::WIFI_SETTINGS_GET,
    "WiFi settings request",
    WifiSettings
);
empty_request!(
    /// Polled by the display mirror
    ScreenStateGet,
    Opcode::SCREEN_STATE_GET,
    "screen state request",
    ScreenState
);
empty_request!(
    WifiInfoGet,
    Opcode::WIFI_INFO_GET,
    "WiFi state request",
    WifiInfo
);

/// Calendar date and time as stored by the clock
///
/// The year is kept as an offset from 2000, the way the device stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    pub fn full_year(&self) -> u16 {
        2000 + u16::from(self.year)
    }
}

impl Encode for DateTime {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.put_u8(self.year);
        writer.put_u8(self.month);
        writer.put_u8(self.day);
        writer.put_u8(self.hour);
        writer.put_u8(self.minute);
        writer.put_u8(self.second);
        Ok(())
    }
}

impl Decode for DateTime {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            year: reader.u8()?,
            month: reader.u8()?,
            day: reader.u8()?,
            hour: reader.u8()?,
            minute: reader.u8()?,
            second: reader.u8()?,
        })
    }
}

/// Reply to [`TimeGet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTime {
    pub current: DateTime,
    /// `None` when the clock was never synchronized (month 0 on the wire)
    pub last_sync: Option<DateTime>,
    /// Whether an NTP synchronization can be started right now
    pub sync_available: bool,
}

impl Decode for DeviceTime {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let current = DateTime::decode(reader)?;
        let last_sync = DateTime::decode(reader)?;
        let sync_available = reader.bool()?;

        Ok(Self {
            current,
            last_sync: (last_sync.month != 0).then_some(last_sync),
            sync_available,
        })
    }
}

/// Sets the clock's date/time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSet(pub DateTime);

impl Encode for TimeSet {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.0.encode(writer)
    }
}

impl Request for TimeSet {
    const OPCODE: Opcode = Opcode::TIME_SET;
    const NAME: &'static str = "apply date/time";
    type Response = Ack;
}

/// Starts an NTP synchronization, or polls a running one when `check` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeSyncStart {
    pub check: bool,
}

impl Encode for TimeSyncStart {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.put_bool(self.check);
        Ok(())
    }
}

impl Request for TimeSyncStart {
    const OPCODE: Opcode = Opcode::TIME_SYNC_START;
    const NAME: &'static str = "date/time synchronization";
    type Response = SyncStatus;
}

/// Outcome of a synchronization step
///
/// `Failed` is an ordinary reply, not a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    Failed,
    Pending,
}

impl Decode for SyncStatus {
    fn decode(reader: &mut Reader) -> Result<Self> {
        match reader.u8()? {
            0 => Ok(SyncStatus::Success),
            1 => Ok(SyncStatus::Failed),
            2 => Ok(SyncStatus::Pending),
            value => Err(CodecError::InvalidValue {
                field: "sync status",
                value,
            }),
        }
    }
}

/// NTP synchronization settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeSettings {
    pub sync_enabled: bool,
    /// Hours from UTC
    pub timezone: i8,
    /// Daylight/manual correction in hours
    pub offset: i8,
    /// SNTP hosts, one per line
    pub hosts: String,
}

impl Encode for TimeSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.put_bool(self.sync_enabled);
        writer.put_i8(self.timezone);
        writer.put_i8(self.offset);
        writer.put_cstr(&self.hosts, HOST_LIST_SIZE)
    }
}

impl Decode for TimeSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            sync_enabled: reader.bool()?,
            timezone: reader.i8()?,
            offset: reader.i8()?,
            hosts: reader.cstr(HOST_LIST_SIZE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSettingsSet(pub TimeSettings);

impl Encode for TimeSettingsSet {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.0.encode(writer)
    }
}

impl Request for TimeSettingsSet {
    const OPCODE: Opcode = Opcode::TIME_SETTINGS_SET;
    const NAME: &'static str = "apply time sync settings";
    type Response = Ack;
}

/// One WiFi interface configuration (station or access point)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiCredentials {
    pub enabled: bool,
    pub channel: u8,
    pub ssid: String,
    pub password: String,
}

impl Encode for WifiCredentials {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.put_bool(self.enabled);
        writer.put_u8(self.channel);
        writer.put_cstr(&self.ssid, SSID_SIZE)?;
        writer.put_cstr(&self.password, PASSWORD_SIZE)
    }
}

impl Decode for WifiCredentials {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            enabled: reader.bool()?,
            channel: reader.u8()?,
            ssid: reader.cstr(SSID_SIZE)?,
            password: reader.cstr(PASSWORD_SIZE)?,
        })
    }
}

/// Station settings followed by access point settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiSettings {
    pub station: WifiCredentials,
    pub access_point: WifiCredentials,
}

impl Encode for WifiSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.station.encode(writer)?;
        self.access_point.encode(writer)
    }
}

impl Decode for WifiSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            station: WifiCredentials::decode(reader)?,
            access_point: WifiCredentials::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiSettingsSet(pub WifiSettings);

impl Encode for WifiSettingsSet {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.0.encode(writer)
    }
}

impl Request for WifiSettingsSet {
    const OPCODE: Opcode = Opcode::WIFI_SETTINGS_SET;
    const NAME: &'static str = "apply WiFi settings";
    type Response = Ack;
}

/// Interface status and address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Raw interface state as reported by the device
    pub state: u8,
    pub ip: Ipv4Addr,
}

impl InterfaceInfo {
    /// State value the device uses for an interface that is up
    pub const ACTIVE: u8 = 2;

    pub fn is_active(&self) -> bool {
        self.state == Self::ACTIVE
    }
}

impl Decode for InterfaceInfo {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let state = reader.u8()?;
        let octets: [u8; 4] = read_array(reader, Reader::u8)?;
        Ok(Self {
            state,
            ip: Ipv4Addr::from(octets),
        })
    }
}

/// Reply to [`WifiInfoGet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiInfo {
    pub station: InterfaceInfo,
    pub access_point: InterfaceInfo,
}

impl Decode for WifiInfo {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            station: InterfaceInfo::decode(reader)?,
            access_point: InterfaceInfo::decode(reader)?,
        })
    }
}

/// Network search command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SearchCommand {
    /// Query progress and the station at `index`
    #[default]
    Poll = 0,
    /// Start a new scan
    Start = 1,
}

/// Drives the device's WiFi network scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WifiSearchPoll {
    pub command: SearchCommand,
    /// Index of the next station to fetch
    pub index: u8,
}

impl Encode for WifiSearchPoll {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.put_u8(self.command as u8);
        writer.put_u8(self.index);
        Ok(())
    }
}

impl Request for WifiSearchPoll {
    const OPCODE: Opcode = Opcode::WIFI_SEARCH_POLL;
    const NAME: &'static str = "WiFi network search";
    type Response = SearchStatus;
}

/// Reply to [`WifiSearchPoll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// No scan running
    Idle,
    /// Scan in progress, poll again
    Searching,
    /// Station found at the requested index
    Found { ssid: String, rssi: i8, private: bool },
}

impl Decode for SearchStatus {
    fn decode(reader: &mut Reader) -> Result<Self> {
        match reader.u8()? {
            0 => Ok(SearchStatus::Idle),
            1 => Ok(SearchStatus::Searching),
            2 => Ok(SearchStatus::Found {
                ssid: reader.cstr(SSID_SIZE)?,
                rssi: reader.i8()?,
                private: reader.bool()?,
            }),
            value => Err(CodecError::InvalidValue {
                field: "search status",
                value,
            }),
        }
    }
}

/// State of one nixie tube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TubeState {
    pub digit: u8,
    pub saturation: u8,
    pub dot: bool,
}

/// Backlight color under one tube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Reply to [`ScreenStateGet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenState {
    pub tubes: [TubeState; NIXIE_COUNT],
    pub leds: [LedColor; NIXIE_COUNT],
    pub neons: [bool; NEON_COUNT],
}

impl Decode for ScreenState {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let tubes: [TubeState; NIXIE_COUNT] = read_array(reader, |r| {
            Ok(TubeState {
                digit: r.u8()?,
                saturation: r.u8()?,
                dot: r.bool()?,
            })
        })?;
        let leds: [LedColor; NIXIE_COUNT] = read_array(reader, |r| {
            Ok(LedColor {
                r: r.u8()?,
                g: r.u8()?,
                b: r.u8()?,
            })
        })?;
        let neons: [bool; NEON_COUNT] = read_array(reader, Reader::bool)?;

        Ok(Self { tubes, leds, neons })
    }
}

macro_rules! settings_set {
    ($(#[$meta:meta])* $name:ident($inner:ty), $opcode:expr, $label:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub $inner);

        impl Encode for $name {
            fn encode(&self, writer: &mut Writer) -> Result<()> {
                self.0.encode(writer)
            }
        }

        impl Request for $name {
            const OPCODE: Opcode = $opcode;
            const NAME: &'static str = $label;
            type Response = Ack;
        }
    };
}

/// Highest brightness level, in percent
pub const LIGHT_LEVEL_MAX: u8 = 100;

empty_request!(
    /// Polled about once a second while the light page is open
    LightStateGet,
    Opcode::LIGHT_STATE_GET,
    "ambient light state request",
    LightState
);
empty_request!(
    LightSettingsGet,
    Opcode::LIGHT_SETTINGS_GET,
    "light settings request",
    LightSettings
);

/// Reply to [`LightStateGet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightState {
    /// Current brightness in percent
    pub level: u8,
}

impl Decode for LightState {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self { level: reader.u8()? })
    }
}

/// Brightness control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightSettings {
    /// Manual level in percent, used while `auto` is off
    pub level: u8,
    /// Transition time step for automatic changes
    pub smooth: u8,
    /// Follow the light sensor
    pub auto: bool,
    /// Dim further at night, only meaningful with `auto`
    pub night: bool,
}

impl Encode for LightSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        if self.level > LIGHT_LEVEL_MAX {
            return Err(CodecError::InvalidValue {
                field: "light level",
                value: self.level,
            });
        }
        writer.put_u8(self.level);
        writer.put_u8(self.smooth);
        writer.put_bool(self.auto);
        writer.put_bool(self.night);
        Ok(())
    }
}

impl Decode for LightSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            level: reader.u8()?,
            smooth: reader.u8()?,
            auto: reader.bool()?,
            night: reader.bool()?,
        })
    }
}

settings_set!(
    LightSettingsSet(LightSettings),
    Opcode::LIGHT_SETTINGS_SET,
    "apply light settings"
);

empty_request!(
    /// Starts tube heating right away, regardless of the schedule
    HeatLaunchNow,
    Opcode::HEAT_LAUNCH_NOW,
    "tube heating launch",
    Ack
);
empty_request!(
    HeatSettingsGet,
    Opcode::HEAT_SETTINGS_GET,
    "tube heating settings request",
    HeatSettings
);

/// Scheduled tube heating (anti cathode poisoning run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeatSettings {
    /// Hour of day the run starts, `0..=23`
    pub hour: u8,
    /// Bit 0 is Monday, bit 6 is Sunday
    pub weekdays: u8,
}

impl HeatSettings {
    pub const EVERY_DAY: u8 = 0x7F;

    /// `weekday` counts from Monday = 0
    pub fn runs_on(&self, weekday: u8) -> bool {
        weekday < 7 && self.weekdays & (1 << weekday) != 0
    }
}

impl Encode for HeatSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        if self.hour > 23 {
            return Err(CodecError::InvalidValue {
                field: "heating hour",
                value: self.hour,
            });
        }
        writer.put_u8(self.hour);
        writer.put_u8(self.weekdays & Self::EVERY_DAY);
        Ok(())
    }
}

impl Decode for HeatSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            hour: reader.u8()?,
            weekdays: reader.u8()?,
        })
    }
}

settings_set!(
    HeatSettingsSet(HeatSettings),
    Opcode::HEAT_SETTINGS_SET,
    "apply tube heating settings"
);

/// Backlight part of a display scene
///
/// Smoothness and mode share one byte on the wire: smoothness in the low
/// 6 bits, mode in the high 2. Colors go out in G, R, B order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BacklightSettings {
    pub effect: u8,
    /// `0..=63`
    pub smooth: u8,
    /// `0..=3`
    pub mode: u8,
    pub colors: [LedColor; NIXIE_COUNT],
}

impl BacklightSettings {
    const SMOOTH_MASK: u8 = 0x3F;
    const MODE_SHIFT: u8 = 6;
}

impl Encode for BacklightSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        if self.smooth > Self::SMOOTH_MASK {
            return Err(CodecError::InvalidValue {
                field: "backlight smoothness",
                value: self.smooth,
            });
        }
        if self.mode > 3 {
            return Err(CodecError::InvalidValue {
                field: "backlight mode",
                value: self.mode,
            });
        }

        writer.put_u8(self.effect);
        writer.put_u8(self.smooth | (self.mode << Self::MODE_SHIFT));
        for color in &self.colors {
            writer.put_u8(color.g);
            writer.put_u8(color.r);
            writer.put_u8(color.b);
        }
        Ok(())
    }
}

impl Decode for BacklightSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        let effect = reader.u8()?;
        let packed = reader.u8()?;
        let colors = read_array(reader, |r| {
            let g = r.u8()?;
            let red = r.u8()?;
            let b = r.u8()?;
            Ok(LedColor { r: red, g, b })
        })?;

        Ok(Self {
            effect,
            smooth: packed & Self::SMOOTH_MASK,
            mode: packed >> Self::MODE_SHIFT,
            colors,
        })
    }
}

/// Neon separator part of a display scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeonSettings {
    /// Raw lamp mask, see [`NeonSettings::LAMP_BITS`]
    pub mask: u8,
    pub period: u8,
    pub smooth: u8,
    pub inversion: bool,
}

impl NeonSettings {
    /// Mask bit of each lamp, left to right
    pub const LAMP_BITS: [u8; NEON_COUNT] = [0x01, 0x04, 0x02, 0x08];

    pub fn is_lit(&self, lamp: usize) -> bool {
        Self::LAMP_BITS
            .get(lamp)
            .is_some_and(|bit| self.mask & bit != 0)
    }

    pub fn set_lit(&mut self, lamp: usize, lit: bool) {
        if let Some(bit) = Self::LAMP_BITS.get(lamp) {
            if lit {
                self.mask |= bit;
            } else {
                self.mask &= !bit;
            }
        }
    }
}

impl Encode for NeonSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.put_u8(self.mask);
        writer.put_u8(self.period);
        writer.put_u8(self.smooth);
        writer.put_bool(self.inversion);
        Ok(())
    }
}

impl Decode for NeonSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            mask: reader.u8()?,
            period: reader.u8()?,
            smooth: reader.u8()?,
            inversion: reader.bool()?,
        })
    }
}

/// How one display scene looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySettings {
    pub backlight: BacklightSettings,
    pub neons: NeonSettings,
    /// Digit change effect
    pub digit_effect: u8,
}

impl DisplaySettings {
    /// Encoded size in bytes
    pub const SIZE: usize = 2 + 3 * NIXIE_COUNT + 4 + 1;
}

impl Encode for DisplaySettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        self.backlight.encode(writer)?;
        self.neons.encode(writer)?;
        writer.put_u8(self.digit_effect);
        Ok(())
    }
}

impl Decode for DisplaySettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            backlight: BacklightSettings::decode(reader)?,
            neons: NeonSettings::decode(reader)?,
            digit_effect: reader.u8()?,
        })
    }
}

/// Longest time an optional scene stays on screen, in seconds
pub const SCENE_TIMEOUT_MAX: u8 = 30;

/// Settings of an optional scene (date, network addresses)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneSettings {
    pub display: DisplaySettings,
    /// Whether the scene is shown at all
    pub enabled: bool,
    /// Seconds on screen, up to [`SCENE_TIMEOUT_MAX`]
    pub timeout: u8,
}

impl Encode for SceneSettings {
    fn encode(&self, writer: &mut Writer) -> Result<()> {
        if self.timeout > SCENE_TIMEOUT_MAX {
            return Err(CodecError::InvalidValue {
                field: "scene timeout",
                value: self.timeout,
            });
        }
        self.display.encode(writer)?;
        writer.put_bool(self.enabled);
        writer.put_u8(self.timeout);
        Ok(())
    }
}

impl Decode for SceneSettings {
    fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            display: DisplaySettings::decode(reader)?,
            enabled: reader.bool()?,
            timeout: reader.u8()?,
        })
    }
}

empty_request!(
    /// The time scene is always shown, so it has no enable flag
    TimeSceneGet,
    Opcode::DISPLAY_TIME_GET,
    "time scene settings request",
    DisplaySettings
);
settings_set!(
    TimeSceneSet(DisplaySettings),
    Opcode::DISPLAY_TIME_SET,
    "apply time scene settings"
);

empty_request!(
    DateSceneGet,
    Opcode::DISPLAY_DATE_GET,
    "date scene settings request",
    SceneSettings
);
settings_set!(
    DateSceneSet(SceneSettings),
    Opcode::DISPLAY_DATE_SET,
    "apply date scene settings"
);

empty_request!(
    /// Scene showing the address of the clock's own access point
    OwnNetSceneGet,
    Opcode::ONET_SETTINGS_GET,
    "own network scene settings request",
    SceneSettings
);
settings_set!(
    OwnNetSceneSet(SceneSettings),
    Opcode::ONET_SETTINGS_SET,
    "apply own network scene settings"
);

empty_request!(
    /// Scene showing the address received from the connected network
    ConnectedNetSceneGet,
    Opcode::CNET_SETTINGS_GET,
    "connected network scene settings request",
    SceneSettings
);
settings_set!(
    ConnectedNetSceneSet(SceneSettings),
    Opcode::CNET_SETTINGS_SET,
    "apply connected network scene settings"
);
