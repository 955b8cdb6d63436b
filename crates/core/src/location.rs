//! Locations and Mission Frames of Reference
//!
//! Mission items arrive tagged with a MAVLink frame. Recognised frames are
//! turned into a canonical [`Location`] (1e-7 degree lat/lng, centimetre
//! altitude, option flags); anything else is rejected by the caller.

use bitflags::bitflags;
use core::fmt;

/// Mean earth radius in metres
pub const RADIUS_OF_EARTH_M: f64 = 6_378_100.0;

/// Degrees to 1e-7 degree integer units
pub const DEG_TO_E7: f64 = 1.0e7;

/// Local frames in MISSION_ITEM_INT carry metres scaled by 1e4
pub const LOCAL_INT_SCALE: f64 = 1.0e4;

bitflags! {
    /// Location option flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LocationFlags: u8 {
        /// Altitude is relative to home
        const RELATIVE_ALT = 0b0000_0001;
        /// Altitude is relative to terrain
        const TERRAIN_ALT = 0b0000_0010;
    }
}

/// Canonical position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Latitude, degrees * 1e7
    pub lat: i32,
    /// Longitude, degrees * 1e7
    pub lng: i32,
    /// Altitude in centimetres
    pub alt_cm: i32,
    pub flags: LocationFlags,
}

impl Location {
    /// Absolute location from scaled integers
    pub const fn new(lat: i32, lng: i32, alt_cm: i32) -> Self {
        Self {
            lat,
            lng,
            alt_cm,
            flags: LocationFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: LocationFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_relative_alt(&self) -> bool {
        self.flags.contains(LocationFlags::RELATIVE_ALT)
    }

    pub fn is_terrain_alt(&self) -> bool {
        self.flags.contains(LocationFlags::TERRAIN_ALT)
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat as f64 / DEG_TO_E7
    }

    pub fn lng_deg(&self) -> f64 {
        self.lng as f64 / DEG_TO_E7
    }

    pub fn alt_m(&self) -> f32 {
        self.alt_cm as f32 / 100.0
    }

    /// Validate and build a home position from degrees and metres.
    ///
    /// The all-zero position is refused, as is anything outside
    /// `|lat| <= 90`, `|lng| <= 180`.
    pub fn home_from_degrees(lat_deg: f32, lng_deg: f32, alt_m: f32) -> Result<Self, HomeError> {
        if lat_deg == 0.0 && lng_deg == 0.0 && alt_m == 0.0 {
            return Err(HomeError::NullIsland);
        }
        if !(-90.0..=90.0).contains(&lat_deg) || !(-180.0..=180.0).contains(&lng_deg) {
            return Err(HomeError::OutOfRange);
        }
        Ok(Self::new(
            (lat_deg as f64 * DEG_TO_E7) as i32,
            (lng_deg as f64 * DEG_TO_E7) as i32,
            (alt_m as f64 * 100.0) as i32,
        ))
    }

    /// Validate and build a home position from SET_HOME_POSITION units
    /// (1e-7 degrees, millimetres).
    pub fn home_from_scaled(lat: i32, lng: i32, alt_mm: i32) -> Result<Self, HomeError> {
        if lat == 0 && lng == 0 && alt_mm == 0 {
            return Err(HomeError::NullIsland);
        }
        if lat.unsigned_abs() > 900_000_000 || lng.unsigned_abs() > 1_800_000_000 {
            return Err(HomeError::OutOfRange);
        }
        Ok(Self::new(lat, lng, alt_mm / 10))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6} {:.6} at {}m",
            self.lat_deg(),
            self.lng_deg(),
            self.alt_cm / 100
        )
    }
}

/// Rejected home positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeError {
    /// 0, 0, 0 is never a real home
    NullIsland,
    /// Latitude or longitude outside the valid range
    OutOfRange,
}

impl fmt::Display for HomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeError::NullIsland => write!(f, "Refusing 0,0 home position"),
            HomeError::OutOfRange => write!(f, "Home position out of range"),
        }
    }
}

/// Recognised mission-item frames of reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionFrame {
    /// Absolute altitude (MAV_FRAME_GLOBAL)
    Global,
    /// Offsets north/east/down from home (MAV_FRAME_LOCAL_NED)
    LocalNed,
    /// Non-positional command, stored as absolute (MAV_FRAME_MISSION)
    Mission,
    /// Altitude relative to home (MAV_FRAME_GLOBAL_RELATIVE_ALT)
    GlobalRelativeAlt,
    /// Offsets east/north/up from home (MAV_FRAME_LOCAL_ENU)
    LocalEnu,
    GlobalInt,
    GlobalRelativeAltInt,
    /// Altitude above terrain
    GlobalTerrainAlt,
    GlobalTerrainAltInt,
}

impl MissionFrame {
    /// Map a raw `MAV_FRAME` value. Unrecognised frames return `None`.
    pub fn from_raw(frame: u8) -> Option<Self> {
        match frame {
            0 => Some(MissionFrame::Global),
            1 => Some(MissionFrame::LocalNed),
            2 => Some(MissionFrame::Mission),
            3 => Some(MissionFrame::GlobalRelativeAlt),
            4 => Some(MissionFrame::LocalEnu),
            5 => Some(MissionFrame::GlobalInt),
            6 => Some(MissionFrame::GlobalRelativeAltInt),
            10 => Some(MissionFrame::GlobalTerrainAlt),
            11 => Some(MissionFrame::GlobalTerrainAltInt),
            _ => None,
        }
    }

    /// Raw `MAV_FRAME` value
    pub const fn raw(self) -> u8 {
        match self {
            MissionFrame::Global => 0,
            MissionFrame::LocalNed => 1,
            MissionFrame::Mission => 2,
            MissionFrame::GlobalRelativeAlt => 3,
            MissionFrame::LocalEnu => 4,
            MissionFrame::GlobalInt => 5,
            MissionFrame::GlobalRelativeAltInt => 6,
            MissionFrame::GlobalTerrainAlt => 10,
            MissionFrame::GlobalTerrainAltInt => 11,
        }
    }

    pub const fn is_local(self) -> bool {
        matches!(self, MissionFrame::LocalNed | MissionFrame::LocalEnu)
    }

    fn flags(self) -> LocationFlags {
        match self {
            MissionFrame::Global | MissionFrame::Mission | MissionFrame::GlobalInt => {
                LocationFlags::empty()
            }
            MissionFrame::GlobalRelativeAlt
            | MissionFrame::GlobalRelativeAltInt
            | MissionFrame::LocalNed
            | MissionFrame::LocalEnu => LocationFlags::RELATIVE_ALT,
            MissionFrame::GlobalTerrainAlt | MissionFrame::GlobalTerrainAltInt => {
                LocationFlags::TERRAIN_ALT
            }
        }
    }

    /// Transform MISSION_ITEM coordinates (degrees, or metres for local
    /// frames) into a canonical location. Local frames are offsets from
    /// `home`; `None` when the offset leaves the representable range.
    pub fn to_location(self, x: f32, y: f32, z: f32, home: &Location) -> Option<Location> {
        match self {
            MissionFrame::LocalNed => offset_from_home(home, x as f64, y as f64, -z),
            MissionFrame::LocalEnu => offset_from_home(home, y as f64, x as f64, z),
            _ => Some(
                Location::new(
                    (x as f64 * DEG_TO_E7) as i32,
                    (y as f64 * DEG_TO_E7) as i32,
                    (z as f64 * 100.0) as i32,
                )
                .with_flags(self.flags()),
            ),
        }
    }

    /// Transform MISSION_ITEM_INT coordinates (1e-7 degrees, or metres * 1e4
    /// for local frames).
    pub fn to_location_int(self, x: i32, y: i32, z: f32, home: &Location) -> Option<Location> {
        match self {
            MissionFrame::LocalNed => offset_from_home(
                home,
                x as f64 / LOCAL_INT_SCALE,
                y as f64 / LOCAL_INT_SCALE,
                -z,
            ),
            MissionFrame::LocalEnu => offset_from_home(
                home,
                y as f64 / LOCAL_INT_SCALE,
                x as f64 / LOCAL_INT_SCALE,
                z,
            ),
            _ => Some(Location::new(x, y, (z as f64 * 100.0) as i32).with_flags(self.flags())),
        }
    }
}

/// Home-relative location from north/east offsets in metres and a height
/// above home in metres. Float-to-int casts saturate, so only the addition
/// to home can overflow.
fn offset_from_home(home: &Location, north_m: f64, east_m: f64, up_m: f32) -> Option<Location> {
    let lat_rad = home.lat_deg().to_radians();
    let dlat = (north_m / RADIUS_OF_EARTH_M).to_degrees();
    let scale = libm::cos(lat_rad);
    // Longitude offsets degenerate at the poles
    let dlng = if libm::fabs(scale) > 1.0e-9 {
        (east_m / (RADIUS_OF_EARTH_M * scale)).to_degrees()
    } else {
        0.0
    };
    let lat = ((dlat * DEG_TO_E7) as i32).checked_add(home.lat)?;
    let lng = ((dlng * DEG_TO_E7) as i32).checked_add(home.lng)?;
    if lat.unsigned_abs() > 900_000_000 || lng.unsigned_abs() > 1_800_000_000 {
        return None;
    }
    Some(Location::new(lat, lng, (up_m as f64 * 100.0) as i32).with_flags(LocationFlags::RELATIVE_ALT))
}
