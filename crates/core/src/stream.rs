//! Telemetry Streams and Rate Table
//!
//! A stream is a named group of telemetry messages sharing one configured
//! rate. Each GCS channel owns its own [`StreamRates`] table, mirroring the
//! `SRn_<NAME>` parameter family: nine entries, integer Hz in `[0, 10]`,
//! default 1 Hz (10 Hz for the parameter stream).

use core::fmt::{self, Write};

use heapless::String;

/// Number of telemetry streams per channel
pub const NUM_STREAMS: usize = 9;

/// Upper bound accepted through the parameter interface
pub const RATE_PARAM_MAX_HZ: f32 = 10.0;

/// Rate forced onto the parameter stream while a parameter download is
/// running with a disabled PARAMS rate.
pub const PARAMS_FALLBACK_RATE_HZ: f32 = 10.0;

/// Longest stream-rate parameter name (`SR255_RAW_SENS`)
pub const RATE_PARAM_NAME_LEN: usize = 16;

/// Named telemetry stream
///
/// Discriminants are the stream's slot in the rate table and the order of
/// its parameter in the `SRn_` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamId {
    RawSensors = 0,
    ExtendedStatus = 1,
    RcChannels = 2,
    RawController = 3,
    Position = 4,
    Extra1 = 5,
    Extra2 = 6,
    Extra3 = 7,
    Params = 8,
}

impl StreamId {
    /// All streams in table order
    pub const ALL: [StreamId; NUM_STREAMS] = [
        StreamId::RawSensors,
        StreamId::ExtendedStatus,
        StreamId::RcChannels,
        StreamId::RawController,
        StreamId::Position,
        StreamId::Extra1,
        StreamId::Extra2,
        StreamId::Extra3,
        StreamId::Params,
    ];

    /// Slot of this stream in per-channel tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stream for a table slot, `None` when out of range
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parameter name suffix (`SRn_<suffix>`)
    pub const fn param_suffix(self) -> &'static str {
        match self {
            StreamId::RawSensors => "RAW_SENS",
            StreamId::ExtendedStatus => "EXT_STAT",
            StreamId::RcChannels => "RC_CHAN",
            StreamId::RawController => "RAW_CTRL",
            StreamId::Position => "POSITION",
            StreamId::Extra1 => "EXTRA1",
            StreamId::Extra2 => "EXTRA2",
            StreamId::Extra3 => "EXTRA3",
            StreamId::Params => "PARAMS",
        }
    }

    /// Factory default rate in Hz
    pub const fn default_rate_hz(self) -> f32 {
        match self {
            StreamId::Params => 10.0,
            _ => 1.0,
        }
    }

    /// Map a `MAV_DATA_STREAM` id onto a stream.
    ///
    /// `MAV_DATA_STREAM_ALL` (0) is not a single stream and returns `None`;
    /// callers handle it through [`StreamRates::set_all_telemetry`].
    pub fn from_data_stream(id: u8) -> Option<Self> {
        match id {
            1 => Some(StreamId::RawSensors),
            2 => Some(StreamId::ExtendedStatus),
            3 => Some(StreamId::RcChannels),
            4 => Some(StreamId::RawController),
            6 => Some(StreamId::Position),
            10 => Some(StreamId::Extra1),
            11 => Some(StreamId::Extra2),
            12 => Some(StreamId::Extra3),
            _ => None,
        }
    }
}

/// `MAV_DATA_STREAM_ALL`
pub const DATA_STREAM_ALL: u8 = 0;

/// Stream-rate parameter errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateParamError {
    /// Name does not belong to this channel's `SRn_` family
    UnknownName,
    /// Value outside `[0, RATE_PARAM_MAX_HZ]`
    OutOfRange { value: f32 },
}

impl fmt::Display for RateParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateParamError::UnknownName => write!(f, "Unknown stream rate parameter"),
            RateParamError::OutOfRange { value } => {
                write!(
                    f,
                    "Stream rate {} out of range [0, {}]",
                    value, RATE_PARAM_MAX_HZ
                )
            }
        }
    }
}

/// Per-channel configured stream rates
///
/// Rates are stored as float Hz and read live by the trigger engine on every
/// tick, so changes take effect on the next fire.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRates {
    channel: u8,
    rates: [f32; NUM_STREAMS],
}

impl StreamRates {
    /// Table for `channel` with factory defaults
    pub fn new(channel: u8) -> Self {
        let mut rates = [0.0; NUM_STREAMS];
        for stream in StreamId::ALL {
            rates[stream.index()] = stream.default_rate_hz();
        }
        Self { channel, rates }
    }

    /// Channel this table belongs to (the `n` in `SRn_`)
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Configured rate of a stream in Hz
    pub fn rate_hz(&self, stream: StreamId) -> f32 {
        self.rates[stream.index()]
    }

    /// Configured rate by raw slot, `None` for an out-of-range slot
    pub fn rate_hz_by_index(&self, index: usize) -> Option<f32> {
        self.rates.get(index).copied()
    }

    /// Set a stream's rate. Negative and NaN values disable the stream.
    pub fn set_rate_hz(&mut self, stream: StreamId, hz: f32) {
        self.rates[stream.index()] = if hz > 0.0 { hz } else { 0.0 };
    }

    /// Set every stream except PARAMS, which is internal to the parameter
    /// protocol.
    pub fn set_all_telemetry(&mut self, hz: f32) {
        for stream in StreamId::ALL {
            if stream != StreamId::Params {
                self.set_rate_hz(stream, hz);
            }
        }
    }

    /// Parameter name of a stream's rate on this channel
    pub fn param_name(&self, stream: StreamId) -> String<RATE_PARAM_NAME_LEN> {
        let mut name = String::new();
        // Longest possible name fits the buffer
        let _ = write!(name, "SR{}_{}", self.channel, stream.param_suffix());
        name
    }

    /// Resolve a parameter name belonging to this channel
    pub fn stream_for_param(&self, name: &str) -> Option<StreamId> {
        let rest = name.strip_prefix("SR")?;
        let (channel, suffix) = rest.split_once('_')?;
        if channel.parse::<u8>().ok()? != self.channel {
            return None;
        }
        StreamId::ALL
            .iter()
            .copied()
            .find(|stream| stream.param_suffix() == suffix)
    }

    /// Read a rate through its parameter name
    pub fn get_param(&self, name: &str) -> Option<f32> {
        self.stream_for_param(name)
            .map(|stream| self.rate_hz(stream))
    }

    /// Write a rate through its parameter name, enforcing the parameter range
    pub fn set_param(&mut self, name: &str, value: f32) -> Result<StreamId, RateParamError> {
        let stream = self
            .stream_for_param(name)
            .ok_or(RateParamError::UnknownName)?;
        if !(0.0..=RATE_PARAM_MAX_HZ).contains(&value) {
            return Err(RateParamError::OutOfRange { value });
        }
        self.rates[stream.index()] = value;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rates = StreamRates::new(0);
        assert_eq!(rates.rate_hz(StreamId::RawSensors), 1.0);
        assert_eq!(rates.rate_hz(StreamId::Extra3), 1.0);
        assert_eq!(rates.rate_hz(StreamId::Params), 10.0);
    }

    #[test]
    fn test_from_index_out_of_range() {
        assert_eq!(StreamId::from_index(8), Some(StreamId::Params));
        assert_eq!(StreamId::from_index(NUM_STREAMS), None);
        assert_eq!(StreamRates::new(0).rate_hz_by_index(42), None);
    }

    #[test]
    fn test_param_names() {
        let rates = StreamRates::new(1);
        assert_eq!(rates.param_name(StreamId::ExtendedStatus).as_str(), "SR1_EXT_STAT");
        assert_eq!(rates.stream_for_param("SR1_EXTRA1"), Some(StreamId::Extra1));
        // Other channel's family is not ours
        assert_eq!(rates.stream_for_param("SR0_EXTRA1"), None);
        assert_eq!(rates.stream_for_param("SR1_BOGUS"), None);
        assert_eq!(rates.stream_for_param("WP_RADIUS"), None);
    }

    #[test]
    fn test_set_param_range() {
        let mut rates = StreamRates::new(0);
        assert_eq!(rates.set_param("SR0_POSITION", 4.0), Ok(StreamId::Position));
        assert_eq!(rates.get_param("SR0_POSITION"), Some(4.0));

        assert_eq!(
            rates.set_param("SR0_POSITION", 11.0),
            Err(RateParamError::OutOfRange { value: 11.0 })
        );
        assert_eq!(
            rates.set_param("SR0_POSITION", -1.0),
            Err(RateParamError::OutOfRange { value: -1.0 })
        );
        assert_eq!(rates.get_param("SR0_POSITION"), Some(4.0));
        assert_eq!(
            rates.set_param("SR3_POSITION", 2.0),
            Err(RateParamError::UnknownName)
        );
    }

    #[test]
    fn test_set_all_telemetry_skips_params() {
        let mut rates = StreamRates::new(0);
        rates.set_all_telemetry(4.0);
        for stream in StreamId::ALL {
            let expected = if stream == StreamId::Params { 10.0 } else { 4.0 };
            assert_eq!(rates.rate_hz(stream), expected, "{:?}", stream);
        }
    }

    #[test]
    fn test_negative_rate_disables() {
        let mut rates = StreamRates::new(0);
        rates.set_rate_hz(StreamId::Extra2, -3.0);
        assert_eq!(rates.rate_hz(StreamId::Extra2), 0.0);
        rates.set_rate_hz(StreamId::Extra2, f32::NAN);
        assert_eq!(rates.rate_hz(StreamId::Extra2), 0.0);
    }

    #[test]
    fn test_data_stream_mapping() {
        assert_eq!(StreamId::from_data_stream(1), Some(StreamId::RawSensors));
        assert_eq!(StreamId::from_data_stream(6), Some(StreamId::Position));
        assert_eq!(StreamId::from_data_stream(12), Some(StreamId::Extra3));
        assert_eq!(StreamId::from_data_stream(DATA_STREAM_ALL), None);
        assert_eq!(StreamId::from_data_stream(5), None);
    }
}
