//! Literal per-instrument constants.
//!
//! Sentinel codes, calibration attribute names and band numbers are fixed
//! by the instrument products and are not derived from file metadata.

use super::calibration::{CalibrationParameters, SentinelMap};

/// Version of this set of tables.
pub const VERSION: &str = "terra-tables 1.0 (ASTER UG v2, MODIS L1B C6, MISR GRP)";

/// Value written for missing or invalid data.
pub const FILL: f32 = -999.0;

/// Value written for saturated data.
pub const SATURATED: f32 = -998.0;

/// ASTER Level 1B radiance.
pub mod aster {
    use super::*;

    /// Largest raw value of the 8-bit VNIR and SWIR bands.
    pub const VNIR_SWIR_MAX: u32 = 255;
    /// Largest raw value of the 12-bit TIR bands.
    pub const TIR_MAX: u32 = 4095;

    /// Band names in coefficient column order.
    pub const BANDS: [&str; 15] = [
        "01", "02", "3N", "3B", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14",
    ];

    /// Gain setting of a band, as reported in the product metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Gain {
        /// HGH
        High,
        /// NOR
        Normal,
        /// LO1
        Low1,
        /// LO2
        Low2,
        /// OFF
        Off,
    }

    impl Gain {
        /// Parse the metadata abbreviation.
        pub fn from_label(label: &str) -> Option<Self> {
            match label {
                "HGH" => Some(Self::High),
                "NOR" => Some(Self::Normal),
                "LO1" => Some(Self::Low1),
                "LO2" => Some(Self::Low2),
                "OFF" => Some(Self::Off),
                _ => None,
            }
        }
    }

    // Unit conversion coefficients, W/(m^2 sr um) per DN. Negative entries
    // mark gain and band combinations that do not exist.
    const COEFFICIENTS: [[f32; 15]; 5] = [
        [
            0.676, 0.708, 0.423, 0.423, 0.1087, 0.0348, 0.0313, 0.0299, 0.0209, 0.0159, -1.0,
            -1.0, -1.0, -1.0, -1.0,
        ],
        [
            1.688, 1.415, 0.862, 0.862, 0.2174, 0.0696, 0.0625, 0.0597, 0.0417, 0.0318,
            0.006822, 0.006780, 0.006590, 0.005693, 0.005225,
        ],
        [
            2.25, 1.89, 1.15, 1.15, 0.290, 0.0925, 0.0830, 0.0795, 0.0556, 0.0424, -1.0, -1.0,
            -1.0, -1.0, -1.0,
        ],
        [
            -1.0, -1.0, -1.0, -1.0, 0.290, 0.409, 0.390, 0.332, 0.245, 0.265, -1.0, -1.0, -1.0,
            -1.0, -1.0,
        ],
        [-1.0; 15],
    ];

    /// Unit conversion coefficient of `band` at `gain`.
    pub fn coefficient(gain: Gain, band: &str) -> Option<f32> {
        let column = BANDS.iter().position(|&b| b == band)?;
        let value = COEFFICIENTS[gain as usize][column];
        (value > 0.0).then_some(value)
    }

    /// Reserved codes: 0 is missing, 1 is zero radiance, `max` is saturated.
    pub fn sentinels(max: u32) -> SentinelMap {
        SentinelMap::new()
            .with_code(0, FILL)
            .with_code(1, 0.0)
            .with_code(max, SATURATED)
    }

    /// Calibration of one band dataset: `(raw - 1) * coefficient`.
    ///
    /// ASTER stores each band as its own dataset, so the coefficient covers
    /// every row.
    pub fn calibration(coefficient: f32, max: u32) -> CalibrationParameters {
        CalibrationParameters {
            scales: vec![coefficient],
            offsets: vec![1.0],
            sentinels: sentinels(max),
            valid_range: None,
            broadcast: true,
        }
    }
}

/// MODIS Level 1B radiance and uncertainty.
pub mod modis {
    use super::*;

    /// Attribute holding the per-band radiance scales.
    pub const RADIANCE_SCALES: &str = "radiance_scales";
    /// Attribute holding the per-band radiance offsets.
    pub const RADIANCE_OFFSETS: &str = "radiance_offsets";
    /// Attribute holding the per-band uncertainty scaling factors.
    pub const UNCERTAINTY_SCALING: &str = "scaling_factor";
    /// Attribute holding the per-band specified uncertainties.
    pub const UNCERTAINTY_SPECIFIED: &str = "specified_uncertainty";

    /// Highest raw radiance code; reserved codes count down from here.
    pub const LADDER_TOP: u32 = 65535;
    /// Lowest reserved raw radiance code.
    pub const LADDER_BOTTOM: u32 = 65500;

    /// Raw uncertainty index used as fill.
    pub const UNCERTAINTY_FILL_RAW: u32 = 255;
    /// Valid raw uncertainty indices.
    pub const UNCERTAINTY_VALID_RANGE: (u32, u32) = (0, 15);

    /// Reserved radiance codes: 65535 is -999, 65534 is -998 and so on.
    pub fn radiance_sentinels() -> SentinelMap {
        SentinelMap::new().with_ladder(LADDER_TOP, LADDER_BOTTOM, FILL)
    }

    /// Radiance defaults; scales and offsets always come from the file.
    pub fn radiance_calibration() -> CalibrationParameters {
        CalibrationParameters {
            scales: Vec::new(),
            offsets: Vec::new(),
            sentinels: radiance_sentinels(),
            valid_range: None,
            broadcast: false,
        }
    }

    /// Uncertainty defaults; factors always come from the file.
    pub fn uncertainty_calibration() -> CalibrationParameters {
        CalibrationParameters {
            scales: Vec::new(),
            offsets: Vec::new(),
            sentinels: SentinelMap::new().with_code(UNCERTAINTY_FILL_RAW, FILL),
            valid_range: Some(UNCERTAINTY_VALID_RANGE),
            broadcast: false,
        }
    }

    /// Reflective solar bands at 1 km.
    pub const BAND_1KM_REFSB: [f32; 15] = [
        8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 13.5, 14.0, 14.5, 15.0, 16.0, 17.0, 18.0, 19.0, 26.0,
    ];
    /// Emissive bands at 1 km.
    pub const BAND_1KM_EMISSIVE: [f32; 16] = [
        20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 27.0, 28.0, 29.0, 30.0, 31.0, 32.0, 33.0, 34.0, 35.0,
        36.0,
    ];
    /// Bands at 250 m.
    pub const BAND_250M: [f32; 2] = [1.0, 2.0];
    /// Bands at 500 m.
    pub const BAND_500M: [f32; 5] = [3.0, 4.0, 5.0, 6.0, 7.0];

    /// Band numbers of a band dimension, matched on the dimension name.
    pub fn band_table(dimension: &str) -> Option<&'static [f32]> {
        if dimension.contains("1KM_RefSB") {
            Some(&BAND_1KM_REFSB)
        } else if dimension.contains("1KM_Emissive") {
            Some(&BAND_1KM_EMISSIVE)
        } else if dimension.contains("250M") {
            Some(&BAND_250M)
        } else if dimension.contains("500M") {
            Some(&BAND_500M)
        } else {
            None
        }
    }
}

/// MISR radiance with data quality indicators.
pub mod misr {
    /// Attribute holding the radiance scale.
    pub const SCALE_ATTRIBUTE: &str = "Scale factor";
    /// Suffix of radiance fields carrying quality bits.
    pub const RDQI_SUFFIX: &str = "/RDQI";
    /// Suffix of the side dataset listing low-accuracy positions.
    pub const LOW_ACCURACY_SUFFIX: &str = "_low_accuracy_pos";
    /// Shifted radiance codes reserved for fill.
    pub const RESERVED: [u16; 2] = [16378, 16380];
}

/// Sun and view geometry angles.
pub mod geometry {
    /// Attribute holding the degrees per raw count.
    pub const SCALE_ATTRIBUTE: &str = "scale_factor";
    /// Degrees per raw count.
    pub const SCALE: f32 = 0.01;
    /// Raw fill value.
    pub const FILL_RAW: i16 = -32767;
}
