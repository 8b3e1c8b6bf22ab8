//! Colour description code points (ITU-T H.273) and their display names.
//!
//! The same code points are carried by the MP4 `colr` box (`nclx`), the
//! Matroska `Colour` element and codec VUI, so one table serves all three.

/// Color primaries (ITU-T H.273)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPrimaries {
    /// BT.709 (sRGB)
    Bt709,
    /// Unspecified
    Unspecified,
    /// BT.470M
    Bt470M,
    /// BT.470BG
    Bt470Bg,
    /// SMPTE 170M (NTSC)
    Smpte170M,
    /// SMPTE 240M
    Smpte240M,
    /// Generic film
    Film,
    /// BT.2020
    Bt2020,
    /// SMPTE ST 428-1 (XYZ)
    Smpte428,
    /// SMPTE RP 431-2 (DCI-P3)
    SmpteRp431,
    /// SMPTE EG 432-1 (Display P3)
    SmpteEg432,
    /// EBU Tech 3213
    Ebu3213,
    /// Unknown value
    Unknown(u8),
}

impl From<u8> for ColorPrimaries {
    fn from(value: u8) -> Self {
        match value {
            1 => ColorPrimaries::Bt709,
            2 => ColorPrimaries::Unspecified,
            4 => ColorPrimaries::Bt470M,
            5 => ColorPrimaries::Bt470Bg,
            6 => ColorPrimaries::Smpte170M,
            7 => ColorPrimaries::Smpte240M,
            8 => ColorPrimaries::Film,
            9 => ColorPrimaries::Bt2020,
            10 => ColorPrimaries::Smpte428,
            11 => ColorPrimaries::SmpteRp431,
            12 => ColorPrimaries::SmpteEg432,
            22 => ColorPrimaries::Ebu3213,
            v => ColorPrimaries::Unknown(v),
        }
    }
}

impl ColorPrimaries {
    /// MediaInfo display name; `None` when unspecified or unknown.
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            ColorPrimaries::Bt709 => "BT.709",
            ColorPrimaries::Bt470M => "BT.470 System M",
            ColorPrimaries::Bt470Bg => "BT.601 PAL",
            ColorPrimaries::Smpte170M => "BT.601 NTSC",
            ColorPrimaries::Smpte240M => "SMPTE 240M",
            ColorPrimaries::Film => "Generic film",
            ColorPrimaries::Bt2020 => "BT.2020",
            ColorPrimaries::Smpte428 => "XYZ",
            ColorPrimaries::SmpteRp431 => "DCI P3",
            ColorPrimaries::SmpteEg432 => "Display P3",
            ColorPrimaries::Ebu3213 => "EBU Tech 3213",
            ColorPrimaries::Unspecified | ColorPrimaries::Unknown(_) => return None,
        })
    }
}

/// Transfer characteristics (ITU-T H.273)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferCharacteristics {
    Bt709,
    Unspecified,
    Bt470M,
    Bt470Bg,
    Smpte170M,
    Smpte240M,
    Linear,
    /// Logarithmic (100:1)
    Log100,
    /// Logarithmic (100*sqrt(10):1)
    Log316,
    /// IEC 61966-2-4 (xvYCC)
    Iec61966_2_4,
    Bt1361E,
    /// IEC 61966-2-1 (sRGB)
    Iec61966_2_1,
    Bt2020_10,
    Bt2020_12,
    /// SMPTE ST 2084 (PQ)
    SmpteSt2084,
    SmpteSt428,
    /// ARIB STD-B67 (HLG)
    AribStdB67,
    Unknown(u8),
}

impl From<u8> for TransferCharacteristics {
    fn from(value: u8) -> Self {
        match value {
            1 => TransferCharacteristics::Bt709,
            2 => TransferCharacteristics::Unspecified,
            4 => TransferCharacteristics::Bt470M,
            5 => TransferCharacteristics::Bt470Bg,
            6 => TransferCharacteristics::Smpte170M,
            7 => TransferCharacteristics::Smpte240M,
            8 => TransferCharacteristics::Linear,
            9 => TransferCharacteristics::Log100,
            10 => TransferCharacteristics::Log316,
            11 => TransferCharacteristics::Iec61966_2_4,
            12 => TransferCharacteristics::Bt1361E,
            13 => TransferCharacteristics::Iec61966_2_1,
            14 => TransferCharacteristics::Bt2020_10,
            15 => TransferCharacteristics::Bt2020_12,
            16 => TransferCharacteristics::SmpteSt2084,
            17 => TransferCharacteristics::SmpteSt428,
            18 => TransferCharacteristics::AribStdB67,
            v => TransferCharacteristics::Unknown(v),
        }
    }
}

impl TransferCharacteristics {
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            TransferCharacteristics::Bt709 => "BT.709",
            TransferCharacteristics::Bt470M => "BT.470 System M",
            TransferCharacteristics::Bt470Bg => "BT.470 System B/G",
            TransferCharacteristics::Smpte170M => "BT.601",
            TransferCharacteristics::Smpte240M => "SMPTE 240M",
            TransferCharacteristics::Linear => "Linear",
            TransferCharacteristics::Log100 => "Logarithmic (100:1)",
            TransferCharacteristics::Log316 => "Logarithmic (316.22777:1)",
            TransferCharacteristics::Iec61966_2_4 => "xvYCC",
            TransferCharacteristics::Bt1361E => "BT.1361",
            TransferCharacteristics::Iec61966_2_1 => "sRGB/sYCC",
            TransferCharacteristics::Bt2020_10 => "BT.2020 (10-bit)",
            TransferCharacteristics::Bt2020_12 => "BT.2020 (12-bit)",
            TransferCharacteristics::SmpteSt2084 => "PQ",
            TransferCharacteristics::SmpteSt428 => "SMPTE 428M",
            TransferCharacteristics::AribStdB67 => "HLG",
            TransferCharacteristics::Unspecified | TransferCharacteristics::Unknown(_) => return None,
        })
    }

    /// Whether this transfer function marks HDR content.
    pub fn is_hdr(&self) -> bool {
        matches!(
            self,
            TransferCharacteristics::SmpteSt2084 | TransferCharacteristics::AribStdB67
        )
    }
}

/// Matrix coefficients (ITU-T H.273)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixCoefficients {
    /// Identity (RGB)
    Identity,
    Bt709,
    Unspecified,
    Fcc,
    Bt470Bg,
    Smpte170M,
    Smpte240M,
    YCgCo,
    /// BT.2020 non-constant luminance
    Bt2020Ncl,
    /// BT.2020 constant luminance
    Bt2020Cl,
    SmpteSt2085,
    ChromaNcl,
    ChromaCl,
    ICtCp,
    Unknown(u8),
}

impl From<u8> for MatrixCoefficients {
    fn from(value: u8) -> Self {
        match value {
            0 => MatrixCoefficients::Identity,
            1 => MatrixCoefficients::Bt709,
            2 => MatrixCoefficients::Unspecified,
            4 => MatrixCoefficients::Fcc,
            5 => MatrixCoefficients::Bt470Bg,
            6 => MatrixCoefficients::Smpte170M,
            7 => MatrixCoefficients::Smpte240M,
            8 => MatrixCoefficients::YCgCo,
            9 => MatrixCoefficients::Bt2020Ncl,
            10 => MatrixCoefficients::Bt2020Cl,
            11 => MatrixCoefficients::SmpteSt2085,
            12 => MatrixCoefficients::ChromaNcl,
            13 => MatrixCoefficients::ChromaCl,
            14 => MatrixCoefficients::ICtCp,
            v => MatrixCoefficients::Unknown(v),
        }
    }
}

impl MatrixCoefficients {
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            MatrixCoefficients::Identity => "Identity",
            MatrixCoefficients::Bt709 => "BT.709",
            MatrixCoefficients::Fcc => "FCC 73.682",
            MatrixCoefficients::Bt470Bg => "BT.470 System B/G",
            MatrixCoefficients::Smpte170M => "BT.601",
            MatrixCoefficients::Smpte240M => "SMPTE 240M",
            MatrixCoefficients::YCgCo => "YCgCo",
            MatrixCoefficients::Bt2020Ncl => "BT.2020 non-constant",
            MatrixCoefficients::Bt2020Cl => "BT.2020 constant",
            MatrixCoefficients::SmpteSt2085 => "Y'D'zD'x",
            MatrixCoefficients::ChromaNcl => "Chromaticity-derived non-constant",
            MatrixCoefficients::ChromaCl => "Chromaticity-derived constant",
            MatrixCoefficients::ICtCp => "ICtCp",
            MatrixCoefficients::Unspecified | MatrixCoefficients::Unknown(_) => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hdr10_code_points() {
        assert_eq!(ColorPrimaries::from(9).name(), Some("BT.2020"));
        assert_eq!(TransferCharacteristics::from(16).name(), Some("PQ"));
        assert!(TransferCharacteristics::from(16).is_hdr());
        assert_eq!(MatrixCoefficients::from(9).name(), Some("BT.2020 non-constant"));
    }

    #[test]
    fn test_unspecified_has_no_name() {
        assert_eq!(ColorPrimaries::from(2).name(), None);
        assert_eq!(TransferCharacteristics::from(2).name(), None);
        assert_eq!(MatrixCoefficients::from(200), MatrixCoefficients::Unknown(200));
        assert_eq!(MatrixCoefficients::from(200).name(), None);
    }
}
