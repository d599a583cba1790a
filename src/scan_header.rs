use crate::coding::CodingProcess;
use crate::error::corrupt;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct ScanHeader {
    pub(crate) scan_component_selectors: Vec<ScanComponentSelector>,

    /// Ss: In DCT modes of operation, this parameter specifies the first DCT coefficient in each
    /// block in zig-zag order which shall be coded in the scan. This parameter is set to zero for
    /// sequential DCT processes.
    pub(crate) spectral_start: u8,

    /// Se: Specifies the last DCT coefficient in each block in zig-zag order which shall be coded
    /// in the scan. This parameter shall be set to 63 for sequential DCT processes.
    pub(crate) spectral_end: u8,

    /// Ah: This parameter specifies the point transform used in the preceding scan (the
    /// successive approximation bit position low in the preceding scan) for the band of
    /// coefficients specified by Ss and Se. This parameter shall be set to zero for the first
    /// scan of each band of coefficients.
    pub(crate) successive_approx_high: u8,

    /// Al: This parameter specifies the point transform, the bit position low, used before coding
    /// the band of coefficients specified by Ss and Se. This parameter shall be set to zero for
    /// sequential DCT processes.
    pub(crate) successive_approx_low: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponentSelector {
    /// Cs: Selects which of the components specified in the frame parameters shall be the jth
    /// component in the scan.
    pub(crate) component_id: u8,

    /// Position of that component in the frame header.
    pub(crate) component_index: usize,

    /// Td: Specifies one of four possible DC entropy coding table destinations from which the
    /// entropy table needed for decoding of the DC coefficients of component selector j is
    /// retrieved.
    pub(crate) dc_destination_id: u8,

    /// Ta: Same as `dc_destination_id`, for the AC coefficients.
    pub(crate) ac_destination_id: u8,
}

impl ScanComponentSelector {
    pub(crate) fn from(
        component_id: u8,
        component_index: usize,
        dc_destination_id: u8,
        ac_destination_id: u8,
    ) -> Self {
        Self {
            component_id,
            component_index,
            dc_destination_id,
            ac_destination_id,
        }
    }
}

/// The five ways a scan can code its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Sequential scan carrying every coefficient of each block.
    Baseline,
    /// First progressive pass over the DC coefficient.
    DcFirst,
    /// One more bit of the DC coefficient.
    DcRefine,
    /// First pass over a spectral band of AC coefficients.
    AcFirst,
    /// One more bit of a spectral band of AC coefficients.
    AcRefine,
}

impl ScanMode {
    pub fn uses_dc_table(&self) -> bool {
        matches!(self, ScanMode::Baseline | ScanMode::DcFirst)
    }

    pub fn uses_ac_table(&self) -> bool {
        matches!(
            self,
            ScanMode::Baseline | ScanMode::AcFirst | ScanMode::AcRefine
        )
    }
}

impl ScanHeader {
    pub(crate) fn is_interleaved(&self) -> bool {
        self.scan_component_selectors.len() > 1
    }

    /// Classifies the scan, rejecting parameter combinations the process does not allow.
    pub(crate) fn mode(&self, process: CodingProcess) -> Result<ScanMode> {
        let (ss, se, ah, al) = (
            self.spectral_start,
            self.spectral_end,
            self.successive_approx_high,
            self.successive_approx_low,
        );

        if !process.is_progressive() {
            if ss != 0 || se != 63 || ah != 0 || al != 0 {
                return Err(corrupt(format!(
                    "sequential scan with Ss={ss} Se={se} Ah={ah} Al={al}"
                )));
            }
            return Ok(ScanMode::Baseline);
        }

        if al > 13 {
            return Err(corrupt(format!("successive approximation Al={al} exceeds 13")));
        }
        if ah != 0 && ah != al + 1 {
            return Err(corrupt(format!(
                "refinement scan with Ah={ah} does not follow Al={al}"
            )));
        }

        if ss == 0 {
            if se != 0 {
                return Err(corrupt(format!(
                    "progressive scan mixes DC and AC coefficients (Se={se})"
                )));
            }
            return Ok(if ah == 0 {
                ScanMode::DcFirst
            } else {
                ScanMode::DcRefine
            });
        }

        if se < ss || se > 63 {
            return Err(corrupt(format!("spectral band Ss={ss} Se={se}")));
        }
        if self.is_interleaved() {
            return Err(corrupt("progressive AC scan with more than one component"));
        }

        Ok(if ah == 0 {
            ScanMode::AcFirst
        } else {
            ScanMode::AcRefine
        })
    }
}
